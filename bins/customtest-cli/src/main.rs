mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use customtest_common::config::Config;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "customtest-cli")]
#[command(about = "Custom test admin CLI - Manage languages, users and profiles", long_about = None)]
struct Cli {
    /// Path to languages.json (defaults to LANGUAGES_CONFIG or config/languages.json)
    #[arg(long, global = true)]
    languages: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a language mapping to languages.json
    AddLang {
        /// Key clients submit (e.g., py3, cpp17)
        #[arg(short, long)]
        key: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Judge0 language id
        #[arg(short, long)]
        judge0_id: u32,
    },

    /// List configured languages
    ListLangs,

    /// Create a user and print a session token
    CreateUser {
        #[arg(short, long)]
        username: String,

        /// Also grant the custom test permission
        #[arg(long, default_value = "false")]
        grant_test_site: bool,
    },

    /// Grant a permission to a user
    Grant {
        #[arg(short, long)]
        user_id: Uuid,

        #[arg(short, long, default_value = customtest_common::types::TEST_SITE_PERM)]
        perm: String,
    },

    /// Set a user's preferred language
    SetLanguage {
        #[arg(short, long)]
        user_id: Uuid,

        #[arg(short, long)]
        language: String,
    },

    /// Print a user's stored custom test submission
    ShowHistory {
        #[arg(short, long)]
        user_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    let languages_path = cli
        .languages
        .unwrap_or_else(|| PathBuf::from(&config.languages_config));

    match cli.command {
        Commands::AddLang { key, name, judge0_id } => {
            commands::add_language(&languages_path, &key, &name, judge0_id)?;
        }
        Commands::ListLangs => {
            commands::list_languages(&languages_path)?;
        }
        Commands::CreateUser {
            username,
            grant_test_site,
        } => {
            let mut conn = commands::connect(&config.redis_url).await?;
            commands::create_user(&mut conn, &username, grant_test_site).await?;
        }
        Commands::Grant { user_id, perm } => {
            let mut conn = commands::connect(&config.redis_url).await?;
            commands::grant_permission(&mut conn, &user_id, &perm).await?;
        }
        Commands::SetLanguage { user_id, language } => {
            let mut conn = commands::connect(&config.redis_url).await?;
            commands::set_language(&mut conn, &languages_path, &user_id, &language).await?;
        }
        Commands::ShowHistory { user_id } => {
            let mut conn = commands::connect(&config.redis_url).await?;
            commands::show_history(&mut conn, &user_id).await?;
        }
    }

    Ok(())
}
