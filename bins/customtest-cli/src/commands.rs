// CLI commands for managing the custom test service
use anyhow::{bail, Context, Result};
use customtest_common::redis as store;
use customtest_common::types::{LanguageConfig, User, TEST_SITE_PERM};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LanguagesJson {
    pub languages: Vec<LanguageConfig>,
}

/// Load languages configuration. A missing file is an empty configuration.
fn load_languages_config(path: &Path) -> Result<LanguagesJson> {
    if !path.exists() {
        return Ok(LanguagesJson::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn save_languages_config(path: &Path, config: &LanguagesJson) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json_content = serde_json::to_string_pretty(config)
        .context("Failed to serialize languages.json")?;

    fs::write(path, json_content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

pub fn add_language(path: &Path, key: &str, name: &str, judge0_id: u32) -> Result<()> {
    let key = key.trim();
    if key.is_empty() || name.trim().is_empty() {
        bail!("Language key and name cannot be empty");
    }
    if judge0_id == 0 {
        bail!("Judge0 language id must be positive");
    }

    let mut languages_json = load_languages_config(path)?;

    if languages_json.languages.iter().any(|l| l.key == key) {
        bail!("Language '{}' already exists in config", key);
    }

    languages_json.languages.push(LanguageConfig {
        key: key.to_string(),
        name: name.trim().to_string(),
        judge0_id,
    });
    save_languages_config(path, &languages_json)?;

    println!("Added language '{}' (Judge0 id {})", key, judge0_id);
    Ok(())
}

pub fn list_languages(path: &Path) -> Result<()> {
    let languages_json = load_languages_config(path)?;
    if languages_json.languages.is_empty() {
        println!("No languages configured in {}", path.display());
        return Ok(());
    }

    for lang in &languages_json.languages {
        println!("{:<12} {:>4}  {}", lang.key, lang.judge0_id, lang.name);
    }
    Ok(())
}

pub async fn connect(redis_url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(redis_url)
        .with_context(|| format!("Invalid Redis URL: {}", redis_url))?;
    ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")
}

pub async fn create_user(conn: &mut ConnectionManager, username: &str, grant_test_site: bool) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("Username cannot be empty");
    }

    let mut user = User::new(username);
    if grant_test_site {
        user.grant(TEST_SITE_PERM);
    }
    store::store_user(conn, &user).await?;

    let token = Uuid::new_v4().simple().to_string();
    store::create_session(conn, &token, &user.id).await?;

    println!("User:  {} ({})", user.username, user.id);
    println!("Token: {}", token);
    Ok(())
}

pub async fn grant_permission(conn: &mut ConnectionManager, user_id: &Uuid, perm: &str) -> Result<()> {
    let Some(mut user) = store::get_user(conn, user_id).await? else {
        bail!("User {} not found", user_id);
    };

    if !user.grant(perm) {
        println!("{} already has '{}'", user.username, perm);
        return Ok(());
    }
    store::store_user(conn, &user).await?;

    println!("Granted '{}' to {}", perm, user.username);
    Ok(())
}

pub async fn set_language(
    conn: &mut ConnectionManager,
    languages_path: &Path,
    user_id: &Uuid,
    language: &str,
) -> Result<()> {
    let languages_json = load_languages_config(languages_path)?;
    if !languages_json.languages.iter().any(|l| l.key == language) {
        bail!("Language '{}' is not configured in {}", language, languages_path.display());
    }
    if store::get_user(conn, user_id).await?.is_none() {
        bail!("User {} not found", user_id);
    }

    store::set_profile_language(conn, user_id, language).await?;
    println!("Preferred language of {} set to '{}'", user_id, language);
    Ok(())
}

pub async fn show_history(conn: &mut ConnectionManager, user_id: &Uuid) -> Result<()> {
    match store::get_history(conn, user_id).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => println!("No custom test history for {}", user_id),
    }
    Ok(())
}
