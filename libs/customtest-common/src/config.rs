// Service configuration, read from the environment

use std::env;
use std::str::FromStr;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_JUDGE0_URL: &str = "http://127.0.0.1:2358";
pub const DEFAULT_LANGUAGES_CONFIG: &str = "config/languages.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub bind_addr: String,
    pub judge0_api_url: String,
    /// Sent as X-Auth-Token when set
    pub judge0_auth_token: Option<String>,
    pub judge0_timeout_seconds: u64,
    pub languages_config: String,
    /// Fallback when a user has neither history nor a profile language
    pub default_language: String,
    pub ace_url: String,
    pub max_source_bytes: usize,
    pub max_input_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            judge0_api_url: DEFAULT_JUDGE0_URL.to_string(),
            judge0_auth_token: None,
            judge0_timeout_seconds: 30,
            languages_config: DEFAULT_LANGUAGES_CONFIG.to_string(),
            default_language: "py3".to_string(),
            ace_url: "https://cdnjs.cloudflare.com/ajax/libs/ace/1.32.7".to_string(),
            max_source_bytes: 65536,
            max_input_bytes: 65536,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            judge0_api_url: env::var("JUDGE0_API_URL").unwrap_or(defaults.judge0_api_url),
            judge0_auth_token: env::var("JUDGE0_AUTH_TOKEN").ok().filter(|s| !s.is_empty()),
            judge0_timeout_seconds: parse_var("JUDGE0_TIMEOUT_SECONDS", defaults.judge0_timeout_seconds),
            languages_config: env::var("LANGUAGES_CONFIG").unwrap_or(defaults.languages_config),
            default_language: env::var("DEFAULT_LANGUAGE").unwrap_or(defaults.default_language),
            ace_url: env::var("ACE_URL").unwrap_or(defaults.ace_url),
            max_source_bytes: parse_var("MAX_SOURCE_BYTES", defaults.max_source_bytes),
            max_input_bytes: parse_var("MAX_INPUT_BYTES", defaults.max_input_bytes),
        }
    }
}

// Unparseable values fall back to the default rather than aborting startup
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
