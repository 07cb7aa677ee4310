// Language configuration management
// Loads and validates languages from languages.json

use customtest_common::types::LanguageConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LanguagesFile {
    languages: Vec<LanguageConfig>,
}

/// Registry of configured languages
/// This is the authoritative source for which language keys a submission may use
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

impl LanguageRegistry {
    /// Load language configuration from languages.json
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read languages.json: {}", e))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let config: LanguagesFile = serde_json::from_str(content)
            .map_err(|e| format!("Failed to parse languages.json: {}", e))?;

        Self::new(config.languages)
    }

    pub fn new(languages: Vec<LanguageConfig>) -> Result<Self, String> {
        let mut seen = HashSet::new();
        for lang in &languages {
            if lang.key.trim().is_empty() {
                return Err("Language with empty key in languages.json".to_string());
            }
            if !seen.insert(lang.key.as_str()) {
                return Err(format!("Duplicate language '{}' in languages.json", lang.key));
            }
        }

        if languages.is_empty() {
            return Err("No languages configured in languages.json".to_string());
        }

        Ok(Self { languages })
    }

    pub fn get(&self, key: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|l| l.key == key)
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All languages, in file order
    pub fn all(&self) -> &[LanguageConfig] {
        &self.languages
    }
}
