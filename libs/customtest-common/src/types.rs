use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission required to use the custom test page
pub const TEST_SITE_PERM: &str = "judge.test_site";

/// Shown when a run produced neither diagnostics nor stdout
pub const EMPTY_OUTPUT_MESSAGE: &str = "Standard output is empty";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            permissions: Vec::new(),
        }
    }

    pub fn has_perm(&self, perm: &str) -> bool {
        self.permissions.iter().any(|p| p == perm)
    }

    /// Adds a permission, returns false if the user already had it
    pub fn grant(&mut self, perm: &str) -> bool {
        if self.has_perm(perm) {
            return false;
        }
        self.permissions.push(perm.to_string());
        true
    }
}

/// Latest custom test run of a user. One per user, overwritten on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub user_id: Uuid,
    pub language: String,
    pub code: String,
    pub input_data: String,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(user_id: Uuid, language: String, code: String, input_data: String) -> Self {
        Self {
            user_id,
            language,
            code,
            input_data,
            updated_at: Utc::now(),
        }
    }
}

/// A language as exposed to clients, mapped onto the execution service's numbering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub key: String,
    pub name: String,
    pub judge0_id: u32,
}

/// Payload handed to the execution service. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub stdin: String,
    pub language_id: u32,
}

/// Decoded result of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub status: Option<String>,
}

impl ExecutionResponse {
    /// Text shown to the user: compiler diagnostics win over stdout,
    /// and an empty stdout is replaced by a placeholder.
    pub fn display_output(&self) -> String {
        if let Some(diag) = self.compile_output.as_deref().filter(|s| !s.is_empty()) {
            return diag.to_string();
        }
        match self.stdout.as_deref() {
            Some(out) if !out.is_empty() => out.to_string(),
            _ => EMPTY_OUTPUT_MESSAGE.to_string(),
        }
    }
}
