//! Judge0 client
//!
//! Submits a single run synchronously (`wait=true`) with every text field
//! base64 encoded, so arbitrary bytes in source or stdin survive the trip.
//! Judge0 answers in base64 as well, wrapped at 60 columns.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use customtest_common::types::{ExecutionRequest, ExecutionResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),
}

/// Anything that can run code for us
#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, JudgeError>;
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Judge0Submission {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
}

#[derive(Debug, Deserialize)]
struct Judge0Status {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Judge0Result {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    status: Option<Judge0Status>,
}

pub fn encode_submission(request: &ExecutionRequest) -> Judge0Submission {
    Judge0Submission {
        source_code: general_purpose::STANDARD.encode(request.source_code.as_bytes()),
        language_id: request.language_id,
        stdin: general_purpose::STANDARD.encode(request.stdin.as_bytes()),
    }
}

fn decode_field(field: Option<String>) -> Result<Option<String>, JudgeError> {
    let Some(raw) = field else {
        return Ok(None);
    };
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| JudgeError::Decode(e.to_string()))?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn decode_result(result: Judge0Result) -> Result<ExecutionResponse, JudgeError> {
    Ok(ExecutionResponse {
        stdout: decode_field(result.stdout)?,
        stderr: decode_field(result.stderr)?,
        compile_output: decode_field(result.compile_output)?,
        status: result.status.map(|s| s.description),
    })
}

pub struct Judge0Client {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl Judge0Client {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
            client,
        })
    }

    fn submissions_url(&self) -> String {
        format!("{}/submissions?base64_encoded=true&wait=true", self.base_url)
    }
}

#[async_trait]
impl ExecutionService for Judge0Client {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, JudgeError> {
        let mut builder = self
            .client
            .post(self.submissions_url())
            .json(&encode_submission(request));

        if let Some(token) = &self.auth_token {
            builder = builder.header("X-Auth-Token", token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JudgeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: Judge0Result = response
            .json()
            .await
            .map_err(|e| JudgeError::Decode(e.to_string()))?;

        decode_result(result)
    }
}
