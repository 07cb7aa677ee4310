// Custom test form: validation of submissions and the prefilled form context

use customtest_common::config::Config;
use customtest_common::types::{LanguageConfig, SubmissionRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PAGE_TITLE;
use crate::language_config::LanguageRegistry;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("language is required")]
    MissingLanguage,

    #[error("unknown language '{0}'")]
    UnknownLanguage(String),

    #[error("source is required")]
    MissingSource,

    #[error("source exceeds {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("input exceeds {limit} bytes")]
    InputTooLarge { limit: usize },

    #[error("malformed form body: {0}")]
    Malformed(String),
}

/// Raw form body of POST /customtest/run
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionForm {
    pub language: Option<String>,
    pub source: Option<String>,
    pub input: Option<String>,
}

/// A submission that passed validation, with its language resolved
#[derive(Debug)]
pub struct ValidSubmission<'a> {
    pub language: &'a LanguageConfig,
    pub source: String,
    pub input: String,
}

impl SubmissionForm {
    pub fn validate<'a>(
        self,
        languages: &'a LanguageRegistry,
        config: &Config,
    ) -> Result<ValidSubmission<'a>, ValidationError> {
        let key = self
            .language
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingLanguage)?;
        let language = languages
            .get(key)
            .ok_or_else(|| ValidationError::UnknownLanguage(key.to_string()))?;

        let source = self
            .source
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingSource)?;
        if source.len() > config.max_source_bytes {
            return Err(ValidationError::SourceTooLarge {
                limit: config.max_source_bytes,
            });
        }

        let input = self.input.unwrap_or_default();
        if input.len() > config.max_input_bytes {
            return Err(ValidationError::InputTooLarge {
                limit: config.max_input_bytes,
            });
        }

        Ok(ValidSubmission {
            language,
            source,
            input,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFields {
    pub language: String,
    pub source: String,
    pub input: String,
}

/// Everything the page needs to render the editor
#[derive(Debug, Clone, Serialize)]
pub struct FormContext {
    pub title: &'static str,
    pub default_lang: String,
    pub form: FormFields,
    pub langs: Vec<LanguageConfig>,
    pub ace_url: String,
}

impl FormContext {
    /// The last run wins over the profile preference
    pub fn build(
        last_run: Option<SubmissionRecord>,
        profile_language: String,
        languages: &LanguageRegistry,
        config: &Config,
    ) -> Self {
        let form = match last_run {
            Some(run) => FormFields {
                language: run.language,
                source: run.code,
                input: run.input_data,
            },
            None => FormFields {
                language: profile_language,
                source: String::new(),
                input: String::new(),
            },
        };

        Self {
            title: PAGE_TITLE,
            default_lang: form.language.clone(),
            form,
            langs: languages.all().to_vec(),
            ace_url: config.ace_url.clone(),
        }
    }
}
