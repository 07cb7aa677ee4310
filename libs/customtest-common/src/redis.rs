use crate::types::{SubmissionRecord, User};
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, RedisResult};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Redis key semantics - the API and the CLI share these so keys never drift

pub const HISTORY_PREFIX: &str = "customtest:history";
pub const USER_PREFIX: &str = "customtest:user";
pub const SESSION_PREFIX: &str = "customtest:session";
pub const PROFILE_PREFIX: &str = "customtest:profile";

const FIELD_LANGUAGE: &str = "language";
const FIELD_CODE: &str = "code";
const FIELD_INPUT: &str = "input_data";
const FIELD_UPDATED_AT: &str = "updated_at";

/// History key: one hash per user, so a write is always an upsert
pub fn history_key(user_id: &Uuid) -> String {
    format!("{}:{}", HISTORY_PREFIX, user_id)
}

pub fn user_key(user_id: &Uuid) -> String {
    format!("{}:{}", USER_PREFIX, user_id)
}

pub fn session_key(token: &str) -> String {
    format!("{}:{}", SESSION_PREFIX, token)
}

pub fn profile_key(user_id: &Uuid) -> String {
    format!("{}:{}", PROFILE_PREFIX, user_id)
}

fn type_error(desc: &'static str, detail: String) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, desc, detail))
}

/// Overwrite the user's submission record.
/// A single multi-field HSET, atomic for the key.
pub async fn upsert_history(
    conn: &mut redis::aio::ConnectionManager,
    record: &SubmissionRecord,
) -> RedisResult<()> {
    let key = history_key(&record.user_id);
    let updated_at = record.updated_at.to_rfc3339();
    let fields = [
        (FIELD_LANGUAGE, record.language.as_str()),
        (FIELD_CODE, record.code.as_str()),
        (FIELD_INPUT, record.input_data.as_str()),
        (FIELD_UPDATED_AT, updated_at.as_str()),
    ];
    conn.hset_multiple(&key, &fields).await
}

pub async fn get_history(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &Uuid,
) -> RedisResult<Option<SubmissionRecord>> {
    let fields: HashMap<String, String> = conn.hgetall(history_key(user_id)).await?;
    record_from_fields(*user_id, fields)
}

/// Rebuild a record from its hash fields. An empty hash means no record.
pub fn record_from_fields(
    user_id: Uuid,
    mut fields: HashMap<String, String>,
) -> RedisResult<Option<SubmissionRecord>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let language = fields
        .remove(FIELD_LANGUAGE)
        .ok_or_else(|| type_error("missing history field", FIELD_LANGUAGE.to_string()))?;
    let updated_at = match fields.remove(FIELD_UPDATED_AT) {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| type_error("invalid history timestamp", e.to_string()))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    Ok(Some(SubmissionRecord {
        user_id,
        language,
        code: fields.remove(FIELD_CODE).unwrap_or_default(),
        input_data: fields.remove(FIELD_INPUT).unwrap_or_default(),
        updated_at,
    }))
}

pub async fn store_user(conn: &mut redis::aio::ConnectionManager, user: &User) -> RedisResult<()> {
    let payload = serde_json::to_string(user)
        .map_err(|e| type_error("serialization error", e.to_string()))?;
    conn.set(user_key(&user.id), payload).await
}

pub async fn get_user(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &Uuid,
) -> RedisResult<Option<User>> {
    let payload: Option<String> = conn.get(user_key(user_id)).await?;
    match payload {
        Some(data) => {
            let user = serde_json::from_str(&data)
                .map_err(|e| type_error("deserialization error", e.to_string()))?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Bind a bearer token to a user
pub async fn create_session(
    conn: &mut redis::aio::ConnectionManager,
    token: &str,
    user_id: &Uuid,
) -> RedisResult<()> {
    conn.set(session_key(token), user_id.to_string()).await
}

/// Resolve a bearer token to its user. Dangling sessions resolve to None.
pub async fn session_user(
    conn: &mut redis::aio::ConnectionManager,
    token: &str,
) -> RedisResult<Option<User>> {
    let user_id: Option<String> = conn.get(session_key(token)).await?;
    let Some(user_id) = user_id.as_deref().and_then(session_user_id) else {
        return Ok(None);
    };
    get_user(conn, &user_id).await
}

/// A session holding something other than a UUID is as good as no session
pub fn session_user_id(raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(e) => {
            debug!(error = %e, "Session points at an invalid user id");
            None
        }
    }
}

pub async fn set_profile_language(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &Uuid,
    language: &str,
) -> RedisResult<()> {
    conn.hset(profile_key(user_id), FIELD_LANGUAGE, language).await
}

pub async fn get_profile_language(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &Uuid,
) -> RedisResult<Option<String>> {
    conn.hget(profile_key(user_id), FIELD_LANGUAGE).await
}
