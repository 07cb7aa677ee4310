use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use customtest_common::types::User;
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// The user behind the request's bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;

        match state.store.session_user(token).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                debug!("Unknown session token");
                Err(ApiError::Unauthenticated)
            }
        }
    }
}
