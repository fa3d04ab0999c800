//! `GET /api/me`: the authenticated record with its role expanded.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::Json;
use serde_json::Value;

use crate::state::AppState;

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated caller extracted from the `Authorization` header.
///
/// Accepts the raw token or `Bearer <token>`. Missing or rejected tokens are
/// 401; a backend that cannot be reached is 502.
pub struct AuthUser {
    pub record: Value,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(bearer_token)
            .unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let record = app_state.source.authenticate(token).await.map_err(|e| {
            if e.is_transport() || e.status().is_some_and(|s| s >= 500) {
                tracing::error!(error = %e, "token validation unavailable");
                StatusCode::BAD_GATEWAY
            } else {
                tracing::debug!(error = %e, "token rejected");
                StatusCode::UNAUTHORIZED
            }
        })?;

        Ok(Self { record, token: token.to_owned() })
    }
}

/// Strip an optional case-insensitive `Bearer ` scheme.
pub(crate) fn bearer_token(header: &str) -> &str {
    let header = header.trim();
    if header.eq_ignore_ascii_case("bearer") {
        return "";
    }
    match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => header,
    }
}

// =============================================================================
// HANDLER
// =============================================================================

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Json<Value> {
    let AuthUser { mut record, token } = auth;
    let user_id = record.get("id").and_then(Value::as_str).unwrap_or_default().to_owned();
    tracing::debug!(%user_id, "/api/me");

    let role_id = record
        .get("role")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned);
    if let Some(role_id) = role_id {
        match state.source.role(&token, &role_id).await {
            Ok(role) => attach_role(&mut record, role),
            Err(e) => tracing::error!(%user_id, %role_id, error = %e, "failed to expand role"),
        }
    }
    Json(record)
}

fn attach_role(record: &mut Value, role: Value) {
    let Some(obj) = record.as_object_mut() else {
        return;
    };
    let expand = obj
        .entry("expand")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if !expand.is_object() {
        *expand = Value::Object(serde_json::Map::new());
    }
    if let Some(expand) = expand.as_object_mut() {
        expand.insert("role".to_owned(), role);
    }
}

#[cfg(test)]
#[path = "me_test.rs"]
mod tests;
