//! BaaS record types and errors.
//!
//! Records are typed for the fields this crate reads and keep every other
//! field in a flattened map, so a record fetched and written back loses
//! nothing the backend sent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::{Filter, Sort};

// =============================================================================
// ERROR
// =============================================================================

/// Per-field validation failure reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Errors produced by backend client operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend returned a non-success HTTP status.
    #[error("response error: status {status}: {message}")]
    Response { status: u16, message: String, data: BTreeMap<String, FieldError> },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A request URL could not be built from the configured base URL.
    #[error("invalid url: {0}")]
    Url(String),
}

impl ApiError {
    /// HTTP status of a response error, `None` for everything else.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Validation code reported for `field`, if any.
    #[must_use]
    pub fn field_code(&self, field: &str) -> Option<&str> {
        match self {
            Self::Response { data, .. } => data.get(field).map(|f| f.code.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub(crate) fn not_found() -> Self {
        Self::Response {
            status: 404,
            message: "The requested resource wasn't found.".to_owned(),
            data: BTreeMap::new(),
        }
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A user record from an auth collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub collection_id: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub verified: bool,
    /// Id of the related role record; empty when unassigned.
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<UserExpand>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Expanded relations of a user record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserExpand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleRecord>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Ids of the related permission records.
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<RoleExpand>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleExpand {
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    #[serde(default)]
    pub id: String,
    pub key: String,
}

impl UserRecord {
    /// Permission keys granted through `expand.role.expand.permissions`.
    ///
    /// Any missing relation level yields no keys.
    #[must_use]
    pub fn permission_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .expanded_role()
            .and_then(|r| r.expand.as_ref())
            .map(|re| re.permissions.iter().map(|p| p.key.clone()).collect())
            .unwrap_or_default();
        keys.sort();
        keys.dedup();
        keys
    }

    /// The expanded role, if the relation was expanded.
    #[must_use]
    pub fn expanded_role(&self) -> Option<&RoleRecord> {
        self.expand.as_ref().and_then(|e| e.role.as_ref())
    }
}

/// A navigation menu entry from the `menu_items` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub icon: String,
    /// PocketBase number fields may be fractional.
    #[serde(default)]
    pub order: f64,
    /// Empty means visible to everyone.
    #[serde(default)]
    pub required_permission: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Token plus record returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub record: Value,
}

// =============================================================================
// LIST QUERIES
// =============================================================================

/// Options for collection list queries.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub filter: Option<Filter>,
    pub sort: Option<Sort>,
}

impl ListOptions {
    #[must_use]
    pub fn filtered(filter: Filter) -> Self {
        Self { filter: Some(filter), ..Self::default() }
    }

    #[must_use]
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// One page of a record list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    #[serde(default)]
    pub items: Vec<Value>,
}

/// Decode a raw record into a typed one.
///
/// # Errors
///
/// Returns [`ApiError::Parse`] if the value does not match `T`.
pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
