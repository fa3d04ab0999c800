//! PocketBase REST client.
//!
//! Thin HTTP wrapper over `/api/collections/{collection}/...`. URL building
//! and response parsing are pure functions so they can be tested without a
//! live backend.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use super::types::{ApiError, AuthResponse, FieldError, ListOptions, ListPage};
use super::{AuthStore, Backend};
use crate::config::ClientTimeouts;
use crate::filter::Filter;

/// Page size used when walking a full list.
pub const FULL_LIST_PAGE_SIZE: u32 = 500;

// =============================================================================
// CLIENT
// =============================================================================

pub struct PocketBaseClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthStore,
}

impl PocketBaseClient {
    /// Build a client for `base_url` with its own HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// fails to build.
    pub fn new(base_url: &str, timeouts: ClientTimeouts, auth: AuthStore) -> Result<Self, ApiError> {
        let http = build_http(timeouts)?;
        Self::from_parts(http, base_url, auth)
    }

    /// Build a client sharing an existing HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse.
    pub fn from_parts(http: reqwest::Client, base_url: &str, auth: AuthStore) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self { http, base_url, auth })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn execute(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value, ApiError> {
        tracing::debug!(method = method.as_str(), path = url.path(), "backend request");
        let mut request = self.http.request(method, url);
        let token = self.auth.token();
        if !token.is_empty() {
            request = request.header(AUTHORIZATION, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(parse_error_body(status, &text));
        }
        parse_body(&text)
    }

    async fn post_collection(&self, collection: &str, action: &str, body: &Value) -> Result<Value, ApiError> {
        let url = collection_url(&self.base_url, collection, &[action])?;
        self.execute(Method::POST, url, Some(body)).await
    }

    fn save_auth(&self, body: Value) -> Result<AuthResponse, ApiError> {
        let auth = parse_auth(body)?;
        self.auth.save(&auth.token, Some(auth.record.clone()));
        Ok(auth)
    }
}

/// Build the shared HTTP client with request and connect timeouts.
///
/// # Errors
///
/// Returns [`ApiError::HttpClientBuild`] if `reqwest` rejects the settings.
pub fn build_http(timeouts: ClientTimeouts) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| ApiError::HttpClientBuild(e.to_string()))
}

#[async_trait::async_trait]
impl Backend for PocketBaseClient {
    fn auth_store(&self) -> &AuthStore {
        &self.auth
    }

    async fn auth_with_password(
        &self,
        collection: &str,
        identity: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let body = json!({ "identity": identity, "password": password });
        let response = self
            .post_collection(collection, "auth-with-password", &body)
            .await?;
        self.save_auth(response)
    }

    async fn auth_refresh(&self, collection: &str, expand: Option<&str>) -> Result<AuthResponse, ApiError> {
        let mut url = collection_url(&self.base_url, collection, &["auth-refresh"])?;
        if let Some(expand) = expand {
            url.query_pairs_mut().append_pair("expand", expand);
        }
        let response = self.execute(Method::POST, url, None).await?;
        parse_auth(response)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let url = path_url(&self.base_url, path)?;
        self.execute(method, url, body).await
    }

    async fn get_full_list(&self, collection: &str, options: &ListOptions) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let url = list_url(&self.base_url, collection, page, FULL_LIST_PAGE_SIZE, options)?;
            let body = self.execute(Method::GET, url, None).await?;
            let batch = parse_list_page(body)?;
            let fetched = batch.items.len();
            items.extend(batch.items);
            if fetched < FULL_LIST_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    async fn get_first_list_item(&self, collection: &str, filter: &Filter) -> Result<Value, ApiError> {
        let options = ListOptions::filtered(filter.clone());
        let url = list_url(&self.base_url, collection, 1, 1, &options)?;
        let body = self.execute(Method::GET, url, None).await?;
        parse_list_page(body)?
            .items
            .into_iter()
            .next()
            .ok_or_else(ApiError::not_found)
    }

    async fn get_one(&self, collection: &str, id: &str, expand: Option<&str>) -> Result<Value, ApiError> {
        let mut url = collection_url(&self.base_url, collection, &["records", id])?;
        if let Some(expand) = expand {
            url.query_pairs_mut().append_pair("expand", expand);
        }
        self.execute(Method::GET, url, None).await
    }

    async fn create(&self, collection: &str, data: &Value) -> Result<Value, ApiError> {
        let url = collection_url(&self.base_url, collection, &["records"])?;
        self.execute(Method::POST, url, Some(data)).await
    }

    async fn update(&self, collection: &str, id: &str, data: &Value) -> Result<Value, ApiError> {
        let url = collection_url(&self.base_url, collection, &["records", id])?;
        self.execute(Method::PATCH, url, Some(data)).await
    }

    async fn request_verification(&self, collection: &str, email: &str) -> Result<(), ApiError> {
        let body = json!({ "email": email });
        self.post_collection(collection, "request-verification", &body)
            .await
            .map(drop)
    }

    async fn request_email_change(&self, collection: &str, new_email: &str) -> Result<(), ApiError> {
        let body = json!({ "newEmail": new_email });
        self.post_collection(collection, "request-email-change", &body)
            .await
            .map(drop)
    }

    async fn confirm_email_change(&self, collection: &str, token: &str, password: &str) -> Result<(), ApiError> {
        let body = json!({ "token": token, "password": password });
        self.post_collection(collection, "confirm-email-change", &body)
            .await
            .map(drop)
    }

    async fn request_password_reset(&self, collection: &str, email: &str) -> Result<(), ApiError> {
        let body = json!({ "email": email });
        self.post_collection(collection, "request-password-reset", &body)
            .await
            .map(drop)
    }

    async fn confirm_password_reset(
        &self,
        collection: &str,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(), ApiError> {
        let body = json!({ "token": token, "password": password, "passwordConfirm": password_confirm });
        self.post_collection(collection, "confirm-password-reset", &body)
            .await
            .map(drop)
    }
}

// =============================================================================
// URLS
// =============================================================================

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::Url(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::Url(format!("{raw}: cannot be a base URL")));
    }
    Ok(url)
}

/// `{base}/api/collections/{collection}/{tail...}` with each segment encoded.
pub(crate) fn collection_url(base: &Url, collection: &str, tail: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| ApiError::Url(base.to_string()))?;
        segments.pop_if_empty().extend(["api", "collections", collection]);
        segments.extend(tail);
    }
    Ok(url)
}

/// `{base}/{path}` for an absolute backend path such as `/api/me`.
pub(crate) fn path_url(base: &Url, path: &str) -> Result<Url, ApiError> {
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| ApiError::Url(format!("{joined}: {e}")))
}

pub(crate) fn list_url(
    base: &Url,
    collection: &str,
    page: u32,
    per_page: u32,
    options: &ListOptions,
) -> Result<Url, ApiError> {
    let mut url = collection_url(base, collection, &["records"])?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("page", &page.to_string())
            .append_pair("perPage", &per_page.to_string())
            .append_pair("skipTotal", "1");
        if let Some(filter) = &options.filter {
            query.append_pair("filter", &filter.render());
        }
        if let Some(sort) = &options.sort {
            query.append_pair("sort", &sort.render());
        }
    }
    Ok(url)
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: BTreeMap<String, FieldError>,
}

pub(crate) fn parse_error_body(status: u16, text: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => ApiError::Response { status, message: body.message, data: body.data },
        Err(_) => ApiError::Response { status, message: text.trim().to_owned(), data: BTreeMap::new() },
    }
}

pub(crate) fn parse_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

pub(crate) fn parse_auth(body: Value) -> Result<AuthResponse, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))
}

pub(crate) fn parse_list_page(body: Value) -> Result<ListPage, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "pocketbase_test.rs"]
mod tests;
