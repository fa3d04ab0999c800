//! In-memory backend and fixtures shared by unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Method;
use serde_json::{Value, json};

use super::types::{ApiError, AuthResponse, FieldError, ListOptions};
use super::{AuthStore, Backend};
use crate::filter::Filter;

// =============================================================================
// TOKENS
// =============================================================================

pub(crate) fn jwt_with_claims(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub(crate) fn fresh_token() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    jwt_with_claims(&json!({ "id": "u1", "exp": now + 3600 }))
}

pub(crate) fn expired_token() -> String {
    jwt_with_claims(&json!({ "id": "u1", "exp": 1_000 }))
}

// =============================================================================
// FIXTURES
// =============================================================================

/// User record with `role.permissions` expanded to `permissions`.
pub(crate) fn user_record(id: &str, username: &str, permissions: &[&str]) -> Value {
    let expanded: Vec<Value> = permissions
        .iter()
        .enumerate()
        .map(|(i, key)| json!({ "id": format!("p{i}"), "key": key }))
        .collect();
    json!({
        "id": id,
        "collectionId": "_pb_users_auth_",
        "collectionName": "users",
        "email": format!("{username}@example.com"),
        "username": username,
        "verified": true,
        "role": "r1",
        "expand": {
            "role": {
                "id": "r1",
                "name": "user",
                "permissions": expanded.iter().map(|p| p["id"].clone()).collect::<Vec<_>>(),
                "expand": { "permissions": expanded }
            }
        }
    })
}

pub(crate) fn menu_item(id: &str, order: i64, required_permission: &str) -> Value {
    json!({
        "id": id,
        "label": id,
        "path": format!("/{id}"),
        "order": order,
        "requiredPermission": required_permission
    })
}

fn bad_request(message: &str) -> ApiError {
    ApiError::Response { status: 400, message: message.to_owned(), data: BTreeMap::new() }
}

fn unauthorized() -> ApiError {
    ApiError::Response {
        status: 401,
        message: "The request requires valid record authorization token.".to_owned(),
        data: BTreeMap::new(),
    }
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

struct Credential {
    collection: String,
    identity: String,
    password: String,
    user_id: String,
}

/// In-memory backend with failure injection and call recording.
#[derive(Default)]
pub(crate) struct MockBackend {
    auth: AuthStore,
    users: Mutex<Vec<Value>>,
    credentials: Mutex<Vec<Credential>>,
    roles: Mutex<Vec<Value>>,
    menu_items: Mutex<Vec<Value>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    refresh_delays: Mutex<VecDeque<Duration>>,
    login_delays: Mutex<VecDeque<Duration>>,
    calls: Mutex<Vec<String>>,
    last_menu_filter: Mutex<Option<String>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_user(&self, record: Value, password: &str) {
        let id = record["id"].as_str().unwrap().to_owned();
        let collection = record["collectionName"].as_str().unwrap_or("users").to_owned();
        let mut credentials = self.credentials.lock().unwrap();
        for field in ["email", "username"] {
            if let Some(identity) = record[field].as_str() {
                credentials.push(Credential {
                    collection: collection.clone(),
                    identity: identity.to_owned(),
                    password: password.to_owned(),
                    user_id: id.clone(),
                });
            }
        }
        self.users.lock().unwrap().push(record);
    }

    /// Replace a stored user record wholesale.
    pub(crate) fn replace_user(&self, record: Value) {
        let mut users = self.users.lock().unwrap();
        if let Some(slot) = users.iter_mut().find(|u| u["id"] == record["id"]) {
            *slot = record;
        }
    }

    pub(crate) fn user(&self, id: &str) -> Option<Value> {
        self.users.lock().unwrap().iter().find(|u| u["id"] == id).cloned()
    }

    pub(crate) fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub(crate) fn add_role(&self, id: &str, name: &str) {
        self.roles.lock().unwrap().push(json!({ "id": id, "name": name }));
    }

    pub(crate) fn set_menu(&self, items: Vec<Value>) {
        *self.menu_items.lock().unwrap() = items;
    }

    /// Make every call to `op` fail with `err` until cleared.
    pub(crate) fn fail(&self, op: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// Delay the next `auth_refresh` response by `delay`.
    pub(crate) fn delay_next_refresh(&self, delay: Duration) {
        self.refresh_delays.lock().unwrap().push_back(delay);
    }

    /// Delay the next successful `auth_with_password` before it saves.
    pub(crate) fn delay_next_login(&self, delay: Duration) {
        self.login_delays.lock().unwrap().push_back(delay);
    }

    /// Save a valid token for `user_id` as if a previous process signed in.
    pub(crate) fn sign_in(&self, user_id: &str) {
        let record = self.user(user_id).unwrap();
        self.auth.save(&fresh_token(), Some(record));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn called(&self, op: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == op)
    }

    pub(crate) fn last_menu_filter(&self) -> Option<String> {
        self.last_menu_filter.lock().unwrap().clone()
    }

    fn enter(&self, op: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(op.to_owned());
        match self.failures.lock().unwrap().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn current_user(&self) -> Result<Value, ApiError> {
        if !self.auth.is_valid() {
            return Err(unauthorized());
        }
        let id = self
            .auth
            .record()
            .and_then(|r| r["id"].as_str().map(str::to_owned))
            .ok_or_else(unauthorized)?;
        self.user(&id).ok_or_else(unauthorized)
    }

    fn conflicts(&self, data: &Value) -> BTreeMap<String, FieldError> {
        let users = self.users.lock().unwrap();
        let mut conflicts = BTreeMap::new();
        for field in ["email", "username", "phone"] {
            let Some(value) = data[field].as_str() else {
                continue;
            };
            if users.iter().any(|u| u[field].as_str() == Some(value)) {
                conflicts.insert(
                    field.to_owned(),
                    FieldError { code: "validation_not_unique".to_owned(), message: "Value must be unique.".to_owned() },
                );
            }
        }
        conflicts
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    fn auth_store(&self) -> &AuthStore {
        &self.auth
    }

    async fn auth_with_password(
        &self,
        collection: &str,
        identity: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.enter("auth_with_password")?;
        let user_id = self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.collection == collection && c.identity == identity && c.password == password)
            .map(|c| c.user_id.clone())
            .ok_or_else(|| bad_request("Failed to authenticate."))?;
        let record = self.user(&user_id).ok_or_else(|| bad_request("Failed to authenticate."))?;
        let delay = self.login_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let token = fresh_token();
        self.auth.save(&token, Some(record.clone()));
        Ok(AuthResponse { token, record })
    }

    async fn auth_refresh(&self, collection: &str, _expand: Option<&str>) -> Result<AuthResponse, ApiError> {
        self.enter("auth_refresh")?;
        let record = self.current_user()?;
        if record["collectionName"].as_str() != Some(collection) {
            return Err(unauthorized());
        }
        let delay = self.refresh_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(AuthResponse { token: fresh_token(), record })
    }

    async fn send(&self, method: Method, path: &str, _body: Option<&Value>) -> Result<Value, ApiError> {
        self.enter("send")?;
        if method == Method::GET && path == "/api/me" {
            return self.current_user();
        }
        Err(ApiError::not_found())
    }

    async fn get_full_list(&self, collection: &str, options: &ListOptions) -> Result<Vec<Value>, ApiError> {
        self.enter("get_full_list")?;
        if collection != "menu_items" {
            return Ok(Vec::new());
        }
        *self.last_menu_filter.lock().unwrap() = options.filter.as_ref().map(Filter::render);
        let mut items: Vec<Value> = self
            .menu_items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| options.filter.as_ref().is_none_or(|f| f.matches(item)))
            .cloned()
            .collect();
        if let Some(sort) = options.sort {
            let key = |item: &Value| item[sort.field()].as_f64().unwrap_or_default();
            items.sort_by(|a, b| key(a).total_cmp(&key(b)));
        }
        Ok(items)
    }

    async fn get_first_list_item(&self, collection: &str, filter: &Filter) -> Result<Value, ApiError> {
        self.enter("get_first_list_item")?;
        if collection != "roles" {
            return Err(ApiError::not_found());
        }
        self.roles
            .lock()
            .unwrap()
            .iter()
            .find(|r| filter.matches(r))
            .cloned()
            .ok_or_else(ApiError::not_found)
    }

    async fn get_one(&self, collection: &str, id: &str, _expand: Option<&str>) -> Result<Value, ApiError> {
        self.enter("get_one")?;
        let found = match collection {
            "roles" => self.roles.lock().unwrap().iter().find(|r| r["id"] == id).cloned(),
            _ => self.user(id),
        };
        found.ok_or_else(ApiError::not_found)
    }

    async fn create(&self, collection: &str, data: &Value) -> Result<Value, ApiError> {
        self.enter("create")?;
        let conflicts = self.conflicts(data);
        if !conflicts.is_empty() {
            return Err(ApiError::Response {
                status: 400,
                message: "Failed to create record.".to_owned(),
                data: conflicts,
            });
        }
        let mut record = data.clone();
        let id = format!("u{}", self.user_count() + 100);
        if let Some(obj) = record.as_object_mut() {
            obj.remove("password");
            obj.remove("passwordConfirm");
            obj.insert("id".to_owned(), json!(id));
            obj.insert("collectionName".to_owned(), json!(collection));
        }
        let password = data["password"].as_str().unwrap_or_default().to_owned();
        self.add_user(record.clone(), &password);
        Ok(record)
    }

    async fn update(&self, _collection: &str, id: &str, data: &Value) -> Result<Value, ApiError> {
        self.enter("update")?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u["id"] == id)
            .ok_or_else(ApiError::not_found)?;
        if let (Some(target), Some(patch)) = (user.as_object_mut(), data.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(user.clone())
    }

    async fn request_verification(&self, _collection: &str, _email: &str) -> Result<(), ApiError> {
        self.enter("request_verification")
    }

    async fn request_email_change(&self, _collection: &str, _new_email: &str) -> Result<(), ApiError> {
        self.enter("request_email_change")
    }

    async fn confirm_email_change(&self, _collection: &str, _token: &str, _password: &str) -> Result<(), ApiError> {
        self.enter("confirm_email_change")
    }

    async fn request_password_reset(&self, _collection: &str, _email: &str) -> Result<(), ApiError> {
        self.enter("request_password_reset")
    }

    async fn confirm_password_reset(
        &self,
        _collection: &str,
        _token: &str,
        _password: &str,
        _password_confirm: &str,
    ) -> Result<(), ApiError> {
        self.enter("confirm_password_reset")
    }
}
