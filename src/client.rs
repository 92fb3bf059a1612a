//! HTTP client for the platform API: collection fetches, login, and
//! mutations, all authenticated with the realm's stored bearer token.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::ApiError;
use crate::models::{CollectionPage, Entity, Realm, Record};
use crate::session::{AuthToken, SessionStore};

/// Server-side pagination request (`page` / `itemsPerPage` query params).
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub items_per_page: u64,
}

/// Seam for anything that can produce a collection, so the polling
/// coordinator and tests can run without the HTTP client.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn fetch(
        &self,
        entity: Entity,
        page: Option<PageRequest>,
    ) -> Result<CollectionPage, ApiError>;
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    sessions: SessionStore,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    token: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config, sessions: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(&config.http.user_agent)
            .timeout(config.http_timeout())
            .build()?;

        Ok(ApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            sessions,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn bearer(&self, realm: Realm) -> Result<AuthToken, ApiError> {
        self.sessions
            .load(realm)
            .ok_or(ApiError::NotAuthenticated { realm })
    }

    /// Authenticate against a realm's login endpoint and persist the
    /// returned token.
    pub async fn login(
        &self,
        realm: Realm,
        username: &str,
        password: &str,
    ) -> Result<AuthToken, ApiError> {
        info!("Logging in to the {} realm", realm.as_str());

        let response = self
            .http
            .post(self.url(realm.login_path()))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(login_failure(status, &text));
        }

        let body: LoginResponse = serde_json::from_str(&text)?;
        if !body.success {
            return Err(ApiError::LoginFailed(
                body.message
                    .unwrap_or_else(|| "Invalid username or password".to_string()),
            ));
        }

        let token = AuthToken::new(body.token.ok_or_else(|| {
            ApiError::LoginFailed("Login succeeded but no token was returned".to_string())
        })?);
        self.sessions
            .save(realm, &token)
            .map_err(|e| ApiError::Config(e.to_string()))?;
        info!("Logged in; token {} stored", token);
        Ok(token)
    }

    pub fn logout(&self, realm: Realm) -> Result<(), ApiError> {
        self.sessions
            .clear(realm)
            .map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Fetch one entity collection, replacing any previous snapshot
    /// wholesale. Server pagination metadata is carried through when the
    /// endpoint provides it.
    pub async fn fetch_collection(
        &self,
        entity: Entity,
        page: Option<PageRequest>,
    ) -> Result<CollectionPage, ApiError> {
        let token = self.bearer(entity.realm())?;
        let mut request = self
            .http
            .get(self.url(entity.path()))
            .bearer_auth(token.as_str());
        if let Some(p) = page {
            request = request.query(&[("page", p.page), ("itemsPerPage", p.items_per_page)]);
        }

        debug!("GET {}", entity.path());
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        let body: Value = serde_json::from_str(&text)?;
        parse_collection(entity, body)
    }

    pub async fn create(&self, entity: Entity, body: Value) -> Result<String, ApiError> {
        self.mutate(Method::POST, entity, entity.mutation_path().to_string(), Some(body))
            .await
    }

    pub async fn update(&self, entity: Entity, id: &str, body: Value) -> Result<String, ApiError> {
        let path = format!("{}/{}", entity.mutation_path(), id);
        self.mutate(Method::PUT, entity, path, Some(body)).await
    }

    pub async fn delete(&self, entity: Entity, id: &str) -> Result<String, ApiError> {
        let path = format!("{}/{}", entity.mutation_path(), id);
        self.mutate(Method::DELETE, entity, path, None).await
    }

    /// Shared mutation path. State changes are never applied
    /// speculatively: callers re-fetch the collection after a confirmed
    /// success, and a failure surfaces the server's message when it sent
    /// one.
    async fn mutate(
        &self,
        method: Method,
        entity: Entity,
        path: String,
        body: Option<Value>,
    ) -> Result<String, ApiError> {
        let token = self.bearer(entity.realm())?;
        let mut request = self
            .http
            .request(method.clone(), self.url(&path))
            .bearer_auth(token.as_str());
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("{} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        Ok(serde_json::from_str::<ApiMessage>(&text)
            .ok()
            .and_then(|m| m.message)
            .unwrap_or_else(|| "OK".to_string()))
    }
}

#[async_trait]
impl CollectionSource for ApiClient {
    async fn fetch(
        &self,
        entity: Entity,
        page: Option<PageRequest>,
    ) -> Result<CollectionPage, ApiError> {
        self.fetch_collection(entity, page).await
    }
}

/// Map a failed login response, whatever its body. A JSON body with a
/// `message` keeps the server's wording; a proxy error page or an empty
/// body falls back to the status reason instead of a parse error.
fn login_failure(status: StatusCode, body: &str) -> ApiError {
    match api_error(status, body) {
        ApiError::Api { message, .. } => ApiError::LoginFailed(message),
        other => other,
    }
}

/// Map a non-success response to a typed error, preferring the server's
/// own `message` field over raw body text.
fn api_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ApiMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });
    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Extract the record array and pagination metadata from a response body.
///
/// The API is not uniform: some endpoints wrap the array under a named
/// key, most use a `data` envelope, a few return a bare array. Non-object
/// array elements are dropped rather than failing the whole fetch.
fn parse_collection(entity: Entity, body: Value) -> Result<CollectionPage, ApiError> {
    let (items, total_pages, total_count) = match body {
        Value::Array(items) => (items, None, None),
        Value::Object(map) => {
            let items = map
                .get(entity.array_key())
                .or_else(|| map.get("data"))
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| ApiError::MissingCollection {
                    key: entity.array_key().to_string(),
                })?;

            let total_pages = map.get("totalPages").and_then(Value::as_u64);
            let total_count = ["totalCount", "totalInstructors", "total"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_u64));
            (items, total_pages, total_count)
        }
        _ => {
            return Err(ApiError::MissingCollection {
                key: entity.array_key().to_string(),
            })
        }
    };

    let records: Vec<Record> = items.into_iter().filter_map(Record::from_value).collect();
    Ok(CollectionPage {
        records,
        total_pages,
        total_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_collection_named_array_key() {
        let body = json!({
            "admissionLeads": [
                { "name": "Asha", "state": "UP" },
                { "name": "Ravi", "state": "MH" }
            ]
        });
        let page = parse_collection(Entity::AdmissionLeads, body).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total_pages, None);
        assert_eq!(page.records[0].text("name").as_deref(), Some("Asha"));
    }

    #[test]
    fn test_parse_collection_falls_back_to_data_envelope() {
        let body = json!({ "data": [ { "name": "Campus enquiry" } ] });
        let page = parse_collection(Entity::Faculty, body).unwrap();
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn test_parse_collection_bare_array() {
        let body = json!([ { "name": "a" }, { "name": "b" } ]);
        let page = parse_collection(Entity::Events, body).unwrap();
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn test_parse_collection_server_pagination_metadata() {
        let body = json!({
            "instructors": [ { "name": "Dr. Rao", "dateApplied": "2025-01-15T10:00:00Z" } ],
            "totalPages": 4,
            "totalInstructors": 17
        });
        let page = parse_collection(Entity::AppliedInstructors, body).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_pages, Some(4));
        assert_eq!(page.total_count, Some(17));
    }

    #[test]
    fn test_parse_collection_missing_key_is_an_error() {
        let body = json!({ "message": "forbidden" });
        let err = parse_collection(Entity::Enquiries, body).unwrap_err();
        assert!(matches!(err, ApiError::MissingCollection { .. }));
    }

    #[test]
    fn test_parse_collection_drops_non_object_elements() {
        let body = json!({ "events": [ { "title": "Orientation" }, 42, null ] });
        let page = parse_collection(Entity::Events, body).unwrap();
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn test_api_error_prefers_server_message() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{ "success": false, "message": "University already exists" }"#,
        );
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "University already exists");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_generic_when_body_is_not_json() {
        let err = api_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_login_failure_keeps_server_message() {
        let err = login_failure(
            StatusCode::UNAUTHORIZED,
            r#"{ "success": false, "message": "Invalid username or password" }"#,
        );
        match err {
            ApiError::LoginFailed(message) => {
                assert_eq!(message, "Invalid username or password");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_login_failure_with_non_json_body_is_not_a_parse_error() {
        // a proxy can answer with an HTML error page
        let err = login_failure(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>");
        match err {
            ApiError::LoginFailed(message) => {
                assert_eq!(message, "<html>Bad Gateway</html>");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = login_failure(StatusCode::BAD_GATEWAY, "");
        match err {
            ApiError::LoginFailed(message) => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_login_response_deserialization() {
        let body = r#"{ "success": true, "token": "jwt-abc", "message": "Login Successful" }"#;
        let parsed: LoginResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.token.as_deref(), Some("jwt-abc"));

        let body = r#"{ "success": false, "message": "Invalid username or password" }"#;
        let parsed: LoginResponse = serde_json::from_str(body).unwrap();
        assert!(!parsed.success);
        assert!(parsed.token.is_none());
    }
}
