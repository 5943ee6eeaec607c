//! Stateless HTTP request builder and response parser for the todo resource.
//!
//! # Design
//! `RestClient` holds only the collection URL and the access key. Each CRUD
//! operation is split into a `build_*` method that produces an `HttpRequest`
//! and a `parse_*` method that consumes an `HttpResponse`. Executing the
//! round-trip is somebody else's job, which keeps this module deterministic.
//!
//! The wire dialect is PostgREST: filters go in the query string
//! (`id=eq.<id>`), ordering is `order=created_at.desc`, and writes ask for the
//! affected rows back with `Prefer: return=representation`. Writes answer with
//! an array; the first element is the record.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{NewTodo, Todo, TodoId, TodoPatch};

/// Characters left bare in a filter value; everything else is escaped so an
/// id cannot break out of `id=eq.<id>`.
const FILTER_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Synchronous, stateless client for the remote todo collection.
#[derive(Debug, Clone)]
pub struct RestClient {
    collection_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            collection_url: format!("{}/todos", config.rest_base()),
            api_key: config.api_key.clone(),
        }
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    /// Headers sent on every request.
    fn auth_headers(&self) -> Vec<(String, String)> {
        vec![
            ("apikey".to_string(), self.api_key.clone()),
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }

    fn write_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.auth_headers();
        headers.push(("Prefer".to_string(), "return=representation".to_string()));
        headers
    }

    fn scoped_url(&self, id: &TodoId) -> String {
        let id = id.to_string();
        let value = utf8_percent_encode(&id, FILTER_VALUE);
        format!("{}?id=eq.{value}", self.collection_url)
    }

    pub fn build_list(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}?select=*&order=created_at.desc", self.collection_url),
            headers: self.auth_headers(),
            body: None,
        }
    }

    pub fn build_create(&self, input: &NewTodo) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.collection_url.clone(),
            headers: self.write_headers(),
            body: Some(body),
        })
    }

    pub fn build_update(&self, id: &TodoId, patch: &TodoPatch) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(patch).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Patch,
            url: self.scoped_url(id),
            headers: self.write_headers(),
            body: Some(body),
        })
    }

    pub fn build_delete(&self, id: &TodoId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: self.scoped_url(id),
            headers: self.auth_headers(),
            body: None,
        }
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response)?;
        first_record(&response.body)
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response)?;
        first_record(&response.body)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

/// Every non-2xx status is the same failure to the caller.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    debug!(status = response.status, "check_status: non-success response");
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn first_record(body: &str) -> Result<Todo, ApiError> {
    let rows: Vec<Todo> = decode(body)?;
    rows.into_iter().next().ok_or(ApiError::EmptyRepresentation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = r#"{"id":1,"text":"Test","completed":false,"created_at":"2024-01-01T00:00:00Z"}"#;

    fn client() -> RestClient {
        RestClient::new(&RemoteConfig::new("http://localhost:3000", "anon-key"))
    }

    #[test]
    fn build_list_orders_newest_first() {
        let req = client().build_list();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.url,
            "http://localhost:3000/rest/v1/todos?select=*&order=created_at.desc"
        );
        assert!(req.body.is_none());
        assert_eq!(req.header("prefer"), None);
    }

    #[test]
    fn every_request_is_authenticated() {
        let c = client();
        let id = TodoId::Number(1);
        let requests = vec![
            c.build_list(),
            c.build_create(&NewTodo::new("x", "2024-01-01T00:00:00Z".parse().unwrap()))
                .unwrap(),
            c.build_update(&id, &TodoPatch::completed(true)).unwrap(),
            c.build_delete(&id),
        ];
        for req in requests {
            assert_eq!(req.header("apikey"), Some("anon-key"), "{}", req.method);
            assert_eq!(req.header("authorization"), Some("Bearer anon-key"), "{}", req.method);
        }
    }

    #[test]
    fn build_create_asks_for_representation() {
        let input = NewTodo::new("Buy milk", "2024-01-01T00:00:00Z".parse().unwrap());
        let req = client().build_create(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/rest/v1/todos");
        assert_eq!(req.header("Prefer"), Some("return=representation"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["text"], "Buy milk");
        assert_eq!(body["completed"], false);
        assert!(body.get("id").is_none());
    }

    #[test]
    fn build_update_is_scoped_and_partial() {
        let req = client()
            .build_update(&TodoId::Number(42), &TodoPatch::completed(true))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.url, "http://localhost:3000/rest/v1/todos?id=eq.42");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"completed": true}));
    }

    #[test]
    fn build_delete_is_scoped() {
        let req = client().build_delete(&TodoId::Text("abc".to_string()));
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:3000/rest/v1/todos?id=eq.abc");
        assert!(req.body.is_none());
    }

    #[test]
    fn filter_value_is_percent_encoded() {
        let c = client();
        let req = c.build_delete(&TodoId::Text("a b&order=x#y".to_string()));
        assert_eq!(
            req.url,
            "http://localhost:3000/rest/v1/todos?id=eq.a%20b%26order%3Dx%23y"
        );

        let uuid = "00000000-0000-0000-0000-000000000001";
        let req = c.build_update(&TodoId::from(uuid), &TodoPatch::completed(true)).unwrap();
        assert_eq!(req.url, format!("http://localhost:3000/rest/v1/todos?id=eq.{uuid}"));
    }

    #[test]
    fn parse_list_success() {
        let todos = client()
            .parse_list(HttpResponse::new(200, format!("[{ROW}]")))
            .unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].text, "Test");
    }

    #[test]
    fn parse_create_takes_first_row() {
        let todo = client()
            .parse_create(HttpResponse::new(201, format!("[{ROW}]")))
            .unwrap();
        assert_eq!(todo.id, TodoId::Number(1));
    }

    #[test]
    fn parse_create_empty_array_is_an_error() {
        let err = client().parse_create(HttpResponse::new(201, "[]")).unwrap_err();
        assert_eq!(err, ApiError::EmptyRepresentation);
    }

    #[test]
    fn parse_create_server_error() {
        let err = client()
            .parse_create(HttpResponse::new(500, "internal error"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
    }

    #[test]
    fn client_errors_are_not_special() {
        let err = client().parse_update(HttpResponse::new(404, "")).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn parse_delete_accepts_any_2xx() {
        assert!(client().parse_delete(HttpResponse::new(204, "")).is_ok());
        assert!(client().parse_delete(HttpResponse::new(200, "")).is_ok());
    }

    #[test]
    fn parse_list_bad_json() {
        let err = client().parse_list(HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let c = RestClient::new(&RemoteConfig::new("http://localhost:3000/", "k"));
        assert_eq!(c.collection_url(), "http://localhost:3000/rest/v1/todos");
    }
}
