//! `reqwest`-backed `Transport`.
//!
//! Executes the plain-data requests the core builds. Non-2xx responses are
//! handed back as data; only a request that never got an answer becomes an
//! `ApiError::Transport`. There is no timeout and no retry: a slow call is
//! applied whenever it resolves.

use async_trait::async_trait;
use reqwest::{Client, Method};
use todo_core::{ApiError, HttpMethod, HttpRequest, HttpResponse, Transport};
use tracing::debug;

pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        Ok(Self { http })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "execute: sending");
        let mut builder = self.http.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(status, "execute: response received");

        Ok(HttpResponse { status, headers, body })
    }
}
