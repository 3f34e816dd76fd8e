//! Outbound HTTP: a plain description of one request, and the single place
//! that turns it into a `reqwest` call.
//!
//! Sources build [`HttpRequest`] values without touching the network, which
//! keeps their request shape testable and leaves timing, logging and status
//! handling to [`HttpRequest::send`].

use crate::utils::truncate_for_log;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    None,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A request a source wants issued.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub basic_auth: Option<(String, String)>,
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::None,
            basic_auth: None,
            bearer: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.body = Body::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Value of a query parameter, if set.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Issue the request and read the whole body as text.
    ///
    /// Any status is returned as a response; only transport failures
    /// (connect, timeout, TLS, body read) are errors.
    #[instrument(level = "debug", skip_all, fields(method = ?self.method, url = %self.url))]
    pub async fn send(&self, client: &Client) -> Result<HttpResponse, reqwest::Error> {
        let mut builder = match self.method {
            Method::Get => client.get(&self.url),
            Method::Post => client.post(&self.url),
        };
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some((user, password)) = &self.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &self.body {
            Body::None => builder,
            Body::Json(value) => builder.json(value),
            Body::Form(pairs) => builder.form(pairs),
        };

        let t0 = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if status == 200 {
            info!(status, elapsed_ms, bytes = body.len(), "HTTP response");
        } else {
            warn!(
                status,
                elapsed_ms,
                body = %truncate_for_log(&body, 300),
                "HTTP non-success response"
            );
        }
        debug!(body = %truncate_for_log(&body, 1_000), "Response body");

        Ok(HttpResponse { status, body })
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Only a plain 200 counts as a page.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Statuses worth retrying after the backoff sleep.
    pub fn is_transient(&self) -> bool {
        matches!(self.status, 429 | 500 | 502 | 503 | 504)
    }
}

/// Build the shared client with explicit request and connect timeouts.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_builder_collects_parts() {
        let req = HttpRequest::get("http://x/api")
            .query("q", "Jennifer Dy")
            .query("h", 20)
            .header("x-api-key", "k");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query_value("h"), Some("20"));
        assert_eq!(req.query_value("missing"), None);
        assert_eq!(req.headers, vec![("x-api-key".to_string(), "k".to_string())]);
    }

    #[test]
    fn test_status_classes() {
        let resp = |status| HttpResponse {
            status,
            body: String::new(),
        };
        assert!(resp(200).is_success());
        assert!(!resp(201).is_success());
        assert!(resp(429).is_transient());
        assert!(resp(503).is_transient());
        assert!(!resp(404).is_transient());
    }

    #[tokio::test]
    async fn test_send_get_with_query_and_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "dy"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let resp = HttpRequest::get(format!("{}/search", server.uri()))
            .query("q", "dy")
            .header("x-api-key", "secret")
            .send(&client)
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "ok");
    }

    #[tokio::test]
    async fn test_send_post_json_returns_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/projects/search"))
            .and(body_json(json!({"offset": 0})))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let resp = HttpRequest::post(format!("{}/v2/projects/search", server.uri()))
            .json(json!({"offset": 0}))
            .send(&client)
            .await
            .unwrap();
        assert_eq!(resp.status, 503);
        assert!(resp.is_transient());
    }
}
