#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use edge_gateway::infrastructure::{
    config::{AppConfig, EdgeConfig, LoggingConfig, RuntimeMode, ServerConfig, SessionConfig},
    http::{build_pipeline, create_app},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub fn test_config(edge: EdgeConfig) -> AppConfig {
    AppConfig {
        mode: RuntimeMode::Local,
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 0 },
        edge,
        session: SessionConfig { jwt_secret: None, cookie_name: "session".to_string() },
        logging: LoggingConfig::default(),
    }
}

pub fn production_edge() -> EdgeConfig {
    EdgeConfig { is_production: true, ..EdgeConfig::default() }
}

pub struct TestApp {
    pub router: Router,
}

impl TestApp {
    pub fn new(edge: EdgeConfig) -> Self {
        Self::with_config(&test_config(edge))
    }

    pub fn with_config(config: &AppConfig) -> Self {
        let pipeline = build_pipeline(config).unwrap();
        Self { router: create_app(pipeline) }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_with_headers(path, &[]).await
    }

    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().uri(path).method("GET");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder.body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        TestResponse::new(response).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    async fn new(response: axum::response::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();

        Self { status, headers, body }
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(self.status, expected, "Response body: {}", self.body);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers.get_all("set-cookie").iter().filter_map(|v| v.to_str().ok()).collect()
    }

    /// Nonce quoted in the Content-Security-Policy `script-src` directive
    pub fn csp_nonce(&self) -> Option<&str> {
        let csp = self.header("content-security-policy")?;
        let start = csp.find("'nonce-")? + "'nonce-".len();
        let end = csp[start..].find('\'')? + start;
        Some(&csp[start..end])
    }

    pub fn json<T>(&self) -> T
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.body).unwrap()
    }
}
