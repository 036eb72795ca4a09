use axum::http::{HeaderMap, Method};
use axum_extra::headers::{HeaderMapExt, UserAgent};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    domain::{entities::Session, value_objects::ClientIdentity},
    infrastructure::config::LoggingConfig,
};

/// Request logging configuration
#[derive(Debug, Clone)]
pub struct RequestLoggingConfig {
    /// Include the user agent in request records
    pub log_user_agent: bool,
    /// User agents longer than this are truncated
    pub max_user_agent_length: usize,
}

impl Default for RequestLoggingConfig {
    fn default() -> Self {
        Self { log_user_agent: true, max_user_agent_length: 256 }
    }
}

impl RequestLoggingConfig {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            log_user_agent: config.log_user_agent,
            max_user_agent_length: config.max_user_agent_length,
        }
    }

    fn user_agent(&self, headers: &HeaderMap) -> Option<String> {
        if !self.log_user_agent {
            return None;
        }
        let agent = headers.typed_get::<UserAgent>()?;
        Some(agent.as_str().chars().take(self.max_user_agent_length).collect())
    }
}

/// One structured record per request admitted by the rate limiter
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogRecord {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub client: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub timestamp: String,
}

impl RequestLogRecord {
    pub fn new(
        config: &RequestLoggingConfig,
        request_id: &str,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        client: &ClientIdentity,
        session: Option<&Session>,
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            method: method.as_str().to_string(),
            path: path.to_string(),
            client: client.to_string(),
            user_agent: config.user_agent(headers),
            user_id: session.map(|s| s.user_id.to_string()),
            role: session.map(|s| s.role.clone()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("Failed to serialize log record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Log sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for request log records
pub trait RequestLogSink: Send + Sync {
    fn record(&self, record: &RequestLogRecord) -> Result<(), LogSinkError>;
}

/// Emits records as JSON through `tracing` on the `http_requests` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl RequestLogSink for TracingLogSink {
    fn record(&self, record: &RequestLogRecord) -> Result<(), LogSinkError> {
        let mut log_data = serde_json::to_value(record)?;
        log_data["type"] = json!("request");
        info!(target: "http_requests", "{}", log_data);
        Ok(())
    }
}

/// Write a record; sink failures are reported and never propagate
pub fn log_request(sink: &dyn RequestLogSink, record: &RequestLogRecord) {
    if let Err(e) = sink.record(record) {
        warn!(request_id = %record.request_id, error = %e, "Dropping request log record");
    }
}
