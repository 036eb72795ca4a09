use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::domain::entities::Session;

/// Errors a session provider may report; the edge pipeline treats all of
/// them as "no session"
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session token rejected: {0}")]
    InvalidToken(String),
    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Resolves the authenticated session for an inbound request
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Look up the session attached to the request headers.
    ///
    /// `Ok(None)` means the request is anonymous.
    async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError>;
}

/// Provider for deployments without authentication
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessionProvider;

#[async_trait]
impl SessionProvider for NoSessionProvider {
    async fn session(&self, _headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        Ok(None)
    }
}
