use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::headers::{Cookie, HeaderMapExt};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    entities::Session,
    providers::{SessionError, SessionProvider},
};

/// Session token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String, // User ID
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl SessionClaims {
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: impl Into<String>, expires_in_hours: u64) -> Self {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        Self {
            sub: user_id.into(),
            role: role.into(),
            exp: now + (expires_in_hours * 3600) as usize,
            iat: now,
        }
    }
}

/// HS256 session tokens from `Authorization: Bearer` or the session cookie
#[derive(Clone)]
pub struct JwtSessionProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl JwtSessionProvider {
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            cookie_name: cookie_name.into(),
        }
    }

    /// Sign a session token; used by the login flow and tests
    pub fn issue_token(
        &self,
        user_id: &str,
        role: &str,
        expires_in_hours: u64,
    ) -> Result<String, SessionError> {
        let claims = SessionClaims::new(user_id, role, expires_in_hours);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))
    }

    fn decode_token(&self, token: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Failed to decode session token: {}", e);
                SessionError::InvalidToken(e.to_string())
            })
    }

    fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        if let Some(token) = bearer {
            return Some(token.to_string());
        }

        headers.typed_get::<Cookie>()?.get(&self.cookie_name).map(str::to_string)
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        let Some(token) = self.token_from_headers(headers) else {
            return Ok(None);
        };

        let claims = self.decode_token(&token)?;
        Ok(Some(Session::new(claims.sub, claims.role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_none, assert_ok};

    const SECRET: &str = "test-secret-key-for-sessions";

    fn provider() -> JwtSessionProvider {
        JwtSessionProvider::new(SECRET, "session")
    }

    #[tokio::test]
    async fn test_bearer_token_yields_session() {
        let provider = provider();
        let token = provider.issue_token("user-9", "admin", 1).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        let session = assert_ok!(provider.session(&headers).await).unwrap();
        assert_eq!(session.user_id.as_str(), "user-9");
        assert_eq!(session.role, "admin");
    }

    #[tokio::test]
    async fn test_session_cookie_yields_session() {
        let provider = provider();
        let token = provider.issue_token("user-10", "student", 1).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("cookie", format!("locale=en; session={token}").parse().unwrap());

        let session = assert_ok!(provider.session(&headers).await).unwrap();
        assert_eq!(session.user_id.as_str(), "user-10");
    }

    #[tokio::test]
    async fn test_anonymous_request() {
        let result = provider().session(&HeaderMap::new()).await;
        assert_none!(assert_ok!(result));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let token = JwtSessionProvider::new("another-secret", "session")
            .issue_token("user-11", "student", 1)
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        let result = provider().session(&headers).await;
        assert!(matches!(assert_err!(result), SessionError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer not.a.jwt".parse().unwrap());
        assert_err!(provider().session(&headers).await);
    }

    #[test]
    fn test_claims_expiry() {
        let claims = SessionClaims::new("user-1", "teacher", 2);
        assert_eq!(claims.exp - claims.iat, 7200);
    }
}
