//! Edge request pipeline middleware
//!
//! Stages, in the order they run:
//! - Host and protocol canonicalization
//! - Security headers and CSP nonce
//! - Per-client rate limiting
//! - Request logging
//! - Locale resolution and routing

pub mod canonical;
pub mod edge;
pub mod error;
pub mod locale;
pub mod logging;
pub mod rate_limit;
pub mod request_id;
pub mod security;

// Re-export commonly used types
pub use edge::{edge_middleware, in_edge_scope, EdgeOutcome, EdgePipeline};
pub use error::{AppError, ErrorResponse};
pub use locale::{LocaleRouter, LOCALE_HEADER};
pub use logging::{RequestLogRecord, RequestLogSink, RequestLoggingConfig, TracingLogSink};
pub use rate_limit::{FixedWindowRateLimiter, RateLimitConfig, RateLimitDecision};
pub use request_id::REQUEST_ID_HEADER;
pub use security::{SecurityContext, SecurityPolicy, NONCE_HEADER};
