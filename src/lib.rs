#![deny(clippy::all)]
#![deny(clippy::pedantic)]
// Allow some overly strict pedantic lints for middleware code
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]

//! Edge Gateway
//!
//! The request pipeline that runs in front of every page of the web
//! application: host and protocol canonicalization, security headers with a
//! per-request CSP nonce, per-client rate limiting, request logging, and
//! locale routing.

pub mod domain;
pub mod infrastructure;
pub mod presentation;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use domain::entities::*;
pub use presentation::middleware::{edge_middleware, EdgePipeline};
