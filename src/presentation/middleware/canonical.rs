//! Host and protocol canonicalization.
//!
//! Requests addressed to a `www.` host, or arriving over plain HTTP when HTTPS
//! is enforced, are answered with one permanent redirect to the canonical
//! `https://` URL. A missing or malformed `Host` never triggers a redirect.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{HeaderMapExt, Host};
use std::net::IpAddr;
use tracing::warn;

use super::error::AppError;

/// Protocol the client used to reach the edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// Effective protocol: `x-forwarded-proto`, then the URI scheme, then plain HTTP
pub fn effective_protocol(headers: &HeaderMap, uri: &Uri) -> Protocol {
    let forwarded = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded.or_else(|| uri.scheme_str()) {
        Some(scheme) if scheme.eq_ignore_ascii_case("https") => Protocol::Https,
        _ => Protocol::Http,
    }
}

/// Validated request host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHost {
    hostname: String,
    port: Option<u16>,
}

impl CanonicalHost {
    /// Read the host from the `Host` header, or from the URI authority for
    /// HTTP/2 requests that carry none. Returns `None` when it is malformed.
    pub fn from_request(headers: &HeaderMap, uri: &Uri) -> Option<Self> {
        if headers.contains_key(header::HOST) {
            let host = headers.typed_get::<Host>()?;
            return Self::new(host.hostname(), host.port());
        }

        let authority = uri.authority()?;
        Self::new(authority.host(), authority.port_u16())
    }

    pub fn new(hostname: &str, port: Option<u16>) -> Option<Self> {
        let hostname = hostname.trim().to_ascii_lowercase();
        let valid = if let Some(inner) =
            hostname.strip_prefix('[').and_then(|h| h.strip_suffix(']'))
        {
            !inner.is_empty()
                && inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
        } else {
            // A bare `www.` would canonicalize to an empty authority
            let apex = hostname.strip_prefix("www.").unwrap_or(&hostname);
            !apex.is_empty()
                && !hostname.starts_with('.')
                && !hostname.contains("..")
                && hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        };

        valid.then_some(Self { hostname, port })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn is_www(&self) -> bool {
        self.hostname.starts_with("www.")
    }

    /// `localhost`, `*.localhost`, or a loopback IP literal
    pub fn is_loopback(&self) -> bool {
        if self.hostname == "localhost" || self.hostname.ends_with(".localhost") {
            return true;
        }

        let literal = self
            .hostname
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.hostname);
        literal.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
    }

    /// Host and port as received
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.hostname),
            None => self.hostname.clone(),
        }
    }

    /// Host and port with any leading `www.` removed
    pub fn canonical_authority(&self) -> String {
        let hostname = self.hostname.strip_prefix("www.").unwrap_or(&self.hostname);
        match self.port {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.to_string(),
        }
    }
}

/// HTTPS is enforced for production traffic that is not addressed to a local host
pub fn https_enforced(
    is_production: bool,
    is_local_host: bool,
    host: Option<&CanonicalHost>,
) -> bool {
    is_production && !is_local_host && host.is_some_and(|h| !h.is_loopback())
}

/// The parts of a request the canonicalizer looks at
#[derive(Debug, Clone, Copy)]
pub struct CanonicalRequest<'a> {
    pub host: Option<&'a CanonicalHost>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalDecision {
    PassThrough,
    Redirect { location: String },
}

/// Decide whether the request must be redirected to its canonical URL.
///
/// A single check covers both the `www.` host and the plain HTTP cases, so a
/// request is redirected at most once here.
pub fn canonicalize(request: &CanonicalRequest<'_>, https_enforced: bool) -> CanonicalDecision {
    let Some(host) = request.host else {
        return CanonicalDecision::PassThrough;
    };

    if host.is_www() || (https_enforced && request.protocol == Protocol::Http) {
        CanonicalDecision::Redirect {
            location: format!(
                "https://{}{}{}",
                host.canonical_authority(),
                request.path,
                query_suffix(request.query)
            ),
        }
    } else {
        CanonicalDecision::PassThrough
    }
}

/// `?query` or an empty string
pub fn query_suffix(query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("?{q}"),
        _ => String::new(),
    }
}

/// 301 response pointing at `location`
pub fn permanent_redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            warn!(location, "Refusing to emit redirect with invalid Location header");
            AppError::Internal { message: "Invalid redirect target".to_string() }.into_response()
        }
    }
}
