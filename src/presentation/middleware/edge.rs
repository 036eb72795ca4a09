//! The edge request pipeline.
//!
//! Runs, in order: host/protocol canonicalization, security context, rate
//! limiting, request logging, locale routing. Any stage may answer the request
//! itself; otherwise the request is forwarded with the nonce, request id and
//! locale attached, and the response picks up the security headers.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::debug;

use super::{
    canonical::{
        canonicalize, effective_protocol, https_enforced, permanent_redirect, CanonicalDecision,
        CanonicalHost, CanonicalRequest, Protocol,
    },
    error::AppError,
    locale::{LocaleRequest, LocaleRoute, LocaleRouter, LOCALE_HEADER},
    logging::{log_request, RequestLogRecord, RequestLogSink, RequestLoggingConfig},
    rate_limit::{
        extract_client_identity, FixedWindowRateLimiter, RateLimitConfig, RateLimitDecision,
    },
    request_id::{request_id_header_value, resolve_request_id, REQUEST_ID_HEADER},
    security::{canonical_url, SecurityContext, SecurityPolicy},
};
use crate::{
    domain::{entities::Session, providers::SessionProvider},
    infrastructure::config::{AppConfig, ConfigError},
};

/// Paths served without the pipeline: APIs, build assets, optimized images
const EXCLUDED_PREFIXES: [&str; 3] = ["/api", "/_static", "/_image"];

/// Whether the pipeline applies to `path`
pub fn in_edge_scope(path: &str) -> bool {
    if path == "/favicon.ico" {
        return false;
    }

    let excluded = EXCLUDED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    });
    if excluded {
        return false;
    }

    // Static files: last segment has an extension
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    !last_segment.contains('.')
}

/// Deployment flags shared by every request
#[derive(Debug)]
struct EdgeSettings {
    is_production: bool,
    is_local_host: bool,
    public_origin: Option<String>,
    security: SecurityPolicy,
    logging: RequestLoggingConfig,
}

/// Result of running the pipeline over a request head
#[derive(Debug)]
pub enum EdgeOutcome {
    /// A stage answered the request
    Respond(Response),
    /// Forward downstream with extra request headers; decorate the response
    Forward { request_headers: HeaderMap, response_headers: HeaderMap },
}

#[derive(Clone)]
pub struct EdgePipeline {
    settings: Arc<EdgeSettings>,
    locale_router: Arc<LocaleRouter>,
    limiter: FixedWindowRateLimiter,
    sessions: Arc<dyn SessionProvider>,
    log_sink: Arc<dyn RequestLogSink>,
}

impl EdgePipeline {
    /// Build the pipeline from validated configuration
    pub fn from_config(
        config: &AppConfig,
        sessions: Arc<dyn SessionProvider>,
        log_sink: Arc<dyn RequestLogSink>,
    ) -> Result<Self, ConfigError> {
        let edge = &config.edge;
        let locale_router =
            LocaleRouter::new(edge.supported_locales()?, edge.locale_cookie_name.clone());

        Ok(Self {
            settings: Arc::new(EdgeSettings {
                is_production: edge.is_production,
                is_local_host: edge.is_local_host,
                public_origin: edge.public_origin.clone(),
                security: SecurityPolicy::from_config(edge),
                logging: RequestLoggingConfig::from_config(&config.logging),
            }),
            locale_router: Arc::new(locale_router),
            limiter: FixedWindowRateLimiter::new(RateLimitConfig::from_config(edge)),
            sessions,
            log_sink,
        })
    }

    pub fn limiter(&self) -> &FixedWindowRateLimiter {
        &self.limiter
    }

    pub fn locale_router(&self) -> &LocaleRouter {
        &self.locale_router
    }

    /// Run every stage over the request head
    pub async fn process(&self, parts: &Parts, peer: Option<SocketAddr>) -> EdgeOutcome {
        let headers = &parts.headers;
        let path = parts.uri.path();
        let query = parts.uri.query();
        let settings = &self.settings;

        let request_id = resolve_request_id(headers);
        let request_id_value = request_id_header_value(&request_id);

        let host = CanonicalHost::from_request(headers, &parts.uri);
        let protocol = effective_protocol(headers, &parts.uri);
        let enforced =
            https_enforced(settings.is_production, settings.is_local_host, host.as_ref());

        // Stage 1: host and protocol
        let canonical_request = CanonicalRequest { host: host.as_ref(), path, query, protocol };
        if let CanonicalDecision::Redirect { location } =
            canonicalize(&canonical_request, enforced)
        {
            debug!(request_id = %request_id, location = %location, "Canonical host redirect");
            let mut response = permanent_redirect(&location);
            response.headers_mut().insert(REQUEST_ID_HEADER, request_id_value);
            return EdgeOutcome::Respond(response);
        }

        // Stage 2: security context
        let security = SecurityContext::build(
            &settings.security,
            enforced,
            self.canonical_url(host.as_ref(), protocol, enforced, path),
        );
        let mut response_headers = HeaderMap::new();
        security.apply_response_headers(&mut response_headers);
        response_headers.insert(REQUEST_ID_HEADER, request_id_value.clone());

        let session = self.session(headers, &request_id).await;

        // Stage 3: rate limit
        let client = extract_client_identity(headers, peer);
        if let RateLimitDecision::Rejected { count, retry_after } = self.limiter.check(&client) {
            debug!(request_id = %request_id, client = %client, count, "Rate limit exceeded");
            let mut response =
                AppError::RateLimited { retry_after_secs: retry_after.as_secs() }.into_response();
            response.headers_mut().extend(response_headers);
            return EdgeOutcome::Respond(response);
        }

        // Stage 4: request log
        let record = RequestLogRecord::new(
            &settings.logging,
            &request_id,
            &parts.method,
            path,
            headers,
            &client,
            session.as_ref(),
        );
        log_request(self.log_sink.as_ref(), &record);

        // Stage 5: locale
        let stored_locale = self.locale_router.stored_locale(headers);
        let accept_language = headers.get(header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());
        let route = self.locale_router.route(&LocaleRequest {
            host: host.as_ref(),
            path,
            query,
            protocol,
            https_enforced: enforced,
            stored_locale: stored_locale.as_deref(),
            accept_language,
        });

        if let Some(cookie) = route.set_cookie() {
            response_headers.append(header::SET_COOKIE, cookie.clone());
        }

        match route {
            LocaleRoute::Redirect { location, .. } => {
                let mut response = permanent_redirect(&location);
                response.headers_mut().extend(response_headers);
                EdgeOutcome::Respond(response)
            }
            LocaleRoute::PassThrough { locale, .. } => {
                let mut request_headers = HeaderMap::new();
                security.apply_forwarded_headers(&mut request_headers);
                request_headers.insert(REQUEST_ID_HEADER, request_id_value);
                if let Ok(value) = HeaderValue::from_str(locale.as_str()) {
                    request_headers.insert(LOCALE_HEADER, value);
                }
                EdgeOutcome::Forward { request_headers, response_headers }
            }
        }
    }

    /// Session lookup for log attribution; failures count as anonymous
    async fn session(&self, headers: &HeaderMap, request_id: &str) -> Option<Session> {
        match self.sessions.session(headers).await {
            Ok(session) => session,
            Err(e) => {
                debug!(request_id, error = %e, "Session lookup failed");
                None
            }
        }
    }

    fn canonical_url(
        &self,
        host: Option<&CanonicalHost>,
        protocol: Protocol,
        enforced: bool,
        path: &str,
    ) -> Option<String> {
        if let Some(origin) = &self.settings.public_origin {
            return Some(canonical_url(origin, path));
        }

        let host = host?;
        let scheme = if enforced { Protocol::Https } else { protocol };
        Some(canonical_url(&format!("{}://{}", scheme.as_str(), host.canonical_authority()), path))
    }
}

/// Axum middleware running the pipeline in front of page rendering
pub async fn edge_middleware(
    State(pipeline): State<EdgePipeline>,
    request: Request,
    next: Next,
) -> Response {
    if !in_edge_scope(request.uri().path()) {
        return next.run(request).await;
    }

    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| *addr);
    let (mut parts, body) = request.into_parts();

    match pipeline.process(&parts, peer).await {
        EdgeOutcome::Respond(response) => response,
        EdgeOutcome::Forward { request_headers, response_headers } => {
            parts.headers.extend(request_headers);
            let mut response = next.run(Request::from_parts(parts, body)).await;

            let headers = response.headers_mut();
            for (name, value) in &response_headers {
                if name == header::SET_COOKIE {
                    headers.append(name, value.clone());
                } else {
                    headers.insert(name, value.clone());
                }
            }
            response
        }
    }
}
