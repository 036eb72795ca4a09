use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

use crate::infrastructure::config::{CspConfig, EdgeConfig};

/// Forwarded request header carrying the CSP nonce to server-side rendering
pub const NONCE_HEADER: HeaderName = HeaderName::from_static("x-nonce");

/// Security header policy shared by every request
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    /// HSTS max age in seconds
    pub hsts_max_age: u64,
    pub hsts_include_subdomains: bool,
    pub hsts_preload: bool,
    pub frame_options: FrameOptions,
    pub referrer_policy: ReferrerPolicy,
    /// Third-party hosts allowed to serve scripts
    pub script_hosts: Vec<String>,
    /// Third-party hosts allowed to serve images
    pub image_hosts: Vec<String>,
    /// Analytics endpoints scripts may connect to
    pub connect_hosts: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            hsts_max_age: 63_072_000, // 2 years
            hsts_include_subdomains: true,
            hsts_preload: true,
            frame_options: FrameOptions::Deny,
            referrer_policy: ReferrerPolicy::StrictOriginWhenCrossOrigin,
            script_hosts: Vec::new(),
            image_hosts: Vec::new(),
            connect_hosts: Vec::new(),
        }
    }
}

impl SecurityPolicy {
    pub fn from_config(config: &EdgeConfig) -> Self {
        let CspConfig { script_hosts, image_hosts, connect_hosts } = config.csp.clone();
        Self {
            hsts_max_age: config.hsts_max_age_secs,
            script_hosts,
            image_hosts,
            connect_hosts,
            ..Self::default()
        }
    }
}

/// X-Frame-Options values
#[derive(Debug, Clone, Copy)]
pub enum FrameOptions {
    Deny,
    SameOrigin,
}

impl FrameOptions {
    fn to_header_value(self) -> HeaderValue {
        match self {
            FrameOptions::Deny => HeaderValue::from_static("DENY"),
            FrameOptions::SameOrigin => HeaderValue::from_static("SAMEORIGIN"),
        }
    }
}

/// Referrer-Policy values
#[derive(Debug, Clone, Copy)]
pub enum ReferrerPolicy {
    NoReferrer,
    SameOrigin,
    StrictOrigin,
    StrictOriginWhenCrossOrigin,
}

impl ReferrerPolicy {
    fn to_header_value(self) -> HeaderValue {
        let value = match self {
            ReferrerPolicy::NoReferrer => "no-referrer",
            ReferrerPolicy::SameOrigin => "same-origin",
            ReferrerPolicy::StrictOrigin => "strict-origin",
            ReferrerPolicy::StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
        };
        HeaderValue::from_static(value)
    }
}

/// Per-request CSP nonce: 128 bits from the thread-local CSPRNG, base64 encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Build the Content-Security-Policy for one request
pub fn build_csp(policy: &SecurityPolicy, nonce: &Nonce, https_enforced: bool) -> String {
    let with_hosts = |base: &str, hosts: &[String]| {
        let mut directive = base.to_string();
        for host in hosts {
            directive.push(' ');
            directive.push_str(host);
        }
        directive
    };

    let mut directives = vec![
        "default-src 'self'".to_string(),
        with_hosts(
            &format!("script-src 'self' 'nonce-{}' 'strict-dynamic'", nonce.as_str()),
            &policy.script_hosts,
        ),
        "style-src 'self' 'unsafe-inline'".to_string(),
        with_hosts("img-src 'self' data: blob:", &policy.image_hosts),
        "font-src 'self' data:".to_string(),
        with_hosts("connect-src 'self'", &policy.connect_hosts),
        "object-src 'none'".to_string(),
        "frame-ancestors 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self'".to_string(),
    ];

    if https_enforced {
        directives.push("upgrade-insecure-requests".to_string());
    }

    directives.join("; ")
}

/// Canonical URL advertised through the `Link` header
pub fn canonical_url(origin: &str, path: &str) -> String {
    format!("{}{path}", origin.trim_end_matches('/'))
}

/// Security artifacts computed once per request
#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub nonce: Nonce,
    pub csp_policy: String,
    pub https_enforced: bool,
    hsts: Option<String>,
    frame_options: FrameOptions,
    referrer_policy: ReferrerPolicy,
    canonical_url: Option<String>,
}

impl SecurityContext {
    pub fn build(
        policy: &SecurityPolicy,
        https_enforced: bool,
        canonical_url: Option<String>,
    ) -> Self {
        let nonce = Nonce::generate();
        let csp_policy = build_csp(policy, &nonce, https_enforced);

        let hsts = https_enforced.then(|| {
            let mut value = format!("max-age={}", policy.hsts_max_age);
            if policy.hsts_include_subdomains {
                value.push_str("; includeSubDomains");
            }
            if policy.hsts_preload {
                value.push_str("; preload");
            }
            value
        });

        Self {
            nonce,
            csp_policy,
            https_enforced,
            hsts,
            frame_options: policy.frame_options,
            referrer_policy: policy.referrer_policy,
            canonical_url,
        }
    }

    /// Attach the security headers to an outgoing response
    pub fn apply_response_headers(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.csp_policy) {
            headers.insert(header::CONTENT_SECURITY_POLICY, value);
        }

        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(header::X_FRAME_OPTIONS, self.frame_options.to_header_value());
        headers.insert(header::REFERRER_POLICY, self.referrer_policy.to_header_value());
        headers.insert("cross-origin-opener-policy", HeaderValue::from_static("same-origin"));

        if let Some(url) = &self.canonical_url {
            if let Ok(value) = HeaderValue::from_str(&format!("<{url}>; rel=\"canonical\"")) {
                headers.insert(header::LINK, value);
            }
        }

        if let Some(hsts) = &self.hsts {
            if let Ok(value) = HeaderValue::from_str(hsts) {
                headers.insert(header::STRICT_TRANSPORT_SECURITY, value);
            }
        }
    }

    /// Attach the nonce to the request headers seen by downstream rendering
    pub fn apply_forwarded_headers(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(self.nonce.as_str()) {
            headers.insert(NONCE_HEADER, value);
        }
    }
}
