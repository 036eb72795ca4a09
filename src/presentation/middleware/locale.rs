//! Locale resolution and routing.
//!
//! Every path handed to page rendering starts with a supported locale. Paths
//! without one are redirected to their localized form; the locale cookie is
//! kept in step with the locale being served.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum_extra::headers::{Cookie, HeaderMapExt};
use tracing::debug;

use super::canonical::{query_suffix, CanonicalHost, Protocol};
use crate::domain::value_objects::{Locale, LocaleDecision, LocaleSource, SupportedLocales};

/// Forwarded request header carrying the served locale
pub const LOCALE_HEADER: HeaderName = HeaderName::from_static("x-locale");

/// One year
const LOCALE_COOKIE_MAX_AGE_SECS: u64 = 31_536_000;

/// Pick the locale for a request: a supported cookie value wins, then
/// `Accept-Language` negotiation, then the default.
pub fn resolve_locale(
    locales: &SupportedLocales,
    cookie: Option<&str>,
    accept_language: Option<&str>,
) -> LocaleDecision {
    if let Some(locale) = cookie.and_then(|value| locales.find(value)) {
        return LocaleDecision { locale: locale.clone(), source: LocaleSource::Cookie };
    }

    match locales.negotiate(accept_language) {
        Ok(locale) => LocaleDecision { locale: locale.clone(), source: LocaleSource::Negotiated },
        Err(e) => {
            debug!(error = %e, "Locale negotiation failed, using default locale");
            LocaleDecision {
                locale: locales.default_locale().clone(),
                source: LocaleSource::Default,
            }
        }
    }
}

/// `Set-Cookie` value persisting the locale preference
pub fn locale_cookie_header(name: &str, locale: &Locale, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{name}={}; Path=/; Max-Age={LOCALE_COOKIE_MAX_AGE_SECS}; SameSite=Lax",
        locale.as_str()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// The parts of a request the locale router looks at
#[derive(Debug, Clone, Copy)]
pub struct LocaleRequest<'a> {
    pub host: Option<&'a CanonicalHost>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub protocol: Protocol,
    pub https_enforced: bool,
    pub stored_locale: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub enum LocaleRoute {
    /// Answer with a 301 to `location`
    Redirect { location: String, locale: Locale, set_cookie: Option<HeaderValue> },
    /// Hand the request to page rendering
    PassThrough { locale: Locale, set_cookie: Option<HeaderValue> },
}

impl LocaleRoute {
    pub fn locale(&self) -> &Locale {
        match self {
            LocaleRoute::Redirect { locale, .. } | LocaleRoute::PassThrough { locale, .. } => {
                locale
            }
        }
    }

    pub fn set_cookie(&self) -> Option<&HeaderValue> {
        match self {
            LocaleRoute::Redirect { set_cookie, .. }
            | LocaleRoute::PassThrough { set_cookie, .. } => set_cookie.as_ref(),
        }
    }
}

/// Routes requests onto locale-prefixed paths
#[derive(Debug, Clone)]
pub struct LocaleRouter {
    locales: SupportedLocales,
    cookie_name: String,
}

impl LocaleRouter {
    pub fn new(locales: SupportedLocales, cookie_name: impl Into<String>) -> Self {
        Self { locales, cookie_name: cookie_name.into() }
    }

    pub fn locales(&self) -> &SupportedLocales {
        &self.locales
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Raw value of the locale cookie, supported or not
    pub fn stored_locale(&self, headers: &HeaderMap) -> Option<String> {
        headers.typed_get::<Cookie>()?.get(&self.cookie_name).map(str::to_string)
    }

    pub fn route(&self, request: &LocaleRequest<'_>) -> LocaleRoute {
        let upgrade_host = request
            .host
            .filter(|_| request.https_enforced && request.protocol == Protocol::Http);
        let query = query_suffix(request.query);

        if let Some(locale) = self.locales.locale_in_path(request.path) {
            let set_cookie = self.sync_cookie(request, locale);

            return match upgrade_host {
                Some(host) => LocaleRoute::Redirect {
                    location: format!("https://{}{}{query}", host.authority(), request.path),
                    locale: locale.clone(),
                    set_cookie,
                },
                None => LocaleRoute::PassThrough { locale: locale.clone(), set_cookie },
            };
        }

        let decision =
            resolve_locale(&self.locales, request.stored_locale, request.accept_language);
        debug!(
            locale = %decision.locale,
            source = decision.source.as_str(),
            path = request.path,
            "Redirecting to localized path"
        );

        let localized = if request.path == "/" || request.path.is_empty() {
            format!("/{}", decision.locale)
        } else {
            format!("/{}{}", decision.locale, request.path)
        };

        let location = match upgrade_host {
            Some(host) => format!("https://{}{localized}{query}", host.authority()),
            None => format!("{localized}{query}"),
        };

        let set_cookie = self.sync_cookie(request, &decision.locale);
        LocaleRoute::Redirect { location, locale: decision.locale, set_cookie }
    }

    fn sync_cookie(&self, request: &LocaleRequest<'_>, locale: &Locale) -> Option<HeaderValue> {
        if request.stored_locale == Some(locale.as_str()) {
            return None;
        }
        locale_cookie_header(&self.cookie_name, locale, request.https_enforced)
    }
}
