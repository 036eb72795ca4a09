use serde::{Deserialize, Serialize};
use std::fmt;

use super::language_range::{parse_accept_language, LanguageRange};

/// A supported UI locale code such as `en` or `pt-BR`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    /// Create a locale from a BCP 47 style code
    ///
    /// # Errors
    /// Returns an error if the code is empty or contains characters that are
    /// not valid in a language tag
    pub fn new(code: &str) -> Result<Self, LocaleError> {
        let valid = !code.is_empty()
            && code.split('-').all(|subtag| {
                (1..=8).contains(&subtag.len()) && subtag.chars().all(|c| c.is_ascii_alphanumeric())
            });

        if valid {
            Ok(Self(code.to_string()))
        } else {
            Err(LocaleError::InvalidCode(code.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Where the resolved locale came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleSource {
    Cookie,
    Negotiated,
    Default,
}

impl LocaleSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Negotiated => "negotiated",
            Self::Default => "default",
        }
    }
}

/// Locale chosen for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleDecision {
    pub locale: Locale,
    pub source: LocaleSource,
}

/// Ordered set of locales the application serves, with one default
#[derive(Debug, Clone)]
pub struct SupportedLocales {
    locales: Vec<Locale>,
    default: Locale,
}

impl SupportedLocales {
    /// Build the locale table
    ///
    /// # Errors
    /// Returns an error if the set is empty, contains duplicates or invalid
    /// codes, or does not contain the default
    pub fn new<S: AsRef<str>>(codes: &[S], default: &str) -> Result<Self, LocaleError> {
        if codes.is_empty() {
            return Err(LocaleError::EmptyLocaleSet);
        }

        let mut locales: Vec<Locale> = Vec::with_capacity(codes.len());
        for code in codes {
            let locale = Locale::new(code.as_ref().trim())?;
            if locales.iter().any(|l| l.as_str().eq_ignore_ascii_case(locale.as_str())) {
                return Err(LocaleError::DuplicateLocale(locale.0));
            }
            locales.push(locale);
        }

        let default = locales
            .iter()
            .find(|l| l.as_str() == default)
            .cloned()
            .ok_or_else(|| LocaleError::DefaultNotSupported(default.to_string()))?;

        Ok(Self { locales, default })
    }

    #[must_use]
    pub fn default_locale(&self) -> &Locale {
        &self.default
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locale> {
        self.locales.iter()
    }

    /// Exact match against a supported code
    #[must_use]
    pub fn find(&self, code: &str) -> Option<&Locale> {
        self.locales.iter().find(|l| l.as_str() == code)
    }

    /// Locale prefix of a path: `/{locale}` or `/{locale}/...`
    #[must_use]
    pub fn locale_in_path(&self, path: &str) -> Option<&Locale> {
        let rest = path.strip_prefix('/')?;
        self.locales.iter().find(|locale| {
            rest.strip_prefix(locale.as_str())
                .is_some_and(|tail| tail.is_empty() || tail.starts_with('/'))
        })
    }

    /// RFC 4647 lookup: each range in preference order is progressively
    /// truncated until it equals a supported locale.
    #[must_use]
    pub fn lookup(&self, ranges: &[LanguageRange]) -> Option<&Locale> {
        for range in ranges.iter().filter(|r| !r.is_wildcard()) {
            let mut candidate = range.tag();
            loop {
                if let Some(locale) =
                    self.locales.iter().find(|l| l.as_str().eq_ignore_ascii_case(candidate))
                {
                    return Some(locale);
                }
                match truncate_tag(candidate) {
                    Some(shorter) => candidate = shorter,
                    None => break,
                }
            }
        }
        None
    }

    /// Negotiate a locale from an `Accept-Language` header
    ///
    /// # Errors
    /// Returns an error if the header is absent or malformed, or if nothing in
    /// it matches a supported locale
    pub fn negotiate(&self, accept_language: Option<&str>) -> Result<&Locale, LocaleError> {
        let header = accept_language.ok_or(LocaleError::NoMatch)?;
        let ranges = parse_accept_language(header)?;
        self.lookup(&ranges).ok_or(LocaleError::NoMatch)
    }
}

/// Drop the last subtag, along with a singleton left dangling before it
fn truncate_tag(tag: &str) -> Option<&str> {
    let (mut head, _) = tag.rsplit_once('-')?;
    if let Some((prefix, last)) = head.rsplit_once('-') {
        if last.len() == 1 {
            head = prefix;
        }
    }
    Some(head)
}

/// Errors raised while building the locale table or negotiating a locale
#[derive(Debug, thiserror::Error)]
pub enum LocaleError {
    #[error("Invalid locale code: {0}")]
    InvalidCode(String),
    #[error("At least one supported locale is required")]
    EmptyLocaleSet,
    #[error("Duplicate locale code: {0}")]
    DuplicateLocale(String),
    #[error("Default locale {0} is not in the supported set")]
    DefaultNotSupported(String),
    #[error("Malformed Accept-Language entry: {0}")]
    MalformedAcceptLanguage(String),
    #[error("No supported locale matches the request")]
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales() -> SupportedLocales {
        SupportedLocales::new(&["en", "ru", "uz", "pt-BR"], "en").unwrap()
    }

    #[test]
    fn test_locale_validation() {
        assert!(Locale::new("en").is_ok());
        assert!(Locale::new("pt-BR").is_ok());
        assert!(matches!(Locale::new(""), Err(LocaleError::InvalidCode(_))));
        assert!(Locale::new("en/us").is_err());
        assert!(Locale::new("en-").is_err());
    }

    #[test]
    fn test_supported_locales_rejects_missing_default() {
        let result = SupportedLocales::new(&["en", "ru"], "de");
        assert!(matches!(result, Err(LocaleError::DefaultNotSupported(code)) if code == "de"));
    }

    #[test]
    fn test_supported_locales_rejects_duplicates_and_empty() {
        assert!(matches!(
            SupportedLocales::new(&["en", "EN"], "en"),
            Err(LocaleError::DuplicateLocale(_))
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(SupportedLocales::new(&empty, "en"), Err(LocaleError::EmptyLocaleSet)));
    }

    #[test]
    fn test_locale_in_path() {
        let locales = locales();
        assert_eq!(locales.locale_in_path("/en").map(Locale::as_str), Some("en"));
        assert_eq!(locales.locale_in_path("/ru/lessons/3").map(Locale::as_str), Some("ru"));
        assert_eq!(locales.locale_in_path("/pt-BR/").map(Locale::as_str), Some("pt-BR"));
        assert!(locales.locale_in_path("/").is_none());
        assert!(locales.locale_in_path("/english").is_none());
        assert!(locales.locale_in_path("/de/lessons").is_none());
        assert!(locales.locale_in_path("en").is_none());
    }

    #[test]
    fn test_lookup_truncates_ranges() {
        let locales = locales();
        let negotiated = locales.negotiate(Some("en-GB;q=0.8, de;q=0.9")).unwrap();
        assert_eq!(negotiated.as_str(), "en");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let locales = locales();
        assert_eq!(locales.negotiate(Some("PT-br")).unwrap().as_str(), "pt-BR");
    }

    #[test]
    fn test_lookup_does_not_expand_ranges() {
        let locales = locales();
        assert!(matches!(locales.negotiate(Some("pt")), Err(LocaleError::NoMatch)));
    }

    #[test]
    fn test_lookup_respects_preference_order() {
        let locales = locales();
        assert_eq!(locales.negotiate(Some("uz, ru;q=0.9, en;q=0.1")).unwrap().as_str(), "uz");
    }

    #[test]
    fn test_negotiate_failures() {
        let locales = locales();
        assert!(matches!(locales.negotiate(None), Err(LocaleError::NoMatch)));
        assert!(matches!(locales.negotiate(Some("*")), Err(LocaleError::NoMatch)));
        assert!(matches!(
            locales.negotiate(Some("en;q=nope")),
            Err(LocaleError::MalformedAcceptLanguage(_))
        ));
    }

    #[test]
    fn test_truncate_tag_drops_singletons() {
        assert_eq!(truncate_tag("zh-hant-cn"), Some("zh-hant"));
        assert_eq!(truncate_tag("en-a-bbb"), Some("en"));
        assert_eq!(truncate_tag("en"), None);
    }
}
