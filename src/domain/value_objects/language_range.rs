use super::locale::LocaleError;

/// A single weighted entry of an `Accept-Language` header
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRange {
    tag: String,
    quality: f32,
}

impl LanguageRange {
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn quality(&self) -> f32 {
        self.quality
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.tag == "*"
    }
}

/// Parse an `Accept-Language` header into ranges ordered by preference.
///
/// Entries with `q=0` are dropped. Ties keep header order. Any entry with an
/// invalid tag or quality value rejects the whole header.
pub fn parse_accept_language(header: &str) -> Result<Vec<LanguageRange>, LocaleError> {
    let mut ranges = Vec::new();

    for item in header.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let mut pieces = item.split(';');
        let tag = pieces.next().unwrap_or_default().trim();
        if !is_valid_range(tag) {
            return Err(LocaleError::MalformedAcceptLanguage(item.to_string()));
        }

        let mut quality = 1.0_f32;
        for param in pieces.map(str::trim) {
            let Some((key, value)) = param.split_once('=') else {
                return Err(LocaleError::MalformedAcceptLanguage(item.to_string()));
            };
            if key.trim().eq_ignore_ascii_case("q") {
                quality = parse_quality(value.trim())
                    .ok_or_else(|| LocaleError::MalformedAcceptLanguage(item.to_string()))?;
            }
        }

        if quality > 0.0 {
            ranges.push(LanguageRange { tag: tag.to_ascii_lowercase(), quality });
        }
    }

    // sort_by is stable, so equal weights stay in header order
    ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    Ok(ranges)
}

fn parse_quality(value: &str) -> Option<f32> {
    if value.is_empty() || value.len() > 5 {
        return None;
    }
    let quality = value.parse::<f32>().ok()?;
    (0.0..=1.0).contains(&quality).then_some(quality)
}

fn is_valid_range(tag: &str) -> bool {
    if tag == "*" {
        return true;
    }
    let mut subtags = tag.split('-');
    let primary_ok = subtags
        .next()
        .is_some_and(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok
        && subtags.all(|s| {
            ((1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())) || s == "*"
        })
}
