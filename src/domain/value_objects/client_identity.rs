use std::fmt;

/// Sentinel identity for requests that carry no usable address
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiter key derived from a forwarded address or the connection peer.
///
/// The raw address string is kept as-is; IPv4-mapped IPv6 and other textual
/// variants of the same address are distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Build an identity from a raw address, falling back to the sentinel when blank
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() { Self::unknown() } else { Self(trimmed.to_string()) }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
