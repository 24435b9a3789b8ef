//! Bearer credential taken from an inbound `Authorization` header.

use std::fmt;

/// Opaque bearer token, forwarded verbatim to the upstream API.
///
/// `Debug` and `Display` only ever show a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredential(String);

impl AuthCredential {
    /// Parse an `Authorization` header value of the form `Bearer <token>`.
    ///
    /// The scheme is matched case-insensitively. Returns None for any other
    /// scheme or an empty token.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let token = token.trim();
        if token.is_empty() { None } else { Some(Self(token.to_string())) }
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}***")
    }
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthCredential").field(&self.redacted()).finish()
    }
}

impl fmt::Display for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
