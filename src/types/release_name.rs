// ABOUTME: DNS-compatible release name validation.
// ABOUTME: Release names must be RFC 1123 labels short enough for Helm's 53-character limit.

use std::fmt;
use thiserror::Error;

/// Longest release name Helm accepts.
pub const MAX_RELEASE_NAME_LEN: usize = 53;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseNameError {
    #[error("release name cannot be empty")]
    Empty,

    #[error("release name exceeds maximum length of {MAX_RELEASE_NAME_LEN} characters")]
    TooLong,

    #[error("release name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("release name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("release name must be lowercase")]
    NotLowercase,

    #[error("invalid character in release name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseName(String);

impl ReleaseName {
    pub fn new(value: &str) -> Result<Self, ReleaseNameError> {
        if value.is_empty() {
            return Err(ReleaseNameError::Empty);
        }

        if value.len() > MAX_RELEASE_NAME_LEN {
            return Err(ReleaseNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(ReleaseNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(ReleaseNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ReleaseNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(ReleaseNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ReleaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_label() {
        let name = ReleaseName::new("edge-proxy-a").unwrap();
        assert_eq!(name.as_str(), "edge-proxy-a");
    }

    #[test]
    fn rejects_invalid_names() {
        assert_eq!(ReleaseName::new(""), Err(ReleaseNameError::Empty));
        assert_eq!(
            ReleaseName::new("-proxy"),
            Err(ReleaseNameError::StartsWithHyphen)
        );
        assert_eq!(
            ReleaseName::new("proxy-"),
            Err(ReleaseNameError::EndsWithHyphen)
        );
        assert_eq!(
            ReleaseName::new("Proxy"),
            Err(ReleaseNameError::NotLowercase)
        );
        assert_eq!(
            ReleaseName::new("edge_proxy"),
            Err(ReleaseNameError::InvalidChar('_'))
        );
    }

    #[test]
    fn rejects_names_over_helm_limit() {
        let long = "a".repeat(MAX_RELEASE_NAME_LEN + 1);
        assert_eq!(ReleaseName::new(&long), Err(ReleaseNameError::TooLong));
        assert!(ReleaseName::new(&"a".repeat(MAX_RELEASE_NAME_LEN)).is_ok());
    }
}
