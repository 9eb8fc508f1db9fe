//! Mount prefix matching.
//!
//! # Responsibilities
//! - Validate mount prefixes at registration time
//! - Test a request path against a prefix on segment boundaries
//!
//! # Design Decisions
//! - Prefix comparison is ASCII case-insensitive, like the host matcher
//! - A prefix only matches whole segments: `/app1` matches `/app1` and
//!   `/app1/x`, never `/app10`
//! - No regex, no allocation in the hot path

use thiserror::Error;

/// Reasons a mount prefix is rejected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("mount prefix must not be empty")]
    EmptyPrefix,

    #[error("mount prefix `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("mount prefix `{0}` must not end with `/`")]
    TrailingSeparator(String),

    #[error("mount prefix `{0}` contains an empty segment")]
    EmptySegment(String),

    #[error("mount prefix `{0}` must not contain a query or fragment")]
    InvalidCharacter(String),

    #[error("mount `{0}` is already registered")]
    DuplicateName(String),
}

/// A validated, segment-aligned path prefix such as `/app1` or `/tenants/a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    /// Validate and wrap a raw prefix.
    pub fn parse(raw: &str) -> Result<Self, MountError> {
        if raw.is_empty() {
            return Err(MountError::EmptyPrefix);
        }
        if !raw.starts_with('/') {
            return Err(MountError::MissingLeadingSlash(raw.to_string()));
        }
        if raw.ends_with('/') {
            return Err(MountError::TrailingSeparator(raw.to_string()));
        }
        if raw.contains("//") {
            return Err(MountError::EmptySegment(raw.to_string()));
        }
        if raw.contains(['?', '#']) {
            return Err(MountError::InvalidCharacter(raw.to_string()));
        }

        Ok(Self {
            prefix: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` starts with this prefix on a segment boundary.
    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }

    /// Strip the prefix from `path`.
    ///
    /// Returns the remainder, which is either empty (exact match) or begins
    /// with `/`. Returns `None` when the prefix does not cover whole segments.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let len = self.prefix.len();
        let head = path.as_bytes().get(..len)?;
        if !head.eq_ignore_ascii_case(self.prefix.as_bytes()) {
            return None;
        }

        // The byte after the prefix is ASCII `/` or absent, so `len` is a
        // char boundary whenever we slice.
        match path.as_bytes().get(len) {
            None => Some(""),
            Some(b'/') => Some(&path[len..]),
            Some(_) => None,
        }
    }
}

impl std::fmt::Display for PathPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.prefix)
    }
}
