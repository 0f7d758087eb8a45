//! Error types for reference parsing.

use thiserror::Error;

/// Maximum accepted length for a raw reference line.
/// Anything longer is almost certainly pasted garbage, not a catalog reference.
pub const MAX_REFERENCE_LENGTH: usize = 2000;

/// Maximum accepted length for an item identifier.
pub const MAX_IDENTIFIER_LENGTH: usize = 100;

/// Errors that can occur while normalizing a raw reference.
///
/// Every variant is produced before any network call is made.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The input looks like a URL but its host is not the catalog.
    ///
    /// Covers spoofed hosts where the catalog domain appears only as a
    /// substring (`archive.org.evil.com`, `evilarchive.org`).
    #[error("host '{host}' is not the catalog: {raw}\n  Suggestion: {suggestion}")]
    ForeignHost {
        /// The raw input that was rejected.
        raw: String,
        /// The host component that failed validation.
        host: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// A catalog URL whose path does not lead to an item identifier.
    #[error("no item identifier in URL: {raw}\n  Suggestion: {suggestion}")]
    MissingIdentifier {
        /// The raw input that was rejected.
        raw: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// A bare identifier candidate containing characters outside the
    /// identifier character set.
    #[error("invalid identifier '{candidate}': {reason}\n  Suggestion: {suggestion}")]
    InvalidIdentifier {
        /// The candidate identifier.
        candidate: String,
        /// Why it is invalid.
        reason: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// Input exceeds the maximum accepted reference length.
    #[error("reference too long ({length} chars, max {max}): {preview}...")]
    TooLong {
        /// Truncated input for display.
        preview: String,
        /// Actual length.
        length: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl ParseError {
    /// Creates a `ForeignHost` error.
    #[must_use]
    pub fn foreign_host(raw: &str, host: &str) -> Self {
        Self::ForeignHost {
            raw: raw.to_string(),
            host: host.to_string(),
            suggestion: "Use an archive.org URL or a bare item identifier".to_string(),
        }
    }

    /// Creates a `MissingIdentifier` error.
    #[must_use]
    pub fn missing_identifier(raw: &str) -> Self {
        Self::MissingIdentifier {
            raw: raw.to_string(),
            suggestion: "Use a details URL like https://archive.org/details/<identifier>"
                .to_string(),
        }
    }

    /// Creates an `InvalidIdentifier` error.
    #[must_use]
    pub fn invalid_identifier(candidate: &str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            candidate: candidate.chars().take(80).collect(),
            reason: reason.into(),
            suggestion: "Identifiers use letters, digits, '_', '-' and '.'".to_string(),
        }
    }

    /// Creates a `TooLong` error.
    #[must_use]
    pub fn too_long(raw: &str) -> Self {
        Self::TooLong {
            preview: raw.chars().take(50).collect(),
            length: raw.len(),
            max: MAX_REFERENCE_LENGTH,
        }
    }
}
