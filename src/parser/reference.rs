//! Reference normalization: raw lines and cells to canonical item identifiers.
//!
//! A reference may arrive as a scheme-qualified catalog URL, a scheme-less
//! URL, a `www.`-prefixed host, or a bare item identifier. All four shapes
//! normalize to the same identifier. Host validation is by exact string
//! equality against a fixed allow-list - never a substring or prefix/suffix
//! check. Hosts like `archive.org.evil.com` or `evilarchive.org` embed the
//! catalog domain as a substring and must be rejected.

use tracing::{debug, trace};
use url::Url;

use super::error::{MAX_IDENTIFIER_LENGTH, MAX_REFERENCE_LENGTH, ParseError};
use super::input::{ItemReference, SourceKind};

/// Hosts accepted as the catalog, compared by exact equality after
/// lowercasing. The bare domain and its `www.` subdomain.
pub const CATALOG_HOSTS: [&str; 2] = ["archive.org", "www.archive.org"];

/// Path segments recognized as collection paths; the item identifier is the
/// segment that follows.
const COLLECTION_PATHS: [&str; 4] = ["details", "download", "stream", "metadata"];

/// Outcome of normalizing one raw line or cell.
#[derive(Debug, Clone)]
pub enum Normalized {
    /// A usable reference.
    Reference(ItemReference),
    /// Blank line or `#` comment - not an error, produces nothing.
    Skip,
}

/// Normalizes one raw line into an [`ItemReference`] or a skip.
///
/// # Errors
///
/// Returns [`ParseError`] when the line is neither blank/comment nor a
/// valid catalog reference: foreign or spoofed hosts, URLs without an
/// identifier, and malformed bare identifiers.
///
/// # Examples
///
/// ```
/// use ia_batch_core::parser::{Normalized, normalize};
///
/// let n = normalize("https://archive.org/details/book1").unwrap();
/// let Normalized::Reference(r) = n else { panic!() };
/// assert_eq!(r.item_id, "book1");
///
/// assert!(matches!(normalize("# comment"), Ok(Normalized::Skip)));
/// assert!(normalize("https://archive.org.evil.com/details/book1").is_err());
/// ```
#[tracing::instrument(skip(raw), fields(raw_len = raw.len()))]
pub fn normalize(raw: &str) -> Result<Normalized, ParseError> {
    normalize_with_kind(raw, None)
}

/// Normalizes a tabular cell value. Same shapes as [`normalize`], but the
/// resulting reference is tagged [`SourceKind::CsvCell`].
///
/// # Errors
///
/// Same conditions as [`normalize`].
pub fn normalize_cell(raw: &str) -> Result<Normalized, ParseError> {
    normalize_with_kind(raw, Some(SourceKind::CsvCell))
}

fn normalize_with_kind(
    raw: &str,
    override_kind: Option<SourceKind>,
) -> Result<Normalized, ParseError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() || trimmed.starts_with('#') {
        trace!("skipping blank or comment line");
        return Ok(Normalized::Skip);
    }

    if trimmed.len() > MAX_REFERENCE_LENGTH {
        return Err(ParseError::too_long(trimmed));
    }

    let (item_id, detected) = if trimmed.contains("://") {
        (identifier_from_url(trimmed)?, SourceKind::Url)
    } else if trimmed.contains('/') {
        (identifier_from_schemeless(trimmed)?, SourceKind::Url)
    } else {
        (
            validate_identifier(trimmed).map(str::to_string)?,
            SourceKind::BareId,
        )
    };

    let kind = override_kind.unwrap_or(detected);
    debug!(item_id = %item_id, source = %kind, "normalized reference");
    Ok(Normalized::Reference(ItemReference::new(
        trimmed, item_id, kind,
    )))
}

/// Extracts the identifier from a scheme-qualified URL.
fn identifier_from_url(raw: &str) -> Result<String, ParseError> {
    let parsed = Url::parse(raw).map_err(|_| ParseError::missing_identifier(raw))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| ParseError::missing_identifier(raw))?
        .to_lowercase();
    require_catalog_host(raw, &host)?;

    identifier_from_path(raw, parsed.path())
}

/// Extracts the identifier from a scheme-less URL (`archive.org/details/x`,
/// optionally `www.`-prefixed).
fn identifier_from_schemeless(raw: &str) -> Result<String, ParseError> {
    let (host_part, path) = raw.split_once('/').unwrap_or((raw, ""));
    // Drop an optional port; host comparison is on the name alone.
    let host = host_part
        .split(':')
        .next()
        .unwrap_or(host_part)
        .to_lowercase();
    require_catalog_host(raw, &host)?;

    identifier_from_path(raw, path)
}

/// Accepts exactly the allow-listed hosts. Equality, not containment:
/// rejecting `archive.org.evil.com` and `evilarchive.org` is the point.
fn require_catalog_host(raw: &str, host: &str) -> Result<(), ParseError> {
    if CATALOG_HOSTS.contains(&host) {
        Ok(())
    } else {
        Err(ParseError::foreign_host(raw, host))
    }
}

/// Finds the identifier as the segment after a recognized collection path.
fn identifier_from_path(raw: &str, path: &str) -> Result<String, ParseError> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());

    let Some(collection) = segments.next() else {
        return Err(ParseError::missing_identifier(raw));
    };
    if !COLLECTION_PATHS.contains(&collection.to_lowercase().as_str()) {
        return Err(ParseError::missing_identifier(raw));
    }

    let Some(candidate) = segments.next() else {
        return Err(ParseError::missing_identifier(raw));
    };
    validate_identifier(candidate).map(str::to_string)
}

/// Validates a bare identifier candidate against the identifier character
/// set: alphanumeric plus `_`, `-`, `.`, starting alphanumeric.
fn validate_identifier(candidate: &str) -> Result<&str, ParseError> {
    if candidate.is_empty() {
        return Err(ParseError::invalid_identifier(candidate, "empty"));
    }
    if candidate.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ParseError::invalid_identifier(
            candidate,
            format!("longer than {MAX_IDENTIFIER_LENGTH} characters"),
        ));
    }
    let first = candidate.chars().next().unwrap_or('.');
    if !first.is_ascii_alphanumeric() {
        return Err(ParseError::invalid_identifier(
            candidate,
            format!("must start with a letter or digit, found '{first}'"),
        ));
    }
    if let Some(bad) = candidate
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '-' | '.'))
    {
        return Err(ParseError::invalid_identifier(
            candidate,
            format!("contains '{bad}'"),
        ));
    }
    Ok(candidate)
}
