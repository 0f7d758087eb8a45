//! Types representing normalized references and batch parse results.

use std::fmt;

use super::error::ParseError;

/// Where a reference came from, textually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A catalog URL (scheme-qualified or scheme-less)
    Url,
    /// A bare item identifier
    BareId,
    /// A value taken from a CSV cell
    CsvCell,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => write!(f, "URL"),
            Self::BareId => write!(f, "identifier"),
            Self::CsvCell => write!(f, "CSV cell"),
        }
    }
}

/// A single normalized reference to a catalog item.
///
/// Duplicates are not merged: two lines naming the same item produce two
/// references, each processed independently.
#[derive(Debug, Clone)]
pub struct ItemReference {
    /// Original input text (trimmed line or cell value)
    pub raw: String,
    /// Canonical item identifier
    pub item_id: String,
    /// Textual shape of the input
    pub source: SourceKind,
}

impl ItemReference {
    /// Creates a new reference.
    #[must_use]
    pub fn new(raw: impl Into<String>, item_id: impl Into<String>, source: SourceKind) -> Self {
        Self {
            raw: raw.into(),
            item_id: item_id.into(),
            source,
        }
    }
}

impl fmt::Display for ItemReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.item_id)
    }
}

/// A line or cell that was rejected, with the reason.
#[derive(Debug, Clone)]
pub struct RejectedLine {
    /// Original input text
    pub raw: String,
    /// Why normalization failed
    pub error: ParseError,
}

/// Result of parsing a batch of lines or cells.
///
/// Rejections are collected, not raised: a bad line never stops the
/// surrounding lines from being processed.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Successfully normalized references, in input order
    pub items: Vec<ItemReference>,
    /// Lines that failed normalization, in input order
    pub rejected: Vec<RejectedLine>,
    /// Count of blank and comment lines that were skipped
    pub skipped: usize,
}

impl ParseResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a normalized reference.
    pub fn add_item(&mut self, item: ItemReference) {
        self.items.push(item);
    }

    /// Adds a rejected line.
    pub fn add_rejected(&mut self, raw: impl Into<String>, error: ParseError) {
        self.rejected.push(RejectedLine {
            raw: raw.into(),
            error,
        });
    }

    /// Records a skipped blank/comment line.
    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Returns true if no references were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the count of parsed references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns the count of rejected lines.
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parsed {} references ({} rejected, {} skipped)",
            self.items.len(),
            self.rejected.len(),
            self.skipped
        )
    }
}
