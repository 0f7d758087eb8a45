//! Reference parsing: raw text lines and CSV cells into catalog item
//! references.
//!
//! Accepted shapes for a single reference:
//!
//! - `https://archive.org/details/<id>` (scheme-qualified URL)
//! - `archive.org/details/<id>` (scheme-less)
//! - `www.archive.org/details/<id>` (`www.` subdomain, with or without scheme)
//! - `<id>` (bare identifier)
//!
//! Blank lines and `#` comments are skipped. Anything else that fails
//! validation is collected as a rejection; one bad line never aborts a
//! batch.
//!
//! # Example
//!
//! ```
//! use ia_batch_core::parser::parse_input;
//!
//! let result = parse_input("# note\nhttps://archive.org/details/book1\nbook2\n");
//! assert_eq!(result.len(), 2);
//! assert_eq!(result.items[0].item_id, "book1");
//! assert_eq!(result.items[1].item_id, "book2");
//! ```

mod error;
mod input;
mod reference;

pub use error::{MAX_IDENTIFIER_LENGTH, MAX_REFERENCE_LENGTH, ParseError};
pub use input::{ItemReference, ParseResult, RejectedLine, SourceKind};
pub use reference::{CATALOG_HOSTS, Normalized, normalize, normalize_cell};

use tracing::debug;

/// Parses multi-line text input, one reference per line.
///
/// Each line is normalized independently and in order. Duplicate
/// identifiers are preserved, not merged.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn parse_input(input: &str) -> ParseResult {
    let mut result = ParseResult::new();

    for line in input.lines() {
        match normalize(line) {
            Ok(Normalized::Reference(item)) => result.add_item(item),
            Ok(Normalized::Skip) => result.add_skipped(),
            Err(error) => {
                debug!(line = %line.trim(), error = %error, "rejected input line");
                result.add_rejected(line.trim(), error);
            }
        }
    }

    result
}

/// Parses an iterator of tabular cell values.
///
/// Cells follow the same shapes as lines; references are tagged as coming
/// from CSV so the caller can report provenance.
#[must_use]
pub fn parse_cells<I, S>(cells: I) -> ParseResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = ParseResult::new();

    for cell in cells {
        match normalize_cell(cell.as_ref()) {
            Ok(Normalized::Reference(item)) => result.add_item(item),
            Ok(Normalized::Skip) => result.add_skipped(),
            Err(error) => {
                debug!(cell = %cell.as_ref().trim(), error = %error, "rejected cell");
                result.add_rejected(cell.as_ref().trim(), error);
            }
        }
    }

    result
}
