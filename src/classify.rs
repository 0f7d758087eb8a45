//! Format classification for remote catalog files.
//!
//! The catalog declares a free-form format label for every file in an item
//! ("DjVu Text", "Text PDF", "JPEG Thumb", ...). This module maps that
//! label, together with the file name, to a closed [`FormatClass`] so the
//! orchestrator never inlines string checks.
//!
//! A plain "Text" or "PDF" label with no searchable-text marker classifies
//! as [`FormatClass::Excluded`]. Skipping non-searchable artifacts is the
//! tool's stated purpose, so that is policy, not an omission.
//!
//! # Example
//!
//! ```
//! use ia_batch_core::classify::{FormatClass, classify};
//!
//! assert_eq!(classify("DjVu Text", "book_djvu.txt"), FormatClass::OcrText);
//! assert_eq!(classify("Text PDF", "book.pdf"), FormatClass::SearchablePdf);
//! assert_eq!(classify("PDF", "book.pdf"), FormatClass::Excluded);
//! ```

use std::fmt;

/// Semantic class of a remote file, derived from its declared format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FormatClass {
    /// OCR-derived plain text (searchable).
    OcrText,
    /// PDF with an embedded text layer (searchable).
    SearchablePdf,
    /// Everything else: images, archives, metadata, plain non-OCR text.
    Excluded,
}

impl fmt::Display for FormatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OcrText => write!(f, "OCR text"),
            Self::SearchablePdf => write!(f, "searchable PDF"),
            Self::Excluded => write!(f, "excluded"),
        }
    }
}

/// Which format classes a run should download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFilter {
    /// Only OCR text files.
    OcrTextOnly,
    /// Only searchable PDFs.
    SearchablePdfOnly,
    /// Both searchable classes.
    Both,
}

impl FormatFilter {
    /// Returns whether a classified file passes this filter.
    /// `Excluded` never passes, regardless of filter.
    #[must_use]
    pub fn matches(self, class: FormatClass) -> bool {
        match (self, class) {
            (_, FormatClass::Excluded) => false,
            (Self::Both, _) => true,
            (Self::OcrTextOnly, FormatClass::OcrText)
            | (Self::SearchablePdfOnly, FormatClass::SearchablePdf) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FormatFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OcrTextOnly => write!(f, "text"),
            Self::SearchablePdfOnly => write!(f, "pdf"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Declared-format labels (lowercased) that mark OCR-derived text.
const OCR_TEXT_LABELS: [&str; 4] = ["ocr search text", "djvu text", "djvutxt", "abbyy gz"];

/// File-name suffix the catalog uses for OCR text dumps.
const OCR_TEXT_SUFFIX: &str = "_djvu.txt";

/// Classifies a remote file from its declared format label and file name.
///
/// Pure and total: every input maps to exactly one class, unknown labels
/// map to [`FormatClass::Excluded`], never an error. Matching is
/// case-insensitive; first rule wins:
///
/// 1. OCR label, a label containing "ocr", or the `_djvu.txt` name suffix
///    → [`FormatClass::OcrText`]
/// 2. a label containing both "text" and "pdf" → [`FormatClass::SearchablePdf`]
/// 3. otherwise → [`FormatClass::Excluded`]
#[must_use]
pub fn classify(declared_format: &str, file_name: &str) -> FormatClass {
    let format = declared_format.to_lowercase();
    let name = file_name.to_lowercase();

    if OCR_TEXT_LABELS.iter().any(|label| format.contains(label))
        || format.contains("ocr")
        || name.ends_with(OCR_TEXT_SUFFIX)
    {
        return FormatClass::OcrText;
    }

    if format.contains("text") && format.contains("pdf") {
        return FormatClass::SearchablePdf;
    }

    FormatClass::Excluded
}
