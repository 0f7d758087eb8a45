//! Internet Archive Batch Download Core Library
//!
//! This library provides the core functionality for the ia-batch tool,
//! which turns lists of archive.org references (URLs, bare identifiers,
//! CSV columns) into organized on-disk collections of searchable text
//! and PDF files.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Reference normalization with catalog-host validation
//! - [`classify`] - Declared-format classification and filtering
//! - [`catalog`] - Metadata listing and file retrieval over HTTP
//! - [`text`] - HTML-to-text normalization for wrapped OCR files
//! - [`download`] - Rate-limited sequential batch orchestration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod classify;
pub mod download;
pub mod parser;
pub mod text;

// Re-export commonly used types
pub use catalog::{CatalogClient, CatalogError, HttpCatalogClient, RemoteFileDescriptor};
pub use classify::{classify, FormatClass, FormatFilter};
pub use download::{
    BatchOrchestrator, CancelToken, DownloadOutcome, EngineError, ItemPreview, RateLimiter,
    RunOptions, RunSummary, RunVerdict, DEFAULT_DELAY, MAX_DELAY_SECS,
};
pub use parser::{parse_cells, parse_input, ItemReference, ParseError, ParseResult, SourceKind};
pub use text::HtmlToTextConverter;
