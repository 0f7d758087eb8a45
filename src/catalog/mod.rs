//! Remote catalog client contract.
//!
//! The core never talks to the network directly; it goes through the
//! [`CatalogClient`] trait, which lists an item's files and fetches the
//! bytes of one file. The production implementation is
//! [`HttpCatalogClient`]; tests substitute their own.
//!
//! # Example
//!
//! ```no_run
//! use ia_batch_core::catalog::{CatalogClient, HttpCatalogClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpCatalogClient::new();
//! let files = client.list_files("theodyssey00home").await?;
//! for file in &files {
//!     println!("{} ({}, {} bytes)", file.file_name, file.declared_format, file.size_bytes);
//! }
//! # Ok(())
//! # }
//! ```

mod http;

pub use http::HttpCatalogClient;

use async_trait::async_trait;
use thiserror::Error;

/// One file of a catalog item, as declared by the remote catalog.
///
/// Produced by the catalog client; read-only to the core. The declared
/// format is the primary classification signal and arrives as a free-form
/// label.
#[derive(Debug, Clone)]
pub struct RemoteFileDescriptor {
    /// Identifier of the item this file belongs to.
    pub item_id: String,
    /// File name within the item (may be hostile; sanitized by the planner).
    pub file_name: String,
    /// Catalog-provided format label.
    pub declared_format: String,
    /// Declared size in bytes (0 when the catalog omits it).
    pub size_bytes: u64,
    /// URL the file's bytes can be fetched from.
    pub source_url: String,
}

/// Errors from the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The item identifier does not exist in the catalog.
    #[error("item '{item_id}' not found in the catalog")]
    ItemNotFound {
        /// The identifier that was looked up.
        item_id: String,
    },

    /// The catalog refused access to the resource (401/403).
    #[error("not authorized (HTTP {status}) fetching {url}")]
    NotAuthorized {
        /// The URL that was refused.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level failure (DNS, connect, TLS, timeout, body read).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Unexpected HTTP error status (anything not covered above).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The metadata document could not be interpreted.
    #[error("malformed metadata for '{item_id}': {detail}")]
    Metadata {
        /// The item whose metadata was malformed.
        item_id: String,
        /// What was wrong with it.
        detail: String,
    },
}

impl CatalogError {
    /// Creates an `ItemNotFound` error.
    pub fn item_not_found(item_id: impl Into<String>) -> Self {
        Self::ItemNotFound {
            item_id: item_id.into(),
        }
    }

    /// Creates a `NotAuthorized` error.
    pub fn not_authorized(url: impl Into<String>, status: u16) -> Self {
        Self::NotAuthorized {
            url: url.into(),
            status,
        }
    }

    /// Creates a `Network` error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an `HttpStatus` error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a `Metadata` error.
    pub fn metadata(item_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Metadata {
            item_id: item_id.into(),
            detail: detail.into(),
        }
    }
}

/// Client for listing and fetching catalog item files.
///
/// Object-safe so the orchestrator can hold a `&dyn CatalogClient` and
/// tests can inject scripted implementations.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Lists the files of one item.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ItemNotFound`] for unknown identifiers, otherwise
    /// transport-level errors.
    async fn list_files(&self, item_id: &str) -> Result<Vec<RemoteFileDescriptor>, CatalogError>;

    /// Fetches the bytes of one file by its source URL.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotAuthorized`] for access-restricted files,
    /// otherwise transport-level errors.
    async fn download(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}
