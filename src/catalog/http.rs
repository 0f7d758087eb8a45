//! HTTP implementation of the catalog client against archive.org.
//!
//! Listing uses the metadata API (`GET /metadata/<id>`), which returns a
//! JSON document with a `files` array. The API answers `200 {}` for
//! unknown identifiers, so an absent `files` array maps to
//! [`CatalogError::ItemNotFound`] just like a 404 would.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{CatalogClient, CatalogError, RemoteFileDescriptor};

/// Default HTTP connect timeout (30 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
const READ_TIMEOUT_SECS: u64 = 300;

/// Production base URL of the catalog.
const DEFAULT_BASE_URL: &str = "https://archive.org";

/// Catalog client speaking HTTP to archive.org.
///
/// Create once and reuse; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

/// Metadata document returned by `GET /metadata/<id>`.
#[derive(Debug, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    files: Option<Vec<MetadataFile>>,
}

/// One entry of the metadata `files` array.
#[derive(Debug, Deserialize)]
struct MetadataFile {
    name: String,
    #[serde(default)]
    format: Option<String>,
    /// The API serializes size as a string for derived files and a number
    /// for some originals; both are accepted, absent means unknown.
    #[serde(default, deserialize_with = "deserialize_size")]
    size: Option<u64>,
}

/// Accepts `"12345"`, `12345`, or null for the size field.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeField {
        Number(u64),
        Text(String),
    }

    let value = Option::<SizeField>::deserialize(deserializer)?;
    Ok(match value {
        Some(SizeField::Number(n)) => Some(n),
        Some(SizeField::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

impl Default for HttpCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCatalogClient {
    /// Creates a client against the production catalog with default
    /// timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against an explicit base URL (used by tests to
    /// point at a local mock server).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = ClientBuilder::new()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(std::time::Duration::from_secs(READ_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds the download URL for a file of an item, percent-encoding
    /// each path segment of the file name.
    #[must_use]
    pub fn download_url(&self, item_id: &str, file_name: &str) -> String {
        let encoded: Vec<String> = file_name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/download/{}/{}", self.base_url, item_id, encoded.join("/"))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self))]
    async fn list_files(&self, item_id: &str) -> Result<Vec<RemoteFileDescriptor>, CatalogError> {
        let url = format!("{}/metadata/{}", self.base_url, item_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::network(&url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::item_not_found(item_id));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CatalogError::not_authorized(&url, status.as_u16()));
        }
        if !status.is_success() {
            return Err(CatalogError::http_status(&url, status.as_u16()));
        }

        let document: MetadataDocument = response
            .json()
            .await
            .map_err(|e| CatalogError::metadata(item_id, e.to_string()))?;

        // The metadata API returns an empty document for unknown items.
        let Some(files) = document.files else {
            return Err(CatalogError::item_not_found(item_id));
        };
        if files.is_empty() {
            return Err(CatalogError::item_not_found(item_id));
        }

        let descriptors = files
            .into_iter()
            .map(|file| {
                let source_url = self.download_url(item_id, &file.name);
                RemoteFileDescriptor {
                    item_id: item_id.to_string(),
                    declared_format: file.format.unwrap_or_default(),
                    size_bytes: file.size.unwrap_or(0),
                    file_name: file.name,
                    source_url,
                }
            })
            .collect::<Vec<_>>();

        debug!(item_id, files = descriptors.len(), "listed item files");
        Ok(descriptors)
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::network(url, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CatalogError::not_authorized(url, status.as_u16()));
        }
        if !status.is_success() {
            return Err(CatalogError::http_status(url, status.as_u16()));
        }

        let declared_len = response.content_length();
        let mut bytes = Vec::with_capacity(usize::try_from(declared_len.unwrap_or(0)).unwrap_or(0));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CatalogError::network(url, e))?;
            bytes.extend_from_slice(&chunk);
        }

        if let Some(expected) = declared_len {
            if expected != bytes.len() as u64 {
                warn!(
                    url,
                    expected,
                    actual = bytes.len(),
                    "content length mismatch on download"
                );
            }
        }

        debug!(url, bytes = bytes.len(), "downloaded file");
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_plain_name() {
        let client = HttpCatalogClient::new();
        assert_eq!(
            client.download_url("book1", "book1_djvu.txt"),
            "https://archive.org/download/book1/book1_djvu.txt"
        );
    }

    #[test]
    fn test_download_url_encodes_spaces_and_unicode() {
        let client = HttpCatalogClient::new();
        let url = client.download_url("book1", "my scan (final).pdf");
        assert!(url.contains("my%20scan%20%28final%29.pdf"), "url: {url}");
    }

    #[test]
    fn test_download_url_preserves_subdirectories() {
        let client = HttpCatalogClient::new();
        let url = client.download_url("book1", "pages/page 1.txt");
        assert_eq!(
            url,
            "https://archive.org/download/book1/pages/page%201.txt"
        );
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client = HttpCatalogClient::with_base_url("http://127.0.0.1:9999/");
        assert_eq!(
            client.download_url("x", "f"),
            "http://127.0.0.1:9999/download/x/f"
        );
    }

    #[test]
    fn test_metadata_size_accepts_string_and_number() {
        let doc: MetadataDocument = serde_json::from_str(
            r#"{"files":[
                {"name":"a.txt","format":"DjVu Text","size":"123"},
                {"name":"b.pdf","format":"Text PDF","size":456},
                {"name":"c.xml","format":"Metadata"}
            ]}"#,
        )
        .unwrap();
        let files = doc.files.unwrap();
        assert_eq!(files[0].size, Some(123));
        assert_eq!(files[1].size, Some(456));
        assert_eq!(files[2].size, None);
    }

    #[test]
    fn test_metadata_empty_document_has_no_files() {
        let doc: MetadataDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.files.is_none());
    }
}
