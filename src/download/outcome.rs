//! Per-file download records and whole-run accounting.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{CatalogError, RemoteFileDescriptor};
use crate::classify::FormatClass;
use crate::parser::ItemReference;

/// One file scheduled for download, with its planned destination.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// The reference that produced this task.
    pub reference: ItemReference,
    /// Catalog listing entry for the file.
    pub file: RemoteFileDescriptor,
    /// Why the file qualified for download.
    pub format_class: FormatClass,
    /// Planned on-disk path.
    pub destination: PathBuf,
}

/// Broad failure category for a recorded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The item does not exist in the catalog.
    ItemNotFound,
    /// The catalog refused access to the item or file.
    NotAuthorized,
    /// Network-level or HTTP-level failure.
    Transport,
    /// The catalog listing could not be interpreted.
    Metadata,
    /// The destination path could not be made safe.
    Destination,
    /// Writing the file to disk failed.
    Write,
}

impl ErrorKind {
    /// Maps a catalog error to its outcome category.
    #[must_use]
    pub fn from_catalog(error: &CatalogError) -> Self {
        match error {
            CatalogError::ItemNotFound { .. } => Self::ItemNotFound,
            CatalogError::NotAuthorized { .. } => Self::NotAuthorized,
            CatalogError::Network { .. } | CatalogError::HttpStatus { .. } => Self::Transport,
            CatalogError::Metadata { .. } => Self::Metadata,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ItemNotFound => "item not found",
            Self::NotAuthorized => "not authorized",
            Self::Transport => "transport failure",
            Self::Metadata => "metadata failure",
            Self::Destination => "unsafe destination",
            Self::Write => "write failure",
        };
        write!(f, "{label}")
    }
}

/// Terminal state of one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Record of one attempted download, or of an item that never yielded tasks.
///
/// Item-level failures (the listing itself failed) are recorded with no
/// `file_name` so a run over a partly bad batch still accounts for every
/// requested item.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    /// Item the outcome belongs to.
    pub item_id: String,
    /// File name, absent for item-level failures.
    pub file_name: Option<String>,
    /// Planned destination, absent when planning failed or never happened.
    pub destination: Option<PathBuf>,
    /// Terminal state.
    pub status: OutcomeStatus,
    /// Bytes written to disk (after any text normalization).
    pub bytes_written: u64,
    /// Failure category, present only for failed outcomes.
    pub error_kind: Option<ErrorKind>,
    /// Human-readable failure detail.
    pub error_message: Option<String>,
}

impl DownloadOutcome {
    /// Records a completed download.
    #[must_use]
    pub fn success(task: &DownloadTask, bytes_written: u64) -> Self {
        Self {
            item_id: task.file.item_id.clone(),
            file_name: Some(task.file.file_name.clone()),
            destination: Some(task.destination.clone()),
            status: OutcomeStatus::Success,
            bytes_written,
            error_kind: None,
            error_message: None,
        }
    }

    /// Records a failed download of a specific file.
    #[must_use]
    pub fn failed(task: &DownloadTask, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            item_id: task.file.item_id.clone(),
            file_name: Some(task.file.file_name.clone()),
            destination: Some(task.destination.clone()),
            status: OutcomeStatus::Failed,
            bytes_written: 0,
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }

    /// Records a failed file whose destination could never be planned.
    #[must_use]
    pub fn planning_failed(
        item_id: &str,
        file_name: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.to_string(),
            file_name: Some(file_name.to_string()),
            destination: None,
            status: OutcomeStatus::Failed,
            bytes_written: 0,
            error_kind: Some(ErrorKind::Destination),
            error_message: Some(message.into()),
        }
    }

    /// Records an item whose listing failed before any file was queued.
    #[must_use]
    pub fn item_failed(item_id: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            item_id: item_id.to_string(),
            file_name: None,
            destination: None,
            status: OutcomeStatus::Failed,
            bytes_written: 0,
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }

    /// Whether this outcome represents a written file.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Overall disposition of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    /// No file on any resolvable item matched the format filter.
    NothingMatched,
    /// Files were queued but every single one failed.
    AllFailed,
    /// Some files succeeded, some failed.
    PartialSuccess,
    /// Every queued file was written.
    Complete,
}

/// Aggregated result of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique items the caller asked for.
    pub items_requested: usize,
    /// Items whose listing succeeded.
    pub items_resolved: usize,
    /// Files that matched the filter and were queued for download.
    pub files_queued: usize,
    /// Files written to disk.
    pub files_succeeded: usize,
    /// Queued files that failed.
    pub files_failed: usize,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Every recorded outcome, in run order.
    pub outcomes: Vec<DownloadOutcome>,
    /// Whether the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl RunSummary {
    /// Creates an empty summary for a run over `items_requested` items.
    #[must_use]
    pub fn new(items_requested: usize) -> Self {
        Self {
            items_requested,
            items_resolved: 0,
            files_queued: 0,
            files_succeeded: 0,
            files_failed: 0,
            bytes_written: 0,
            outcomes: Vec::new(),
            cancelled: false,
        }
    }

    /// Records the outcome of one queued file.
    pub fn record_file(&mut self, outcome: DownloadOutcome) {
        self.files_queued += 1;
        if outcome.is_success() {
            self.files_succeeded += 1;
            self.bytes_written += outcome.bytes_written;
        } else {
            self.files_failed += 1;
        }
        self.outcomes.push(outcome);
    }

    /// Records an item-level failure that queued no files.
    pub fn record_item_failure(&mut self, outcome: DownloadOutcome) {
        self.outcomes.push(outcome);
    }

    /// Classifies the finished run.
    #[must_use]
    pub fn verdict(&self) -> RunVerdict {
        if self.files_queued == 0 {
            RunVerdict::NothingMatched
        } else if self.files_succeeded == 0 {
            RunVerdict::AllFailed
        } else if self.files_failed > 0 {
            RunVerdict::PartialSuccess
        } else {
            RunVerdict::Complete
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} items resolved, {}/{} files downloaded ({} bytes)",
            self.items_resolved,
            self.items_requested,
            self.files_succeeded,
            self.files_queued,
            self.bytes_written
        )
    }
}

/// Per-item line of a dry-run preview.
#[derive(Debug, Clone, Serialize)]
pub struct ItemPreview {
    /// Item the preview describes.
    pub item_id: String,
    /// Qualifying files under the current filter.
    pub file_count: usize,
    /// Sum of declared sizes of qualifying files.
    pub total_bytes: u64,
    /// Present when the listing failed and counts are therefore zero.
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn task(item_id: &str, file_name: &str) -> DownloadTask {
        DownloadTask {
            reference: ItemReference {
                raw: item_id.to_string(),
                item_id: item_id.to_string(),
                source: crate::parser::SourceKind::BareId,
            },
            file: RemoteFileDescriptor {
                item_id: item_id.to_string(),
                file_name: file_name.to_string(),
                declared_format: "DjVuTXT".to_string(),
                size_bytes: 100,
                source_url: format!("https://archive.org/download/{item_id}/{file_name}"),
            },
            format_class: FormatClass::OcrText,
            destination: PathBuf::from(format!("/out/{file_name}")),
        }
    }

    // ==================== Verdict ====================

    #[test]
    fn test_verdict_nothing_matched() {
        let summary = RunSummary::new(3);
        assert_eq!(summary.verdict(), RunVerdict::NothingMatched);
    }

    #[test]
    fn test_verdict_nothing_matched_despite_item_failures() {
        let mut summary = RunSummary::new(1);
        summary.record_item_failure(DownloadOutcome::item_failed(
            "ghost",
            ErrorKind::ItemNotFound,
            "item not found",
        ));
        assert_eq!(summary.verdict(), RunVerdict::NothingMatched);
    }

    #[test]
    fn test_verdict_all_failed() {
        let mut summary = RunSummary::new(1);
        let t = task("book1", "a.txt");
        summary.record_file(DownloadOutcome::failed(&t, ErrorKind::Transport, "timeout"));
        assert_eq!(summary.verdict(), RunVerdict::AllFailed);
    }

    #[test]
    fn test_verdict_partial_success() {
        let mut summary = RunSummary::new(2);
        summary.record_file(DownloadOutcome::success(&task("book1", "a.txt"), 10));
        summary.record_file(DownloadOutcome::failed(
            &task("book2", "b.txt"),
            ErrorKind::Transport,
            "timeout",
        ));
        assert_eq!(summary.verdict(), RunVerdict::PartialSuccess);
    }

    #[test]
    fn test_verdict_complete() {
        let mut summary = RunSummary::new(1);
        summary.record_file(DownloadOutcome::success(&task("book1", "a.txt"), 10));
        assert_eq!(summary.verdict(), RunVerdict::Complete);
    }

    // ==================== Accounting ====================

    #[test]
    fn test_counters_track_outcomes() {
        let mut summary = RunSummary::new(2);
        summary.record_file(DownloadOutcome::success(&task("book1", "a.txt"), 100));
        summary.record_file(DownloadOutcome::success(&task("book1", "b.txt"), 50));
        summary.record_file(DownloadOutcome::failed(
            &task("book2", "c.txt"),
            ErrorKind::Write,
            "disk full",
        ));

        assert_eq!(summary.files_queued, 3);
        assert_eq!(summary.files_succeeded, 2);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.bytes_written, 150);
        assert_eq!(summary.outcomes.len(), 3);
    }

    #[test]
    fn test_item_failure_does_not_count_as_queued() {
        let mut summary = RunSummary::new(1);
        summary.record_item_failure(DownloadOutcome::item_failed(
            "ghost",
            ErrorKind::ItemNotFound,
            "item not found",
        ));
        assert_eq!(summary.files_queued, 0);
        assert_eq!(summary.outcomes.len(), 1);
        assert_eq!(summary.outcomes[0].file_name, None);
    }

    // ==================== Error kinds ====================

    #[test]
    fn test_error_kind_from_catalog() {
        assert_eq!(
            ErrorKind::from_catalog(&CatalogError::item_not_found("x")),
            ErrorKind::ItemNotFound
        );
        assert_eq!(
            ErrorKind::from_catalog(&CatalogError::not_authorized("https://a", 403)),
            ErrorKind::NotAuthorized
        );
        assert_eq!(
            ErrorKind::from_catalog(&CatalogError::http_status("https://a", 500)),
            ErrorKind::Transport
        );
        assert_eq!(
            ErrorKind::from_catalog(&CatalogError::metadata("x", "bad json")),
            ErrorKind::Metadata
        );
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let mut summary = RunSummary::new(1);
        summary.record_file(DownloadOutcome::success(&task("book1", "a.txt"), 10));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"files_succeeded\":1"));
        assert!(json.contains("\"status\":\"success\""));
    }
}
