//! Sequential batch download orchestration.
//!
//! The orchestrator owns the whole pipeline for a run: list each item's
//! files through a [`CatalogClient`], classify and filter them, plan safe
//! destinations, then fetch the survivors one at a time under the rate
//! limiter. Per-item and per-file failures are recorded and skipped; only
//! an unusable output root aborts a run before it starts.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogClient, RemoteFileDescriptor};
use crate::classify::{classify, FormatClass, FormatFilter};
use crate::parser::ItemReference;
use crate::text::HtmlToTextConverter;

use super::destination::plan_path;
use super::outcome::{
    DownloadOutcome, DownloadTask, ErrorKind, ItemPreview, RunSummary,
};
use super::rate_limiter::RateLimiter;

/// Default start-to-start pacing between downloads.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

/// Upper bound on the configurable pacing interval.
pub const MAX_DELAY_SECS: u64 = 3600;

/// File extensions eligible for HTML-to-text normalization.
const TEXT_EXTENSIONS: [&str; 2] = ["txt", "text"];

/// Errors that abort a run before any download starts.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The output root could not be created or is not writable.
    #[error("cannot use output directory '{path}': {source}. {suggestion}")]
    OutputRoot {
        /// The directory that was rejected.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
        /// Hint for fixing the problem.
        suggestion: String,
    },
}

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Which format classes to download.
    pub format_filter: FormatFilter,
    /// Start-to-start pacing between downloads.
    pub delay: Duration,
    /// Place each item's files in their own subdirectory.
    pub organize_by_item: bool,
    /// Convert HTML-wrapped text files to plain text after download.
    pub parse_html: bool,
    /// Directory all downloads land under.
    pub output_root: PathBuf,
}

impl RunOptions {
    /// Creates options with the default filter, pacing, and flat layout.
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            format_filter: FormatFilter::Both,
            delay: DEFAULT_DELAY,
            organize_by_item: false,
            parse_html: false,
            output_root: output_root.into(),
        }
    }
}

/// Cooperative cancellation flag shared between the run and its caller.
///
/// Cancellation is checked between items and between files; an in-flight
/// transfer is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Live counters a progress display can poll while a run executes.
#[derive(Debug, Default)]
pub struct RunProgress {
    items_total: AtomicUsize,
    items_done: AtomicUsize,
    files_succeeded: AtomicUsize,
    files_failed: AtomicUsize,
    bytes_written: AtomicU64,
    current: Mutex<String>,
}

impl RunProgress {
    fn start_run(&self, items_total: usize) {
        self.items_total.store(items_total, Ordering::Relaxed);
    }

    fn set_current(&self, label: &str) {
        if let Ok(mut current) = self.current.lock() {
            current.clear();
            current.push_str(label);
        }
    }

    fn item_done(&self) {
        self.items_done.fetch_add(1, Ordering::Relaxed);
    }

    fn file_succeeded(&self, bytes: u64) {
        self.files_succeeded.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    fn file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time view of the counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            items_total: self.items_total.load(Ordering::Relaxed),
            items_done: self.items_done.load(Ordering::Relaxed),
            files_succeeded: self.files_succeeded.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            current: self
                .current
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or_default(),
        }
    }
}

/// One polled reading of [`RunProgress`].
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub items_total: usize,
    pub items_done: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub bytes_written: u64,
    pub current: String,
}

/// Drives a batch of item references through listing, filtering, and
/// rate-limited sequential download.
#[derive(Debug)]
pub struct BatchOrchestrator {
    options: RunOptions,
    rate_limiter: RateLimiter,
    converter: HtmlToTextConverter,
    progress: Arc<RunProgress>,
}

impl BatchOrchestrator {
    /// Creates an orchestrator, ensuring the output root exists.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutputRoot`] when the directory cannot be
    /// created.
    pub fn new(options: RunOptions) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&options.output_root).map_err(|source| {
            EngineError::OutputRoot {
                path: options.output_root.clone(),
                source,
                suggestion: "Check the path and directory permissions".to_string(),
            }
        })?;

        let rate_limiter = RateLimiter::new(options.delay);
        Ok(Self {
            options,
            rate_limiter,
            converter: HtmlToTextConverter::structured(),
            progress: Arc::new(RunProgress::default()),
        })
    }

    /// Replaces the HTML-to-text converter.
    #[must_use]
    pub fn with_converter(mut self, converter: HtmlToTextConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Handle for polling live run counters.
    #[must_use]
    pub fn progress(&self) -> Arc<RunProgress> {
        Arc::clone(&self.progress)
    }

    /// Runs the batch to completion (or cancellation).
    ///
    /// Every requested item is accounted for in the returned summary:
    /// listing failures become item-level outcomes, each queued file
    /// becomes a file-level outcome.
    #[instrument(skip(self, references, client, cancel), fields(items = references.len()))]
    pub async fn run(
        &self,
        references: &[ItemReference],
        client: &dyn CatalogClient,
        cancel: &CancelToken,
    ) -> RunSummary {
        let mut summary = RunSummary::new(references.len());
        self.progress.start_run(references.len());

        info!(
            items = references.len(),
            filter = ?self.options.format_filter,
            delay_ms = self.options.delay.as_millis() as u64,
            "Starting batch run"
        );

        'items: for reference in references {
            if cancel.is_cancelled() {
                info!("Cancellation requested, stopping before next item");
                summary.cancelled = true;
                break;
            }

            let item_id = reference.item_id.as_str();
            self.progress.set_current(item_id);
            debug!(item_id, "Listing item files");

            let files = match client.list_files(item_id).await {
                Ok(files) => files,
                Err(error) => {
                    warn!(item_id, %error, "Skipping item: listing failed");
                    summary.record_item_failure(DownloadOutcome::item_failed(
                        item_id,
                        ErrorKind::from_catalog(&error),
                        error.to_string(),
                    ));
                    self.progress.item_done();
                    continue;
                }
            };

            summary.items_resolved += 1;
            let tasks = self.plan_tasks(reference, &files, &mut summary);
            debug!(item_id, queued = tasks.len(), "Item files queued");

            for task in tasks {
                if cancel.is_cancelled() {
                    info!("Cancellation requested, stopping before next file");
                    summary.cancelled = true;
                    break 'items;
                }

                self.progress
                    .set_current(&format!("{item_id}/{}", task.file.file_name));
                self.rate_limiter.wait_turn().await;

                let outcome = self.fetch_one(client, &task).await;
                if outcome.is_success() {
                    self.progress.file_succeeded(outcome.bytes_written);
                } else {
                    self.progress.file_failed();
                }
                summary.record_file(outcome);
            }

            self.progress.item_done();
        }

        info!(%summary, verdict = ?summary.verdict(), "Batch run finished");
        summary
    }

    /// Lists each item and reports what the current filter would download,
    /// without fetching anything.
    #[instrument(skip(self, references, client, cancel), fields(items = references.len()))]
    pub async fn preview(
        &self,
        references: &[ItemReference],
        client: &dyn CatalogClient,
        cancel: &CancelToken,
    ) -> Vec<ItemPreview> {
        let mut previews = Vec::with_capacity(references.len());

        for reference in references {
            if cancel.is_cancelled() {
                break;
            }

            let item_id = reference.item_id.as_str();
            match client.list_files(item_id).await {
                Ok(files) => {
                    let qualifying: Vec<&RemoteFileDescriptor> = files
                        .iter()
                        .filter(|file| {
                            self.options
                                .format_filter
                                .matches(classify(&file.declared_format, &file.file_name))
                        })
                        .collect();
                    previews.push(ItemPreview {
                        item_id: item_id.to_string(),
                        file_count: qualifying.len(),
                        total_bytes: qualifying.iter().map(|file| file.size_bytes).sum(),
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(item_id, %error, "Preview: listing failed");
                    previews.push(ItemPreview {
                        item_id: item_id.to_string(),
                        file_count: 0,
                        total_bytes: 0,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        previews
    }

    /// Classifies, filters, and destination-plans one item's file listing.
    fn plan_tasks(
        &self,
        reference: &ItemReference,
        files: &[RemoteFileDescriptor],
        summary: &mut RunSummary,
    ) -> Vec<DownloadTask> {
        let item_id = reference.item_id.as_str();
        let mut tasks = Vec::new();

        for file in files {
            let class = classify(&file.declared_format, &file.file_name);
            if !self.options.format_filter.matches(class) {
                continue;
            }

            match plan_path(
                &self.options.output_root,
                item_id,
                &file.file_name,
                self.options.organize_by_item,
            ) {
                Ok(destination) => tasks.push(DownloadTask {
                    reference: reference.clone(),
                    file: file.clone(),
                    format_class: class,
                    destination,
                }),
                Err(error) => {
                    warn!(item_id, file_name = %file.file_name, %error, "Skipping file: unsafe destination");
                    summary.record_file(DownloadOutcome::planning_failed(
                        item_id,
                        &file.file_name,
                        error.to_string(),
                    ));
                }
            }
        }

        tasks
    }

    /// Fetches one task, normalizes if configured, and writes it to disk.
    async fn fetch_one(&self, client: &dyn CatalogClient, task: &DownloadTask) -> DownloadOutcome {
        let body = match client.download(&task.file.source_url).await {
            Ok(body) => body,
            Err(error) => {
                warn!(
                    item_id = %task.file.item_id,
                    file_name = %task.file.file_name,
                    %error,
                    "Download failed"
                );
                return DownloadOutcome::failed(task, ErrorKind::from_catalog(&error), error.to_string());
            }
        };

        let body = if self.should_normalize(task) {
            self.converter.normalize_if_html(&body).into_owned()
        } else {
            body
        };

        if let Some(parent) = task.destination.parent() {
            if let Err(error) = tokio::fs::create_dir_all(parent).await {
                return DownloadOutcome::failed(task, ErrorKind::Write, error.to_string());
            }
        }

        match tokio::fs::write(&task.destination, &body).await {
            Ok(()) => {
                debug!(
                    destination = %task.destination.display(),
                    bytes = body.len(),
                    "File written"
                );
                DownloadOutcome::success(task, body.len() as u64)
            }
            Err(error) => {
                warn!(
                    destination = %task.destination.display(),
                    %error,
                    "Write failed"
                );
                DownloadOutcome::failed(task, ErrorKind::Write, error.to_string())
            }
        }
    }

    /// HTML normalization applies only to text-class files with a text
    /// extension. PDFs are binary and must never be rewritten.
    fn should_normalize(&self, task: &DownloadTask) -> bool {
        if !self.options.parse_html || task.format_class != FormatClass::OcrText {
            return false;
        }
        task.destination
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_run_options_defaults() {
        let options = RunOptions::new("/tmp/out");
        assert_eq!(options.delay, DEFAULT_DELAY);
        assert_eq!(options.format_filter, FormatFilter::Both);
        assert!(!options.organize_by_item);
        assert!(!options.parse_html);
    }

    #[test]
    fn test_progress_snapshot_tracks_counters() {
        let progress = RunProgress::default();
        progress.start_run(3);
        progress.set_current("book1");
        progress.file_succeeded(100);
        progress.file_failed();
        progress.item_done();

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.items_total, 3);
        assert_eq!(snapshot.items_done, 1);
        assert_eq!(snapshot.files_succeeded, 1);
        assert_eq!(snapshot.files_failed, 1);
        assert_eq!(snapshot.bytes_written, 100);
        assert_eq!(snapshot.current, "book1");
    }
}
