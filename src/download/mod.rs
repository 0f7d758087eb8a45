//! Batch download pipeline: destination planning, pacing, and the
//! sequential orchestrator that drives a run end to end.

pub mod destination;
pub mod engine;
pub mod outcome;
pub mod rate_limiter;

pub use destination::{plan_path, sanitize_component, DestinationError};
pub use engine::{
    BatchOrchestrator, CancelToken, EngineError, ProgressSnapshot, RunOptions, RunProgress,
    DEFAULT_DELAY, MAX_DELAY_SECS,
};
pub use outcome::{
    DownloadOutcome, DownloadTask, ErrorKind, ItemPreview, OutcomeStatus, RunSummary, RunVerdict,
};
pub use rate_limiter::RateLimiter;
