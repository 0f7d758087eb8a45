//! Destination planning: safe on-disk paths for downloaded files.
//!
//! Item identifiers and file names come from an external, only semi-trusted
//! catalog. Both are sanitized before they touch the filesystem: traversal
//! segments are rejected outright, path separators are flattened, and
//! hidden-file prefixes are stripped.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from destination planning.
#[derive(Debug, Clone, Error)]
pub enum DestinationError {
    /// The component tried to traverse out of the output root.
    #[error("unsafe path component '{component}': contains a '..' segment")]
    Traversal {
        /// The offending component (truncated for display).
        component: String,
    },

    /// The component is empty, or empty after sanitization.
    #[error("unusable path component '{component}': {reason}")]
    Unusable {
        /// The offending component (truncated for display).
        component: String,
        /// Why it cannot be used.
        reason: String,
    },
}

impl DestinationError {
    fn traversal(component: &str) -> Self {
        Self::Traversal {
            component: component.chars().take(80).collect(),
        }
    }

    fn unusable(component: &str, reason: impl Into<String>) -> Self {
        Self::Unusable {
            component: component.chars().take(80).collect(),
            reason: reason.into(),
        }
    }
}

/// Computes the on-disk path for one downloaded file.
///
/// With `organize_by_item` the layout is `root/item_id/file_name`;
/// otherwise files land flat in `root/file_name`. Flat mode may merge
/// same-named files from different items - later downloads overwrite.
///
/// # Errors
///
/// Returns [`DestinationError`] when either component cannot be made safe.
pub fn plan_path(
    output_root: &Path,
    item_id: &str,
    file_name: &str,
    organize_by_item: bool,
) -> Result<PathBuf, DestinationError> {
    let file_component = sanitize_component(file_name)?;

    if organize_by_item {
        let item_component = sanitize_component(item_id)?;
        Ok(output_root.join(item_component).join(file_component))
    } else {
        Ok(output_root.join(file_component))
    }
}

/// Reduces an externally supplied name to a single safe path component.
///
/// - `..` segments are rejected (not silently repaired)
/// - `/` and `\` separators are flattened to `_`
/// - NUL bytes are rejected
/// - leading dots are stripped so no component names a hidden file
///
/// # Errors
///
/// Returns [`DestinationError`] for traversal attempts and components that
/// are empty after sanitization.
pub fn sanitize_component(raw: &str) -> Result<String, DestinationError> {
    if raw.contains('\0') {
        return Err(DestinationError::unusable(raw, "contains a NUL byte"));
    }

    let segments: Vec<&str> = raw
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.iter().any(|s| *s == "..") {
        return Err(DestinationError::traversal(raw));
    }

    let joined = segments.join("_");
    let cleaned = joined.trim().trim_start_matches('.').trim();

    if cleaned.is_empty() {
        return Err(DestinationError::unusable(
            raw,
            "empty after sanitization",
        ));
    }

    Ok(cleaned.to_string())
}
