//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use ia_batch_core::{FormatFilter, MAX_DELAY_SECS};

/// Format filter choices exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// OCR-derived text files only
    Text,
    /// Searchable PDFs only
    Pdf,
    /// Both text and searchable PDFs
    Both,
}

impl From<FormatArg> for FormatFilter {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => FormatFilter::OcrTextOnly,
            FormatArg::Pdf => FormatFilter::SearchablePdfOnly,
            FormatArg::Both => FormatFilter::Both,
        }
    }
}

/// Batch download searchable text and PDFs from archive.org.
///
/// ia-batch takes lists of archive.org references (item URLs, bare
/// identifiers, CSV columns) and downloads each item's OCR text and
/// searchable PDF files, paced politely and organized on disk.
#[derive(Parser, Debug)]
#[command(name = "ia-batch")]
#[command(author, version, about)]
pub struct Args {
    /// Item references (URLs or identifiers); reads stdin when omitted
    pub references: Vec<String>,

    /// Read references from a text file, one per line
    #[arg(short = 'i', long, value_name = "FILE", conflicts_with = "csv")]
    pub input: Option<PathBuf>,

    /// Read references from a CSV file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// CSV column holding the references (header name; first column if omitted)
    #[arg(long, value_name = "NAME", requires = "csv")]
    pub column: Option<String>,

    /// Directory downloads are written under
    #[arg(short, long, value_name = "DIR", default_value = "downloads")]
    pub output: PathBuf,

    /// Which file formats to download
    #[arg(short, long, value_enum, default_value_t = FormatArg::Both)]
    pub format: FormatArg,

    /// Seconds between download starts (0 to disable, max 3600)
    #[arg(short = 'd', long, default_value_t = 1.5, value_parser = parse_delay)]
    pub delay: f64,

    /// Place each item's files in their own subdirectory
    #[arg(long)]
    pub organize_by_item: bool,

    /// Convert HTML-wrapped text files to plain text after download
    #[arg(long)]
    pub parse_html: bool,

    /// List what would be downloaded without fetching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// The pacing interval the flags describe.
    #[must_use]
    pub fn delay_interval(&self) -> Duration {
        Duration::from_secs_f64(self.delay)
    }
}

fn parse_delay(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err("delay must be a non-negative number of seconds".to_string());
    }
    #[allow(clippy::cast_precision_loss)]
    if value > MAX_DELAY_SECS as f64 {
        return Err(format!("delay must be at most {MAX_DELAY_SECS} seconds"));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["ia-batch"]).unwrap();
        assert!(args.references.is_empty());
        assert_eq!(args.output, PathBuf::from("downloads"));
        assert_eq!(args.format, FormatArg::Both);
        assert!((args.delay - 1.5).abs() < f64::EPSILON);
        assert!(!args.organize_by_item);
        assert!(!args.parse_html);
        assert!(!args.dry_run);
        assert!(!args.json);
    }

    #[test]
    fn test_cli_positional_references() {
        let args = Args::try_parse_from(["ia-batch", "book1", "https://archive.org/details/book2"])
            .unwrap();
        assert_eq!(args.references.len(), 2);
    }

    // ==================== Format Tests ====================

    #[test]
    fn test_cli_format_text() {
        let args = Args::try_parse_from(["ia-batch", "--format", "text"]).unwrap();
        assert_eq!(FormatFilter::from(args.format), FormatFilter::OcrTextOnly);
    }

    #[test]
    fn test_cli_format_pdf() {
        let args = Args::try_parse_from(["ia-batch", "-f", "pdf"]).unwrap();
        assert_eq!(FormatFilter::from(args.format), FormatFilter::SearchablePdfOnly);
    }

    #[test]
    fn test_cli_format_invalid_rejected() {
        let result = Args::try_parse_from(["ia-batch", "--format", "epub"]);
        assert!(result.is_err());
    }

    // ==================== Delay Tests ====================

    #[test]
    fn test_cli_delay_zero_disables() {
        let args = Args::try_parse_from(["ia-batch", "--delay", "0"]).unwrap();
        assert_eq!(args.delay_interval(), Duration::ZERO);
    }

    #[test]
    fn test_cli_delay_fractional_seconds() {
        let args = Args::try_parse_from(["ia-batch", "-d", "0.5"]).unwrap();
        assert_eq!(args.delay_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_cli_delay_max_value() {
        let args = Args::try_parse_from(["ia-batch", "-d", "3600"]).unwrap();
        assert_eq!(args.delay_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_cli_delay_over_max_rejected() {
        let result = Args::try_parse_from(["ia-batch", "-d", "3601"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_delay_negative_rejected() {
        let result = Args::try_parse_from(["ia-batch", "-d", "-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_delay_non_numeric_rejected() {
        let result = Args::try_parse_from(["ia-batch", "-d", "fast"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Input Source Tests ====================

    #[test]
    fn test_cli_input_file() {
        let args = Args::try_parse_from(["ia-batch", "--input", "refs.txt"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("refs.txt")));
    }

    #[test]
    fn test_cli_csv_with_column() {
        let args =
            Args::try_parse_from(["ia-batch", "--csv", "items.csv", "--column", "identifier"])
                .unwrap();
        assert_eq!(args.csv, Some(PathBuf::from("items.csv")));
        assert_eq!(args.column.as_deref(), Some("identifier"));
    }

    #[test]
    fn test_cli_column_requires_csv() {
        let result = Args::try_parse_from(["ia-batch", "--column", "identifier"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_input_conflicts_with_csv() {
        let result = Args::try_parse_from(["ia-batch", "--input", "a.txt", "--csv", "b.csv"]);
        assert!(result.is_err());
    }

    // ==================== Mode Flags ====================

    #[test]
    fn test_cli_dry_run_and_json() {
        let args = Args::try_parse_from(["ia-batch", "--dry-run", "--json", "book1"]).unwrap();
        assert!(args.dry_run);
        assert!(args.json);
    }

    #[test]
    fn test_cli_organize_and_parse_html() {
        let args =
            Args::try_parse_from(["ia-batch", "--organize-by-item", "--parse-html"]).unwrap();
        assert!(args.organize_by_item);
        assert!(args.parse_html);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["ia-batch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["ia-batch", "-q"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["ia-batch", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
