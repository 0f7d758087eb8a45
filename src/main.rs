//! CLI entry point for the ia-batch tool.

use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use ia_batch_core::{
    parse_cells, parse_input, BatchOrchestrator, CancelToken, HttpCatalogClient, ParseResult,
    RunOptions, RunVerdict,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so --json output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let parse_result = gather_references(&args)?;

    for rejected in &parse_result.rejected {
        warn!(line = %rejected.raw, error = %rejected.error, "Rejected reference");
    }

    if parse_result.is_empty() {
        if parse_result.rejected.is_empty() {
            info!("No references provided. Pass identifiers or URLs, or pipe them via stdin.");
            info!("Example: ia-batch https://archive.org/details/some_item");
            return Ok(ExitCode::SUCCESS);
        }
        anyhow::bail!("no usable references: all {} input lines were rejected", parse_result.rejected.len());
    }

    info!(%parse_result, "Parsed input");

    let options = RunOptions {
        format_filter: args.format.into(),
        delay: args.delay_interval(),
        organize_by_item: args.organize_by_item,
        parse_html: args.parse_html,
        output_root: args.output.clone(),
    };

    let orchestrator = BatchOrchestrator::new(options)?;
    let client = HttpCatalogClient::new();

    let cancel = CancelToken::new();
    let interrupt_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current file then stopping");
            interrupt_cancel.cancel();
        }
    });

    if args.dry_run {
        let previews = orchestrator
            .preview(&parse_result.items, &client, &cancel)
            .await;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&previews)?);
        } else {
            for preview in &previews {
                match &preview.error {
                    Some(error) => println!("{}: listing failed ({error})", preview.item_id),
                    None => println!(
                        "{}: {} file(s), {} bytes",
                        preview.item_id, preview.file_count, preview.total_bytes
                    ),
                }
            }
            let total: u64 = previews.iter().map(|p| p.total_bytes).sum();
            println!(
                "Would download {} file(s), {total} bytes total",
                previews.iter().map(|p| p.file_count).sum::<usize>()
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let show_spinner = !args.quiet && !args.json && io::stderr().is_terminal();
    let spinner = show_spinner.then(|| start_spinner(&orchestrator));

    let summary = orchestrator
        .run(&parse_result.items, &client, &cancel)
        .await;

    if let Some((bar, ticker)) = spinner {
        ticker.abort();
        bar.finish_and_clear();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
        for outcome in summary.outcomes.iter().filter(|o| !o.is_success()) {
            match &outcome.file_name {
                Some(name) => println!(
                    "  failed: {}/{name}: {}",
                    outcome.item_id,
                    outcome.error_message.as_deref().unwrap_or("unknown error")
                ),
                None => println!(
                    "  failed: {}: {}",
                    outcome.item_id,
                    outcome.error_message.as_deref().unwrap_or("unknown error")
                ),
            }
        }
        if summary.cancelled {
            println!("Run cancelled before completion");
        }
    }

    // Partial failure is still a usable run; only a run where every queued
    // file failed exits non-zero.
    if summary.verdict() == RunVerdict::AllFailed {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Collects references from positional args, a file, a CSV column, or stdin.
fn gather_references(args: &Args) -> Result<ParseResult> {
    if let Some(csv_path) = &args.csv {
        let cells = read_csv_column(csv_path, args.column.as_deref())?;
        return Ok(parse_cells(cells));
    }

    let input_text = if !args.references.is_empty() {
        args.references.join("\n")
    } else if let Some(path) = &args.input {
        std::fs::read_to_string(path)
            .with_context(|| format!("cannot read input file '{}'", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        String::new()
    };

    Ok(parse_input(&input_text))
}

/// Reads one column of a CSV file as candidate references.
///
/// With a named column the first row is treated as a header; without one,
/// every row's first cell is taken as data.
fn read_csv_column(path: &Path, column: Option<&str>) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(column.is_some())
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("cannot read CSV file '{}'", path.display()))?;

    let index = match column {
        Some(name) => reader
            .headers()
            .context("cannot read CSV header row")?
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
            .with_context(|| format!("CSV file has no column named '{name}'"))?,
        None => 0,
    };

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record.context("malformed CSV row")?;
        if let Some(cell) = record.get(index) {
            cells.push(cell.to_string());
        }
    }

    debug!(cells = cells.len(), "Read CSV column");
    Ok(cells)
}

/// Spawns a steady-tick spinner that mirrors live run counters.
fn start_spinner(orchestrator: &BatchOrchestrator) -> (ProgressBar, tokio::task::JoinHandle<()>) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let progress = orchestrator.progress();
    let ticker_bar = bar.clone();
    let ticker = tokio::spawn(async move {
        loop {
            let snapshot = progress.snapshot();
            ticker_bar.set_message(format!(
                "item {}/{} | {} ok, {} failed | {}",
                snapshot.items_done.min(snapshot.items_total.saturating_sub(1)) + 1,
                snapshot.items_total,
                snapshot.files_succeeded,
                snapshot.files_failed,
                snapshot.current
            ));
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    });

    (bar, ticker)
}
