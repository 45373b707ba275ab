//! dupewise - Duplicate File Review and Cleanup
//!
//! A cross-platform Rust CLI around an external duplicate scanner: it runs the
//! scanner under a timeout, parses its grouped output into exact and similar
//! groups, deletes redundant exact copies while keeping one per group, and
//! scores office documents for content similarity.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod protocol;
pub mod scan;
pub mod similarity;

use std::fs;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::actions::{DeletionPlanner, DeletionReport};
use crate::cli::{Cli, Commands, CompareArgs, CompareBatchArgs, OutputFormat, ParseArgs, ScanArgs};
use crate::config::Config;
use crate::duplicates::GroupModel;
use crate::error::ExitCode;
use crate::logging::{init_logging, LogOptions};
use crate::output::{render_deletion_report, CsvOutput, JsonOutput, TextOutput};
use crate::progress::{DeleteProgress, ScanProgress};
use crate::protocol::{parse_bytes, ProtocolAnomaly};
use crate::scan::{ScanOrchestrator, ScanOutcome, SessionHandle};
use crate::similarity::{compare, compare_pairs, parse_pair_list, Comparison, DocumentPair};

/// Run the application for parsed CLI arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, rejected scan requests,
/// backend failures and unreadable input. Per-file deletion failures and
/// comparison failures are reported through the exit code instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(LogOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        color: !cli.no_color,
    });

    let config = Config::load(cli.config.as_deref())?;
    let color = config.color && !cli.no_color;
    log::debug!("Effective configuration: {config:?}");

    match cli.command {
        Commands::Scan(args) => handle_scan(args, config, color, cli.quiet),
        Commands::Parse(args) => handle_parse(&args, color),
        Commands::Compare(args) => Ok(handle_compare(&args)),
        Commands::CompareBatch(args) => handle_compare_batch(&args),
    }
}

fn handle_scan(args: ScanArgs, mut config: Config, color: bool, quiet: bool) -> Result<ExitCode> {
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    let orchestrator = ScanOrchestrator::from_config(&config, SessionHandle::new());
    let outcome = run_one_scan(&orchestrator, &args.path, quiet)?;

    let done = match outcome {
        ScanOutcome::Completed(done) => done,
        other => bail!(
            "{}",
            other
                .failure_message()
                .unwrap_or_else(|| "Scan did not complete".to_string())
        ),
    };

    let model = Arc::clone(&done.groups);
    // The JSON summary carries the exit code, so it waits for any deletion.
    let json = args.output == OutputFormat::Json;
    if !json {
        render_model(&model, &done.anomalies, args.output, color, model_exit_code(&model))?;
    }

    let deletion = if args.delete {
        delete_exact_duplicates(&orchestrator, &model, &args.path, args.yes, quiet)?
    } else {
        None
    };
    let exit_code = scan_exit_code(&model, deletion.as_ref());

    if json {
        render_model(&model, &done.anomalies, args.output, color, exit_code)?;
    }
    Ok(exit_code)
}

/// Delete the redundant exact copies, then rescan. `None` when nothing was
/// attempted.
fn delete_exact_duplicates(
    orchestrator: &ScanOrchestrator,
    model: &GroupModel,
    path: &Path,
    assume_yes: bool,
    quiet: bool,
) -> Result<Option<DeletionReport>> {
    let plan = DeletionPlanner::plan(model);
    if plan.is_empty() {
        log::info!("No exact duplicates to delete");
        return Ok(None);
    }

    if !assume_yes && !confirm_deletion(plan.len())? {
        log::info!("Deletion cancelled");
        return Ok(None);
    }

    let progress = DeleteProgress::new(quiet);
    let report = DeletionPlanner::execute_with_progress(&plan, Some(&progress));
    eprintln!("{}", render_deletion_report(&report));

    // Refresh so the log reflects what is left on disk.
    match run_one_scan(orchestrator, path, true) {
        Ok(ScanOutcome::Completed(after)) => log::info!(
            "After cleanup: {} exact group(s), {} similar group(s)",
            after.groups.exact_group_count(),
            after.groups.similar_group_count()
        ),
        Ok(other) => log::warn!(
            "Rescan after deletion failed: {}",
            other.failure_message().unwrap_or_default()
        ),
        Err(e) => log::warn!("Rescan after deletion failed: {e}"),
    }

    Ok(Some(report))
}

/// Final exit code of a scan, after any deletion.
fn scan_exit_code(model: &GroupModel, deletion: Option<&DeletionReport>) -> ExitCode {
    match deletion {
        Some(report) if !report.all_succeeded() => ExitCode::PartialSuccess,
        _ => model_exit_code(model),
    }
}

fn run_one_scan(orchestrator: &ScanOrchestrator, path: &Path, quiet: bool) -> Result<ScanOutcome> {
    let progress = Arc::new(ScanProgress::new(quiet));
    orchestrator
        .run_scan(Some(path), progress)
        .with_context(|| format!("Cannot scan {}", path.display()))
}

fn confirm_deletion(count: usize) -> Result<bool> {
    if !io::stdin().is_terminal() {
        bail!("Refusing to delete {count} file(s) without confirmation; pass -y to proceed");
    }

    eprint!("Permanently delete {count} duplicate file(s)? [y/N] ");
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn handle_parse(args: &ParseArgs, color: bool) -> Result<ExitCode> {
    let bytes = match &args.input {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("Failed to read scanner output from stdin")?;
            buf
        }
    };

    let report = parse_bytes(&bytes)?;
    let model = GroupModel::new(report.groups);
    let exit_code = model_exit_code(&model);
    render_model(&model, &report.anomalies, args.output, color, exit_code)?;
    Ok(exit_code)
}

fn model_exit_code(model: &GroupModel) -> ExitCode {
    if model.no_duplicates_found() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

fn render_model(
    model: &GroupModel,
    anomalies: &[ProtocolAnomaly],
    format: OutputFormat,
    color: bool,
    exit_code: ExitCode,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => TextOutput::new(model, anomalies, color).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(model, anomalies, exit_code).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(model).write_to(&mut out)?,
    }
    out.flush()?;
    Ok(())
}

fn handle_compare(args: &CompareArgs) -> ExitCode {
    let mut pair = DocumentPair::new(&args.left, &args.right);
    if let Some(kind) = args.kind {
        pair = pair.with_kind(kind.into());
    }

    let comparison = compare(&pair);
    println!("{}", comparison.outcome);
    if comparison.outcome.is_similar() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}

fn handle_compare_batch(args: &CompareBatchArgs) -> Result<ExitCode> {
    let text = fs::read_to_string(&args.pairs)
        .with_context(|| format!("Failed to read pair list {}", args.pairs.display()))?;
    let pairs = parse_pair_list(&text)
        .with_context(|| format!("Invalid pair list {}", args.pairs.display()))?;

    log::info!("Comparing {} pair(s)", pairs.len());
    let results = compare_pairs(&pairs);
    write_comparisons(&results, args.output)?;

    let failed = results
        .iter()
        .filter(|c| c.outcome.score().is_none())
        .count();
    if failed > 0 {
        log::warn!("{failed} of {} comparison(s) failed", results.len());
        Ok(ExitCode::GeneralError)
    } else {
        Ok(ExitCode::Success)
    }
}

fn write_comparisons(results: &[Comparison], format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => {
            for c in results {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    c.outcome,
                    c.left.display(),
                    c.right.display()
                )?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, results)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut out);
            writer.write_record(["left", "right", "kind", "verdict", "score", "reason"])?;
            for c in results {
                let (verdict, score, reason) = match &c.outcome {
                    similarity::ComparisonOutcome::Similar { score } => {
                        ("similar", score.to_string(), String::new())
                    }
                    similarity::ComparisonOutcome::Dissimilar { score } => {
                        ("dissimilar", score.to_string(), String::new())
                    }
                    similarity::ComparisonOutcome::Failed { reason } => {
                        ("failed", String::new(), reason.clone())
                    }
                };
                let left = c.left.to_string_lossy();
                let right = c.right.to_string_lossy();
                let kind = c.kind.map(|k| k.to_string()).unwrap_or_default();
                writer.write_record([
                    &*left,
                    &*right,
                    kind.as_str(),
                    verdict,
                    score.as_str(),
                    reason.as_str(),
                ])?;
            }
            writer.flush()?;
        }
    }
    out.flush()?;
    Ok(())
}
