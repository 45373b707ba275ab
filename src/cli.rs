//! Command-line interface definitions for dupewise.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, error format, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory and print a report
//! dupewise scan ~/Documents
//!
//! # Scan, then delete exact duplicates without prompting
//! dupewise scan ~/Documents --delete -y
//!
//! # Render saved scanner output as JSON
//! duplicate_finder ~/Documents --similar | dupewise parse --output json
//!
//! # Compare two workbooks (exit 0 if similar)
//! dupewise compare budget_v1.xlsx budget_v2.xlsx
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::similarity::DocumentKind;

/// Duplicate file review and cleanup around an external scanner.
///
/// dupewise runs a scanner backend, groups its findings into exact and
/// similar files, and removes redundant exact copies while keeping one of
/// each group.
#[derive(Debug, Parser)]
#[command(name = "dupewise")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory with the scanner backend
    Scan(ScanArgs),
    /// Render previously captured scanner output
    Parse(ParseArgs),
    /// Compare two office documents by content
    Compare(CompareArgs),
    /// Compare many document pairs in parallel
    CompareBatch(CompareBatchArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Scanner backend executable (overrides the config file)
    #[arg(long, value_name = "PATH")]
    pub backend: Option<PathBuf>,

    /// Backend timeout in seconds (overrides the config file)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Delete redundant files of every exact group after the scan
    ///
    /// The first file of each group is always kept. Similar groups are
    /// never touched.
    #[arg(long)]
    pub delete: bool,

    /// Skip the deletion confirmation prompt
    #[arg(short = 'y', long, requires = "delete")]
    pub yes: bool,
}

/// Arguments for the parse subcommand.
#[derive(Debug, Args)]
pub struct ParseArgs {
    /// File holding scanner output (reads stdin if omitted)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First document
    #[arg(value_name = "A")]
    pub left: PathBuf,

    /// Second document
    #[arg(value_name = "B")]
    pub right: PathBuf,

    /// Document kind (detected from the first file's extension if omitted)
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,
}

/// Arguments for the compare-batch subcommand.
#[derive(Debug, Args)]
pub struct CompareBatchArgs {
    /// File with one tab-separated pair of paths per line
    #[arg(value_name = "PAIRS_FILE")]
    pub pairs: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Document kind as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Workbooks (xlsx, xlsm, xlsb, xls, ods)
    Spreadsheet,
    /// Word documents (docx)
    Word,
    /// Slide decks (pptx)
    Presentation,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Spreadsheet => DocumentKind::Spreadsheet,
            KindArg::Word => DocumentKind::WordProcessor,
            KindArg::Presentation => DocumentKind::Presentation,
        }
    }
}
