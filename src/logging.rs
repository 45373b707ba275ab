//! Logging setup on top of the `log` facade and `env_logger`.
//!
//! Level selection, highest priority first:
//!
//! 1. `RUST_LOG` environment variable
//! 2. `--quiet` (errors only) or `-v` / `-vv` (debug / trace)
//! 3. Info
//!
//! Debug builds prefix records with a timestamp, and with the module path once
//! verbosity is raised. Release builds print level and message only.
//!
//! ```rust,no_run
//! use dupewise::logging::{init_logging, LogOptions};
//!
//! init_logging(LogOptions { verbose: 1, quiet: false, color: true });
//! log::debug!("visible at -v");
//! ```

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Flags that shape the logger, normally taken straight from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Verbosity count (0=info, 1=debug, 2+=trace)
    pub verbose: u8,
    /// Only show errors (overridden by `RUST_LOG`)
    pub quiet: bool,
    /// Allow ANSI styling of the level column
    pub color: bool,
}

/// Initialize the logging subsystem.
///
/// Calling this more than once is harmless: later calls keep the first
/// logger and only emit a debug record.
pub fn init_logging(options: LogOptions) {
    let from_env = env::var("RUST_LOG").ok();

    let mut builder = Builder::new();
    match &from_env {
        Some(_) => {
            builder.parse_default_env();
        }
        None => {
            builder.filter_level(determine_level(options.verbose, options.quiet));
        }
    }

    builder.write_style(if options.color {
        WriteStyle::Auto
    } else {
        WriteStyle::Never
    });
    configure_format(&mut builder, options.verbose);

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
        return;
    }

    match from_env {
        Some(spec) => log::debug!("Logging initialized from RUST_LOG={spec}"),
        None => log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(options.verbose, options.quiet)
        ),
    }
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}
