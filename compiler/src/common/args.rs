//! CLI Argument Parsing
//!
//! Parses command-line arguments using pico-args for minimal
//! overhead. Validates input and exits early on unknown flags
//! so subcommands receive clean, validated arguments.
//!

use super::colors::{NC, RED};
use std::path::PathBuf;
use std::process;

// ------------------------------------------------------------- Public Types

/// Holds parsed CLI arguments for the compiler binary.
///
pub struct Args {
    /// Which subcommand to run (`views`, `styles` or `render`).
    /// Empty string if no subcommand was provided.
    ///
    pub command: String,

    /// Template or stylesheet operand of `styles` and `render`.
    ///
    pub target: Option<PathBuf>,

    /// JSON file bound to `this` by `render`. Set with `--data`.
    ///
    pub data: Option<PathBuf>,

    /// Shows additional output and raises the log level to
    /// debug. Enabled with `-v` or `--verbose`.
    ///
    pub verbose: bool,

    /// Used by build tools to check if compilation is needed
    /// without actually compiling. Exits 0 if stale, 1 if fresh.
    ///
    pub check_only: bool,

    /// Only compile stale files (incremental compilation).
    /// Enabled with `--stale`.
    ///
    pub stale_only: bool,
}

// ------------------------------------------------------------- Public Functions

/// Parses arguments from the environment and validates them.
/// Exits with an error message if unknown flags are passed,
/// preventing silent misconfiguration.
///
pub fn parse() -> Args {
    let mut pargs = pico_args::Arguments::from_env();

    let data = match pargs.opt_value_from_str("--data") {
        Ok(data) => data,
        Err(err) => {
            eprintln!("{}Invalid --data argument: {}{}", RED, err, NC);
            process::exit(1);
        }
    };

    let args = Args {
        verbose: pargs.contains(["-v", "--verbose"]),
        check_only: pargs.contains("--check-only"),
        stale_only: pargs.contains("--stale"),
        data,
        command: pargs.free_from_str().unwrap_or_default(),
        target: pargs.opt_free_from_str().unwrap_or_default(),
    };

    let remaining = pargs.finish();

    if !remaining.is_empty() {
        eprintln!("{}Unknown arguments: {:?}{}", RED, remaining, NC);
        process::exit(1);
    }

    args
}
