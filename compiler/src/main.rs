use ingot_compiler::common::args;
use ingot_compiler::common::colors::{NC, RED};
use ingot_compiler::{styles, views};
use std::path::PathBuf;
use std::process;

/// CLI entry point that dispatches to the appropriate compiler.
/// Kept minimal so each compiler module owns its logic.
///
fn main() {
    let args = args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match args.command.as_str() {
        "views" => {
            if args.check_only {
                // Return 0 or 1 to process exit if views should compile.
                process::exit(!views::should_auto_compile() as i32)
            }

            if args.stale_only {
                views::compile_stale(args.verbose);
            } else {
                views::compile(args.verbose);
            }
        }
        "styles" => styles::print(&required_target(args.target, "styles <file>")),
        "render" => views::render(
            &required_target(args.target, "render <template> [--data <file>]"),
            args.data.as_deref(),
        ),
        _ => {
            eprintln!("{}Unknown command: {}{}", RED, args.command, NC);
            process::exit(1);
        }
    }
}

/// Unwraps the path operand or exits with the command's usage.
///
fn required_target(target: Option<PathBuf>, usage: &str) -> PathBuf {
    match target {
        Some(target) => target,
        None => {
            eprintln!("{}Usage: ingot {}{}", RED, usage, NC);
            process::exit(1);
        }
    }
}
