//! Terminal Colors
//!
//! ANSI escape codes for terminal output coloring. Keeps the
//! CLI's messages consistent across subcommands without a
//! terminal styling crate.
//!

// ------------------------------------------------------------- Public Consts

/// Success lines such as "Compiled 3 view templates".
///
pub const GREEN: &str = "\x1b[0;32m";

/// Compile errors and fatal conditions, printed to stderr.
///
pub const RED: &str = "\x1b[0;31m";

/// Progress notices and "nothing to do" messages.
///
pub const YELLOW: &str = "\x1b[0;33m";

/// Resets terminal to default color. Always append after
/// colored output to avoid bleeding into subsequent text.
///
pub const NC: &str = "\x1b[0m";
