//! Colored terminal messages for the CLI
//!
//! These go to stderr and bypass the logger, so they show up regardless of
//! the `-v` level.

use owo_colors::OwoColorize;

/// Print an error in red, padded by blank lines
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

/// Print a warning in yellow
pub fn warn(message: &str) {
    eprintln!("{}", message.yellow());
}

/// Print a success message in green
pub fn success(message: &str) {
    eprintln!("{}", message.green());
}
