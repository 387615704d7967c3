//! Output format selection.

use clap::ValueEnum;
use serde::Serialize;

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Colored, human-readable tables.
    #[default]
    Pretty,
    /// One pretty-printed JSON document on stdout.
    Json,
}

/// Print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
