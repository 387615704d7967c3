//! CLI theme and styling.

use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format an action id.
    pub(crate) fn action_id(id: &str) -> String {
        id.bold().to_string()
    }

    /// Format a resolution or polarity word in its traffic-light color.
    /// Surrounding padding is kept and colored with the word.
    pub(crate) fn verdict(word: &str) -> String {
        match word.trim() {
            "allowed" | "allow" => word.green().to_string(),
            "blocked" | "deny" => word.red().bold().to_string(),
            _ => word.dimmed().to_string(),
        }
    }
}
