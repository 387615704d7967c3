//! pkauth CLI - manage the local authorization policy store.
//!
//! A thin front-end over [`pkauth_authority::Authority`]: every command
//! loads the layered configuration, wires an authority from it and runs one
//! query or mutation.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pkauth_core::Scope;

mod commands;
pub mod config_bridge;
mod formatter;
mod theme;

use commands::{actions, authorizations};
use formatter::OutputFormat;
use theme::Theme;

/// pkauth - local authorization policy store
#[derive(Parser)]
#[command(name = "pkauth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Configuration file layered over the system configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Policy file to operate on, overriding every configured path
    #[arg(short, long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered actions
    Actions,

    /// Show catalog metadata for an action
    Describe {
        /// Action id
        action_id: String,
    },

    /// List stored authorizations
    List {
        /// Only show authorizations held by this uid
        #[arg(short, long)]
        uid: Option<u32>,
    },

    /// Print the effective authorization of a user for an action
    Check {
        /// User id
        uid: u32,
        /// Action id
        action_id: String,
    },

    /// Authorize a user for an action
    Grant {
        /// User id
        uid: u32,
        /// Action id
        action_id: String,
        /// Scope: one_shot, process, session or always
        #[arg(short, long, default_value = "always")]
        scope: Scope,
        /// Process the grant applies to (required for one_shot and process)
        #[arg(long)]
        pid: Option<u32>,
    },

    /// Remove one authorization, or all of a user's authorizations
    Revoke {
        /// User id
        uid: u32,
        /// Action id; omit to revoke everything the user holds
        action_id: Option<String>,
    },

    /// Block a user from an action
    Block {
        /// User id
        uid: u32,
        /// Action id
        action_id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = pkauth_config::Config::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(path) = &cli.policy {
        config_bridge::override_policy_path(&mut config, path);
    }

    // Set up logging from config, with --verbose override.
    let mut log_config = config_bridge::to_log_config(&config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = pkauth_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
        // An unusable log directory should not stop the command.
        if matches!(e, pkauth_telemetry::TelemetryError::IoError(_)) {
            let _ = pkauth_telemetry::setup_default_logging();
        }
    }

    tracing::debug!(
        backend = %config.store.backend,
        path = %config.store.path.display(),
        concurrency = %config.store.concurrency,
        "Using policy store"
    );
    let authority = config_bridge::to_authority(&config);
    let format = cli.format;

    match cli.command {
        Commands::Actions => {
            actions::list_actions(&authority, format)?;
        },
        Commands::Describe { action_id } => {
            actions::describe_action(&authority, &action_id, format)?;
        },
        Commands::List { uid } => {
            authorizations::list(&authority, uid, format)?;
        },
        Commands::Check { uid, action_id } => {
            authorizations::check(&authority, uid, &action_id, format)?;
        },
        Commands::Grant {
            uid,
            action_id,
            scope,
            pid,
        } => {
            authorizations::grant(&authority, uid, &action_id, scope, pid, format)?;
        },
        Commands::Revoke { uid, action_id } => {
            authorizations::revoke(&authority, uid, action_id.as_deref(), format)?;
        },
        Commands::Block { uid, action_id } => {
            authorizations::block(&authority, uid, &action_id, format)?;
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_grant_arguments() {
        let cli = Cli::try_parse_from([
            "pkauth",
            "--policy",
            "/tmp/p.pkla",
            "grant",
            "1000",
            "org.example.action",
            "--scope",
            "one-shot",
            "--pid",
            "42",
        ])
        .unwrap();
        assert_eq!(cli.policy, Some(PathBuf::from("/tmp/p.pkla")));
        match cli.command {
            Commands::Grant {
                uid,
                action_id,
                scope,
                pid,
            } => {
                assert_eq!(uid, 1000);
                assert_eq!(action_id, "org.example.action");
                assert_eq!(scope, Scope::OneShot);
                assert_eq!(pid, Some(42));
            },
            _ => panic!("expected grant"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pkauth", "list", "--uid", "7", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::List { uid: Some(7) }));
    }

    #[test]
    fn test_revoke_without_action_means_all() {
        let cli = Cli::try_parse_from(["pkauth", "revoke", "1000"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Revoke {
                uid: 1000,
                action_id: None
            }
        ));
    }

    #[test]
    fn test_unknown_scope_rejected() {
        assert!(
            Cli::try_parse_from(["pkauth", "grant", "1000", "a.b", "--scope", "forever"]).is_err()
        );
    }
}
