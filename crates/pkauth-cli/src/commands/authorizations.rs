//! Authorization commands - inspect and change the policy store.

use colored::Colorize;
use pkauth_authority::{Authority, AuthorizationView};
use pkauth_core::Scope;
use serde::Serialize;

use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

#[derive(Serialize)]
struct CheckOutput<'a> {
    uid: u32,
    action_id: &'a str,
    resolution: pkauth_core::Resolution,
}

#[derive(Serialize)]
struct ChangeOutput<'a> {
    operation: &'a str,
    uid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_id: Option<&'a str>,
}

fn report_change(
    format: OutputFormat,
    operation: &str,
    uid: u32,
    action_id: Option<&str>,
    message: &str,
) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(&ChangeOutput {
            operation,
            uid,
            action_id,
        });
    }
    println!("{}", Theme::success(message));
    Ok(())
}

/// List stored authorizations, optionally for a single uid.
pub(crate) fn list(
    authority: &Authority,
    uid: Option<u32>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let views = authority.list_authorizations(uid)?;

    if format == OutputFormat::Json {
        return print_json(&views);
    }

    if views.is_empty() {
        println!("{}", Theme::info("No authorizations stored"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Stored Authorizations"));
    println!(
        "{}",
        format!("{:>8} {:>8} {:>8} {}", "UID", "RESULT", "SCOPE", "ACTION").dimmed()
    );
    println!("{}", Theme::separator());
    for view in &views {
        print_view(view);
    }
    println!();
    Ok(())
}

fn print_view(view: &AuthorizationView) {
    println!("{}", format_view(view));
}

/// One table row. Columns are padded before coloring so escape codes do not
/// count toward the width.
fn format_view(view: &AuthorizationView) -> String {
    let polarity = if view.negative { "deny" } else { "allow" };
    format!(
        "{:>8} {} {:>8} {}",
        view.uid,
        Theme::verdict(&format!("{polarity:>8}")),
        view.scope,
        Theme::action_id(view.action_id.as_str())
    )
}

/// Print the effective authorization of `uid` for `action_id`.
pub(crate) fn check(
    authority: &Authority,
    uid: u32,
    action_id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let resolution = authority.resolve(uid, action_id)?;

    if format == OutputFormat::Json {
        return print_json(&CheckOutput {
            uid,
            action_id,
            resolution,
        });
    }
    println!(
        "uid {uid} {} {}",
        Theme::verdict(&resolution.to_string()),
        Theme::action_id(action_id)
    );
    Ok(())
}

/// Authorize `uid` for `action_id`.
pub(crate) fn grant(
    authority: &Authority,
    uid: u32,
    action_id: &str,
    scope: Scope,
    pid: Option<u32>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    authority.grant(uid, action_id, scope, pid)?;
    report_change(
        format,
        "grant",
        uid,
        Some(action_id),
        &format!("Granted {action_id} to uid {uid}"),
    )
}

/// Remove one authorization, or every authorization when `action_id` is
/// `None`.
pub(crate) fn revoke(
    authority: &Authority,
    uid: u32,
    action_id: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let message = match action_id {
        Some(id) => {
            authority.revoke(uid, id)?;
            format!("Revoked {id} from uid {uid}")
        },
        None => {
            authority.revoke_all(uid)?;
            format!("Revoked all authorizations from uid {uid}")
        },
    };
    report_change(format, "revoke", uid, action_id, &message)
}

/// Record a block for `uid` on `action_id`.
pub(crate) fn block(
    authority: &Authority,
    uid: u32,
    action_id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    authority.block(uid, action_id)?;
    report_change(
        format,
        "block",
        uid,
        Some(action_id),
        &format!("Blocked {action_id} for uid {uid}"),
    )
}
