//! Actions commands - browse the action catalog.

use colored::Colorize;
use pkauth_authority::Authority;
use pkauth_core::ActionDescription;

use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// List every action id the catalog knows.
pub(crate) fn list_actions(authority: &Authority, format: OutputFormat) -> anyhow::Result<()> {
    let ids = authority.list_actions()?;

    if format == OutputFormat::Json {
        return print_json(&ids);
    }

    if ids.is_empty() {
        println!("{}", Theme::info("No actions registered"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Registered Actions"));
    println!("{}", Theme::separator());
    for id in &ids {
        println!("{id}");
    }
    println!();
    Ok(())
}

/// Show catalog metadata for one action.
pub(crate) fn describe_action(
    authority: &Authority,
    action_id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let description = authority.describe_action(action_id)?;

    if format == OutputFormat::Json {
        // Unknown actions print an empty object.
        return match description {
            Some(d) => print_json(&d),
            None => print_json(&serde_json::Map::new()),
        };
    }

    let Some(description) = description else {
        println!("{}", Theme::info(&format!("Unknown action {action_id}")));
        return Ok(());
    };
    print_description(&description);
    Ok(())
}

fn print_description(d: &ActionDescription) {
    println!("\n{}", Theme::header(&Theme::action_id(d.action_id.as_str())));
    println!("{}", Theme::separator());

    let fields = [
        ("Description", d.description.as_deref()),
        ("Message", d.message.as_deref()),
        ("Vendor", d.vendor.as_deref()),
        ("Vendor URL", d.vendor_url.as_deref()),
        ("Icon", d.icon.as_deref()),
    ];
    for (label, value) in fields {
        let Some(value) = value else { continue };
        println!("{:>14} {}", label.dimmed(), value);
    }

    let policies = [
        ("Any", d.policy_any),
        ("Inactive", d.policy_inactive),
        ("Active", d.policy_active),
    ];
    for (label, policy) in policies {
        let Some(policy) = policy else { continue };
        println!("{:>14} {policy}", format!("Policy {label}").dimmed());
    }

    for (key, value) in &d.annotations {
        println!("{:>14} {key} = {value}", "Annotation".dimmed());
    }
    println!();
}
