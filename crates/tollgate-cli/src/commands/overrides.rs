//! Overrides command - inspect and revoke global ALWAYS approvals.

use anyhow::{Context, Result};
use serde_json::json;
use tollgate_approval::AuthorizationState;
use tollgate_core::RiskLevel;

use super::{OutputFormat, print_json};
use crate::theme::Theme;

/// List the globally approved risk levels.
pub(crate) async fn show_overrides(
    state: &AuthorizationState,
    format: OutputFormat,
) -> Result<()> {
    let levels = state.global_levels().await;

    if format == OutputFormat::Json {
        return print_json(&json!({ "always": levels }));
    }

    if levels.is_empty() {
        println!("{}", Theme::info("No global approvals"));
        return Ok(());
    }
    println!("{}", Theme::header("Always approved"));
    println!("{}", Theme::separator());
    for level in levels {
        println!("  {}", Theme::risk_level(level));
    }
    Ok(())
}

/// Revoke the global approval of one risk level.
pub(crate) async fn revoke_override(
    state: &AuthorizationState,
    raw: &str,
    format: OutputFormat,
) -> Result<()> {
    let risk: RiskLevel = raw.parse()?;
    let was_set = state
        .revoke_global(risk)
        .await
        .context("failed to persist overrides")?;

    match format {
        OutputFormat::Json => print_json(&json!({ "risk": risk, "revoked": was_set })),
        OutputFormat::Pretty => {
            if was_set {
                println!("{}", Theme::success(&format!("Revoked ALWAYS for {risk}")));
            } else {
                println!("{}", Theme::info(&format!("{risk} was not always approved")));
            }
            Ok(())
        },
    }
}

/// Revoke every global approval.
pub(crate) async fn reset_overrides(
    state: &AuthorizationState,
    format: OutputFormat,
) -> Result<()> {
    state
        .reset_global()
        .await
        .context("failed to persist overrides")?;

    match format {
        OutputFormat::Json => print_json(&json!({ "always": [] })),
        OutputFormat::Pretty => {
            println!("{}", Theme::success("Cleared all global approvals"));
            Ok(())
        },
    }
}
