//! Mode command - show or change the persisted autonomy mode.

use anyhow::{Context, Result};
use serde_json::json;
use tollgate_approval::AutonomySettings;
use tollgate_core::AutonomyMode;

use super::{OutputFormat, print_json};
use crate::theme::Theme;

/// Print the current mode.
pub(crate) fn show_mode(settings: &AutonomySettings, format: OutputFormat) -> Result<()> {
    let mode = settings.mode();
    match format {
        OutputFormat::Json => print_json(&json!({ "mode": mode })),
        OutputFormat::Pretty => {
            println!("{}", Theme::kv("Autonomy mode", &Theme::mode(mode)));
            Ok(())
        },
    }
}

/// Parse and persist a new mode.
pub(crate) async fn set_mode(
    settings: &AutonomySettings,
    raw: &str,
    format: OutputFormat,
) -> Result<()> {
    let mode: AutonomyMode = raw.parse()?;
    let previous = settings.mode();
    settings
        .set_mode(mode)
        .await
        .context("failed to persist autonomy mode")?;

    match format {
        OutputFormat::Json => print_json(&json!({ "previous": previous, "mode": mode })),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!("Autonomy mode: {previous} -> {mode}"))
            );
            Ok(())
        },
    }
}
