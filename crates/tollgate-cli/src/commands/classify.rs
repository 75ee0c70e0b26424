//! Classify command - show the risk of a tool call without authorizing it.

use anyhow::Result;
use serde_json::{Value, json};
use tollgate_approval::RiskClassifier;

use super::{OutputFormat, print_json};
use crate::theme::Theme;

/// Classify `tool` with `input` and print the result.
pub(crate) fn classify(
    classifier: &RiskClassifier,
    tool: &str,
    input: &Value,
    format: OutputFormat,
) -> Result<()> {
    let classification = classifier.classify(tool, input);

    if format == OutputFormat::Json {
        return print_json(&json!({
            "tool": tool,
            "classification": classification,
        }));
    }

    println!("{}", Theme::kv("Tool", tool));
    println!("{}", Theme::kv("Risk", &Theme::risk_level(classification.risk)));
    if !classification.is_safe() {
        println!("{}", Theme::kv("Reason", &classification.reason));
        println!("{}", Theme::kv("Detail", &classification.detail));
    }
    Ok(())
}
