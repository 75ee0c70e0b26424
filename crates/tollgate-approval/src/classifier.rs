//! Risk classification of proposed tool calls.
//!
//! [`RiskClassifier::classify`] is pure and infallible. Rules are applied in a
//! fixed order and the first hit wins:
//!
//! 1. `shell_exec`: ELEVATED shell patterns, then EXFIL shell patterns
//! 2. `browser_*`: sensitive domains, then upload/post detection for
//!    `browser_batch` and `browser_interact`
//! 3. `file_write`, `file_edit`, `action_execute_plan`: ELEVATED
//! 4. anything else: SAFE

use serde_json::Value;
use tollgate_core::{RiskClassification, RiskLevel, truncate_to_boundary};

use crate::rules::RuleSet;

/// Maximum bytes of command or URL echoed into a classification detail.
pub const MAX_DETAIL_BYTES: usize = 200;

/// Tool name for shell command execution.
pub const SHELL_TOOL: &str = "shell_exec";

/// Prefix shared by browser tools.
pub const BROWSER_TOOL_PREFIX: &str = "browser_";

/// Tools that always write to disk or run a plan of writes.
pub const MUTATING_TOOLS: &[&str] = &["file_write", "file_edit", "action_execute_plan"];

/// Browser tools that can submit data on a page.
const INTERACTIVE_BROWSER_TOOLS: &[&str] = &["browser_batch", "browser_interact"];

/// Classifies tool calls against a [`RuleSet`].
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    rules: RuleSet,
}

impl RiskClassifier {
    /// Classifier over the built-in rule tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier over a custom rule set.
    #[must_use]
    pub fn with_rules(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The rules in use.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify a tool call.
    #[must_use]
    pub fn classify(&self, tool: &str, input: &Value) -> RiskClassification {
        if tool == SHELL_TOOL {
            if let Some(c) = self.classify_shell(input) {
                return c;
            }
        } else if tool.starts_with(BROWSER_TOOL_PREFIX) {
            if let Some(c) = self.classify_browser(tool, input) {
                return c;
            }
        } else if MUTATING_TOOLS.contains(&tool) {
            let target = input
                .get("path")
                .and_then(Value::as_str)
                .map_or_else(|| tool.to_string(), |p| format!("{tool}: {p}"));
            let reason = if tool == "action_execute_plan" {
                "Executes a plan of filesystem changes"
            } else {
                "Modifies files on disk"
            };
            return RiskClassification::new(RiskLevel::Elevated, reason, clip(&target));
        }

        RiskClassification::safe()
    }

    fn classify_shell(&self, input: &Value) -> Option<RiskClassification> {
        let command = input.get("command").and_then(Value::as_str)?.to_lowercase();

        if let Some(rule) = self.rules.match_elevated(&command) {
            return Some(RiskClassification::new(
                RiskLevel::Elevated,
                "Shell command escalates privileges, manages packages or is destructive",
                detail(rule.label(), &command),
            ));
        }
        if let Some(rule) = self.rules.match_exfil(&command) {
            return Some(RiskClassification::new(
                RiskLevel::Exfil,
                "Shell command can send data off this machine",
                detail(rule.label(), &command),
            ));
        }
        None
    }

    fn classify_browser(&self, tool: &str, input: &Value) -> Option<RiskClassification> {
        let interactive = INTERACTIVE_BROWSER_TOOLS.contains(&tool);
        let url = input.get("url").and_then(Value::as_str).or_else(|| {
            if tool == "browser_batch" {
                find_nested_url(input)
            } else {
                None
            }
        })?;
        let url = url.to_lowercase();

        if let Some(domain) = self.rules.match_sensitive_domain(&url) {
            return Some(RiskClassification::new(
                RiskLevel::SensitiveDomain,
                "Navigates to a sensitive site",
                detail(domain, &url),
            ));
        }

        if interactive {
            let serialized = input.to_string().to_lowercase();
            let keyword = ["upload", "post"]
                .into_iter()
                .find(|k| serialized.contains(k))?;
            return Some(RiskClassification::new(
                RiskLevel::Exfil,
                "Browser action can submit data to a remote site",
                detail(keyword, &url),
            ));
        }
        None
    }
}

/// First string value stored under a `url` key anywhere inside `value`.
fn find_nested_url(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map
            .get("url")
            .and_then(Value::as_str)
            .or_else(|| map.values().find_map(find_nested_url)),
        Value::Array(items) => items.iter().find_map(find_nested_url),
        _ => None,
    }
}

fn detail(label: &str, subject: &str) -> String {
    clip(&format!("{label}: {subject}"))
}

fn clip(s: &str) -> String {
    truncate_to_boundary(s, MAX_DETAIL_BYTES).to_string()
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
