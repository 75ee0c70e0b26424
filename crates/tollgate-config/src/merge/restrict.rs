//! Workspace restriction rules.
//!
//! A workspace config lives inside the project an agent works on, so it may
//! only make the gate stricter than the user's own configuration.

use super::enforce::{block_workspace_override, enforce_mode_tighten, union_string_arrays};
use crate::types::AUTONOMY_MODES;

/// Classifier rule lists a workspace may extend but never shrink.
const RULE_LISTS: [&str; 3] = [
    "extra_elevated_patterns",
    "extra_exfil_patterns",
    "extra_sensitive_domains",
];

/// Storage paths a workspace may not redirect.
const STORAGE_PATHS: [&str; 2] = ["state_dir", "quarantine_dir"];

/// Apply workspace restrictions to `merged`.
///
/// `baseline` is the merged tree before the workspace layer was applied and
/// `workspace` is the raw workspace overlay.
pub fn enforce_restrictions(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
) {
    enforce_mode_tighten(
        merged,
        baseline,
        workspace,
        &["autonomy", "default_mode"],
        "autonomy.default_mode",
        &AUTONOMY_MODES,
    );

    for list in RULE_LISTS {
        union_string_arrays(
            merged,
            baseline,
            workspace,
            &["classifier", list],
            &format!("classifier.{list}"),
        );
    }

    for field in STORAGE_PATHS {
        block_workspace_override(
            merged,
            baseline,
            workspace,
            &["storage", field],
            &format!("storage.{field}"),
        );
    }
}
