use tracing::warn;

use super::path::{get_nested, remove_nested, set_nested};

/// Union the workspace array with the baseline array: workspace can only add
/// entries, not remove them.
pub(super) fn union_string_arrays(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
    field_name: &str,
) {
    if !get_nested(workspace, path).is_some_and(toml::Value::is_array) {
        return;
    }
    let Some(baseline_items) = get_nested(baseline, path).and_then(toml::Value::as_array) else {
        return;
    };

    let mut result = get_nested(merged, path)
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default();

    let mut restored = 0usize;
    for item in baseline_items {
        if !result.contains(item) {
            result.push(item.clone());
            restored = restored.saturating_add(1);
        }
    }
    if restored > 0 {
        warn!(
            "Workspace config removed {restored} entries from {field_name}; restoring them \
             (workspace can only add, not remove)"
        );
    }

    set_nested(merged, path, toml::Value::Array(result));
}

/// Enforce that a string field representing an ordered mode can only become
/// stricter. Modes are ordered from strictest (index 0) to most permissive.
pub(super) fn enforce_mode_tighten(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
    field_name: &str,
    ordered_modes: &[&str],
) {
    let baseline_str = get_nested(baseline, path).and_then(toml::Value::as_str);
    let ws_str = get_nested(workspace, path).and_then(toml::Value::as_str);

    if let (Some(base_s), Some(ws_s)) = (baseline_str, ws_str) {
        let base_idx = ordered_modes.iter().position(|m| *m == base_s);
        let ws_idx = ordered_modes.iter().position(|m| *m == ws_s);

        if let (Some(b_idx), Some(w_idx)) = (base_idx, ws_idx)
            && w_idx > b_idx
        {
            warn!(
                "Workspace config tried to escalate {field_name} from \"{base_s}\" to \
                 \"{ws_s}\"; reverting to \"{base_s}\""
            );
            set_nested(merged, path, toml::Value::String(base_s.to_owned()));
        }
    }
}

/// Block workspace from overriding a field entirely. If the workspace sets
/// this field, revert to the baseline value.
pub(super) fn block_workspace_override(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
    field_name: &str,
) {
    if get_nested(workspace, path).is_some() {
        warn!(
            "Workspace config tried to override {field_name}; \
             reverting to baseline (workspace cannot set this field)"
        );
        if let Some(base_val) = get_nested(baseline, path) {
            set_nested(merged, path, base_val.clone());
        } else {
            remove_nested(merged, path);
        }
    }
}
