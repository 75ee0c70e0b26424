//! Environment variable fallbacks.
//!
//! Environment variables are **fallback**, not override: they only fill
//! fields that no config file set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Overrides the Tollgate home directory (default `~/.tollgate`).
pub const HOME_VAR: &str = "TOLLGATE_HOME";

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TOLLGATE_MODE",
        field_path: "autonomy.default_mode",
    },
    EnvMapping {
        var_name: "TOLLGATE_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "TOLLGATE_STATE_DIR",
        field_path: "storage.state_dir",
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer. Values from the embedded defaults do count as
/// unset.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.is_empty()) else {
            continue;
        };
        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );

        let segments: Vec<&str> = mapping.field_path.split('.').collect();
        crate::merge::set_nested(merged, &segments, toml::Value::String(val.clone()));
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn defaults() -> (toml::Value, FieldSources) {
        let val: toml::Value = toml::from_str(
            r#"
            [autonomy]
            default_mode = "guided"
            [logging]
            level = "info"
        "#,
        )
        .unwrap();
        let mut sources = FieldSources::new();
        crate::merge::record_leaves(&val, "", &ConfigLayer::Defaults, &mut sources);
        (val, sources)
    }

    #[test]
    fn test_env_fills_default_fields() {
        let (mut val, mut sources) = defaults();
        let env = make_env(&[("TOLLGATE_MODE", "safe"), ("TOLLGATE_STATE_DIR", "/srv/tg")]);

        let applied = apply_env_fallbacks(&mut val, &mut sources, &env);

        assert_eq!(applied, 2);
        assert_eq!(val["autonomy"]["default_mode"].as_str(), Some("safe"));
        assert_eq!(val["storage"]["state_dir"].as_str(), Some("/srv/tg"));
        assert_eq!(
            sources.get("autonomy.default_mode"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_does_not_override_files() {
        let (mut val, mut sources) = defaults();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);
        let env = make_env(&[("TOLLGATE_LOG_LEVEL", "trace")]);

        assert_eq!(apply_env_fallbacks(&mut val, &mut sources, &env), 0);
        assert_eq!(val["logging"]["level"].as_str(), Some("info"));
    }

    #[test]
    fn test_empty_env_value_ignored() {
        let (mut val, mut sources) = defaults();
        let env = make_env(&[("TOLLGATE_MODE", "")]);

        assert_eq!(apply_env_fallbacks(&mut val, &mut sources, &env), 0);
        assert_eq!(val["autonomy"]["default_mode"].as_str(), Some("guided"));
    }
}
