//! Subcommand handlers.

pub(crate) mod authorize;
pub(crate) mod classify;
pub(crate) mod mode;
pub(crate) mod overrides;
pub(crate) mod plan;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// How command results are printed on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Colored, human-oriented output.
    #[default]
    Pretty,
    /// One pretty-printed JSON document.
    Json,
}

/// Print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a `--input` argument; absent means an empty object.
pub(crate) fn parse_input(raw: Option<&str>) -> Result<Value> {
    match raw {
        None => Ok(Value::Object(serde_json::Map::new())),
        Some(raw) => serde_json::from_str(raw).context("--input is not valid JSON"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_input_is_empty_object() {
        assert_eq!(parse_input(None).unwrap(), json!({}));
    }

    #[test]
    fn test_input_parsed() {
        assert_eq!(
            parse_input(Some(r#"{"command": "ls"}"#)).unwrap(),
            json!({"command": "ls"})
        );
        assert!(parse_input(Some("{command")).is_err());
    }
}
