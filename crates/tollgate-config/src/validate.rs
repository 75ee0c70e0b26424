//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{AUTONOMY_MODES, Config};

/// Longest accepted approval request lifetime (one day).
const MAX_REQUEST_TTL_SECS: u64 = 86_400;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_autonomy(config)?;
    validate_classifier(config)?;
    validate_storage(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_autonomy(config: &Config) -> ConfigResult<()> {
    let a = &config.autonomy;
    if !AUTONOMY_MODES.contains(&a.default_mode.as_str()) {
        return Err(invalid(
            "autonomy.default_mode",
            format!(
                "unsupported mode '{}'; expected one of: {}",
                a.default_mode,
                AUTONOMY_MODES.join(", ")
            ),
        ));
    }
    if a.request_ttl_secs == 0 || a.request_ttl_secs > MAX_REQUEST_TTL_SECS {
        return Err(invalid(
            "autonomy.request_ttl_secs",
            format!("request_ttl_secs must be between 1 and {MAX_REQUEST_TTL_SECS}"),
        ));
    }
    Ok(())
}

fn validate_classifier(config: &Config) -> ConfigResult<()> {
    let c = &config.classifier;
    let lists = [
        ("classifier.extra_elevated_patterns", &c.extra_elevated_patterns),
        ("classifier.extra_exfil_patterns", &c.extra_exfil_patterns),
        ("classifier.extra_sensitive_domains", &c.extra_sensitive_domains),
    ];
    for (field, entries) in lists {
        if entries.iter().any(|e| e.trim().is_empty()) {
            return Err(invalid(field, "entries must not be empty"));
        }
    }
    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    let s = &config.storage;
    for (field, value) in [
        ("storage.state_dir", &s.state_dir),
        ("storage.quarantine_dir", &s.quarantine_dir),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(invalid(field, "path must not be empty when set"));
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}
