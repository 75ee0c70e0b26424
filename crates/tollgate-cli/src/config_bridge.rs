//! Conversion from the layered configuration to runtime types.
//!
//! `tollgate-config` has no internal dependencies, so everything that turns
//! config strings into domain types lives here.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tollgate_approval::{RiskClassifier, RuleSet};
use tollgate_config::{Config, ResolvedConfig};
use tollgate_core::AutonomyMode;
use tollgate_telemetry::LogConfig;

/// File name of the settings and ledger document inside the state directory.
const STATE_FILE: &str = "tollgate.json";

/// Build the logging config, raising the level to `debug` when verbose.
pub(crate) fn to_log_config(config: &Config, verbose: bool) -> LogConfig {
    let mut log_config = LogConfig::from(&config.logging);
    if verbose {
        log_config.level = "debug".to_owned();
    }
    log_config
}

/// Autonomy mode used when no mode has been persisted yet.
pub(crate) fn to_autonomy_mode(config: &Config) -> Result<AutonomyMode> {
    config
        .autonomy
        .default_mode
        .parse()
        .context("invalid autonomy.default_mode")
}

/// Classifier with the built-in tables plus the configured extra rules.
pub(crate) fn to_classifier(config: &Config) -> Result<RiskClassifier> {
    let c = &config.classifier;
    let rules = RuleSet::extended(
        &c.extra_elevated_patterns,
        &c.extra_exfil_patterns,
        &c.extra_sensitive_domains,
    )
    .context("invalid classifier rule in configuration")?;
    Ok(RiskClassifier::with_rules(rules))
}

/// How long an approval prompt stays answerable.
pub(crate) fn to_request_ttl(config: &Config) -> Duration {
    Duration::from_secs(config.autonomy.request_ttl_secs)
}

/// Where the state document and quarantine live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoragePaths {
    pub(crate) state_file: PathBuf,
    pub(crate) quarantine_dir: PathBuf,
}

/// Resolve storage paths. `--state-dir` replaces the configured state
/// directory; an unconfigured quarantine directory follows it.
pub(crate) fn to_storage_paths(
    resolved: &ResolvedConfig,
    state_dir_override: Option<PathBuf>,
) -> StoragePaths {
    let Some(state_dir) = state_dir_override else {
        return StoragePaths {
            state_file: resolved.state_dir().join(STATE_FILE),
            quarantine_dir: resolved.quarantine_dir(),
        };
    };
    let quarantine_dir = resolved
        .config
        .storage
        .quarantine_dir
        .as_ref()
        .map_or_else(|| state_dir.join("quarantine"), PathBuf::from);
    StoragePaths {
        state_file: state_dir.join(STATE_FILE),
        quarantine_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_core::RiskLevel;
    use tollgate_telemetry::LogFormat;

    fn resolved(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            config,
            field_sources: tollgate_config::merge::FieldSources::new(),
            loaded_files: Vec::new(),
            home_dir: PathBuf::from("/home/op/.tollgate"),
        }
    }

    #[test]
    fn test_log_config_follows_section() {
        let mut config = Config::default();
        config.logging.format = "json".to_owned();
        config.logging.level = "warn".to_owned();

        let log = to_log_config(&config, false);
        assert_eq!(log.level, "warn");
        assert_eq!(log.format, LogFormat::Json);

        assert_eq!(to_log_config(&config, true).level, "debug");
    }

    #[test]
    fn test_default_mode_is_guided() {
        assert_eq!(
            to_autonomy_mode(&Config::default()).unwrap(),
            AutonomyMode::Guided
        );
    }

    #[test]
    fn test_extra_rules_reach_classifier() {
        let mut config = Config::default();
        config.classifier.extra_elevated_patterns =
            vec![r"\bterraform\s+apply\b".to_owned()];
        config.classifier.extra_sensitive_domains = vec!["Payroll.Corp".to_owned()];

        let classifier = to_classifier(&config).unwrap();
        let shell = classifier.classify(
            "shell_exec",
            &json!({"command": "terraform apply -auto-approve"}),
        );
        assert_eq!(shell.risk, RiskLevel::Elevated);
        let browse = classifier.classify(
            "browser_navigate",
            &json!({"url": "https://payroll.corp/run"}),
        );
        assert_eq!(browse.risk, RiskLevel::SensitiveDomain);
    }

    #[test]
    fn test_bad_rule_is_reported() {
        let mut config = Config::default();
        config.classifier.extra_exfil_patterns = vec!["(unclosed".to_owned()];
        assert!(to_classifier(&config).is_err());
    }

    #[test]
    fn test_storage_paths_default_under_home() {
        let paths = to_storage_paths(&resolved(Config::default()), None);
        assert_eq!(
            paths.state_file,
            PathBuf::from("/home/op/.tollgate/state/tollgate.json")
        );
        assert_eq!(
            paths.quarantine_dir,
            PathBuf::from("/home/op/.tollgate/state/quarantine")
        );
    }

    #[test]
    fn test_state_dir_override() {
        let paths = to_storage_paths(
            &resolved(Config::default()),
            Some(PathBuf::from("/tmp/tg")),
        );
        assert_eq!(paths.state_file, PathBuf::from("/tmp/tg/tollgate.json"));
        assert_eq!(paths.quarantine_dir, PathBuf::from("/tmp/tg/quarantine"));

        let mut config = Config::default();
        config.storage.quarantine_dir = Some("/srv/quarantine".to_owned());
        let paths = to_storage_paths(&resolved(config), Some(PathBuf::from("/tmp/tg")));
        assert_eq!(paths.quarantine_dir, PathBuf::from("/srv/quarantine"));
    }
}
