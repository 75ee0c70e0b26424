//! Configuration types for Tollgate.
//!
//! These types mirror domain values as plain strings and numbers so this
//! crate stays free of internal dependencies. Every struct implements
//! [`Default`], so a bare `[section]` header yields a working configuration.

use serde::{Deserialize, Serialize};

/// Autonomy modes from strictest to most permissive.
pub const AUTONOMY_MODES: [&str; 3] = ["safe", "guided", "unrestricted"];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default autonomy mode and approval request lifetime.
    pub autonomy: AutonomySection,
    /// Extra classifier rules appended to the built-in tables.
    pub classifier: ClassifierSection,
    /// Where settings, the ledger and backups are kept.
    pub storage: StorageSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// AutonomySection
// ---------------------------------------------------------------------------

/// Autonomy policy defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomySection {
    /// Mode used until one is persisted: `"unrestricted"`, `"guided"` or
    /// `"safe"`.
    pub default_mode: String,
    /// Seconds an approval request stays answerable before it is denied.
    pub request_ttl_secs: u64,
}

impl Default for AutonomySection {
    fn default() -> Self {
        Self {
            default_mode: "guided".to_owned(),
            request_ttl_secs: 90,
        }
    }
}

// ---------------------------------------------------------------------------
// ClassifierSection
// ---------------------------------------------------------------------------

/// Additional classifier rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// Regexes matched against lowercased shell commands; a match is ELEVATED.
    pub extra_elevated_patterns: Vec<String>,
    /// Regexes matched against lowercased shell commands; a match is EXFIL.
    pub extra_exfil_patterns: Vec<String>,
    /// Substrings matched against lowercased browser URLs.
    pub extra_sensitive_domains: Vec<String>,
}

impl ClassifierSection {
    /// Whether no extra rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extra_elevated_patterns.is_empty()
            && self.extra_exfil_patterns.is_empty()
            && self.extra_sensitive_domains.is_empty()
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// State and backup locations. Unset paths are derived from the Tollgate
/// home directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory holding the settings and ledger file.
    pub state_dir: Option<String>,
    /// Directory holding quarantined backups.
    pub quarantine_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["tollgate_executor=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
