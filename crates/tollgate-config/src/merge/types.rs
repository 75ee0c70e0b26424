use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// System-wide configuration (`/etc/tollgate/config.toml`).
    System,
    /// User-level configuration (`~/.tollgate/config.toml`).
    User,
    /// Workspace-level configuration (`{workspace}/.tollgate/config.toml`).
    Workspace,
    /// Environment variable fallback.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system (/etc/tollgate/config.toml)"),
            Self::User => write!(f, "user (~/.tollgate/config.toml)"),
            Self::Workspace => write!(f, "workspace (.tollgate/config.toml)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;
