//! Layered configuration for Tollgate.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tollgate_config::Config;
//!
//! // defaults → system → user → workspace → env
//! let resolved = Config::load(Some(std::path::Path::new("."))).unwrap();
//! println!("default mode: {}", resolved.config.autonomy.default_mode);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Workspace** (`{workspace}/.tollgate/config.toml`), which can only
//!    *tighten* the autonomy mode and add classifier rules
//! 2. **User** (`~/.tollgate/config.toml`, or `$TOLLGATE_HOME/config.toml`)
//! 3. **System** (`/etc/tollgate/config.toml`)
//! 4. **Environment variables** (`TOLLGATE_MODE`, `TOLLGATE_LOG_LEVEL`,
//!    `TOLLGATE_STATE_DIR`), fallback only
//! 5. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other Tollgate crate. Conversion to domain types
//! happens in the CLI.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with precedence.
pub mod merge;
pub mod prelude;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(workspace_root: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(workspace_root, None)
    }

    /// Load configuration with an explicit Tollgate home directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        workspace_root: Option<&std::path::Path>,
        home_dir: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(workspace_root, Some(home_dir))
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
