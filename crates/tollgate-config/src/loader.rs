//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge `/etc/tollgate/config.toml` (system)
//! 3. Merge `<home>/config.toml` (user; home is `TOLLGATE_HOME` or
//!    `~/.tollgate`)
//! 4. Merge `{workspace}/.tollgate/config.toml` (workspace) + restriction
//!    enforcement
//! 5. Apply env var fallbacks for unset fields
//! 6. Deserialize merged tree → `Config`
//! 7. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{HOME_VAR, apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{
    ConfigLayer, FieldSources, deep_merge_tracking, enforce_restrictions, record_leaves,
};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide config file.
const SYSTEM_CONFIG: &str = "/etc/tollgate/config.toml";

/// Name of the config file inside the home and workspace directories.
const CONFIG_FILE: &str = "config.toml";

/// Directory name used for the home directory and workspace overlays.
const DIR_NAME: &str = ".tollgate";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A merged, validated configuration and where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Which layer set each leaf field.
    pub field_sources: FieldSources,
    /// Config files that were found and merged, in order.
    pub loaded_files: Vec<String>,
    /// The Tollgate home directory used for user config and default paths.
    pub home_dir: PathBuf,
}

impl ResolvedConfig {
    /// Which layer set `field` (dotted path), if any.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }

    /// Directory holding the settings and ledger file.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.config
            .storage
            .state_dir
            .as_ref()
            .map_or_else(|| self.home_dir.join("state"), PathBuf::from)
    }

    /// Directory holding quarantined backups.
    #[must_use]
    pub fn quarantine_dir(&self) -> PathBuf {
        self.config
            .storage
            .quarantine_dir
            .as_ref()
            .map_or_else(|| self.state_dir().join("quarantine"), PathBuf::from)
    }
}

/// Files consulted for each layer. `None` skips the layer.
#[derive(Debug, Clone, Default)]
struct LayerPaths {
    system: Option<PathBuf>,
    user: Option<PathBuf>,
    workspace: Option<PathBuf>,
}

/// Load the configuration with layered file precedence.
///
/// `workspace_root` is the root of the current project; if `None`, the
/// workspace layer is skipped. `home_override` replaces the Tollgate home
/// directory (normally `TOLLGATE_HOME` or `~/.tollgate`).
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    let home_dir = match home_override {
        Some(h) => h.to_path_buf(),
        None => tollgate_home(&env_vars)?,
    };
    let paths = LayerPaths {
        system: Some(PathBuf::from(SYSTEM_CONFIG)),
        user: Some(home_dir.join(CONFIG_FILE)),
        workspace: workspace_root.map(|w| w.join(DIR_NAME).join(CONFIG_FILE)),
    };
    load_layers(&paths, home_dir, &env_vars)
}

fn load_layers(
    paths: &LayerPaths,
    home_dir: PathBuf,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    for (path, layer) in [
        (&paths.system, ConfigLayer::System),
        (&paths.user, ConfigLayer::User),
    ] {
        let Some(path) = path else { continue };
        if let Some(overlay) = try_load_file(path)? {
            deep_merge_tracking(&mut merged, &overlay, "", &layer, &mut field_sources);
            loaded_files.push(path.display().to_string());
            info!(path = %path.display(), layer = %layer, "loaded config");
        }
    }

    // The baseline for restriction enforcement is everything below the
    // workspace layer.
    if let Some(ws_path) = &paths.workspace
        && let Some(overlay) = try_load_file(ws_path)?
    {
        let baseline = merged.clone();
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Workspace,
            &mut field_sources,
        );
        enforce_restrictions(&mut merged, &baseline, &overlay);
        loaded_files.push(ws_path.display().to_string());
        info!(path = %ws_path.display(), "loaded workspace config");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
        home_dir,
    })
}

/// Load a config from a single file (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, &content)?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// The Tollgate home directory: `TOLLGATE_HOME` if set, else `~/.tollgate`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if no home directory can be found.
pub fn tollgate_home<S: std::hash::BuildHasher>(
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<PathBuf> {
    if let Some(home) = env_vars.get(HOME_VAR).filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(DIR_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

fn check_size(path: &Path, content: &str) -> ConfigResult<()> {
    let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }
    Ok(())
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    check_size(path, &content)?;

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}
