//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.navstack/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::controller::RetainViewMode;
use crate::core::navigator::{ChildBackPolicy, NavigatorConfig};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NavstackConfig {
    #[serde(default)]
    pub navigator: NavigatorSection,
    #[serde(default)]
    pub demo: DemoSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NavigatorSection {
    pub child_back_policy: Option<ChildBackPolicy>,
    pub default_retain_view_mode: Option<RetainViewMode>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DemoSection {
    pub animation_ms: Option<u64>,
    pub state_file: Option<String>,
    pub restore_on_start: Option<bool>,
    pub log_file: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_ANIMATION_MS: u64 = 250;
pub const DEFAULT_STATE_FILE: &str = "state.json";
pub const DEFAULT_LOG_FILE: &str = "navstack.log";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub navigator: NavigatorConfig,
    pub default_retain_view_mode: RetainViewMode,
    pub animation_ms: u64,
    pub state_file: PathBuf,
    pub restore_on_start: bool,
    pub log_file: PathBuf,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.navstack/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".navstack"))
}

/// Returns the path to `~/.navstack/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.navstack/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `NavstackConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<NavstackConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(NavstackConfig::default());
        }
    };
    load_config_from(&path)
}

/// Same as `load_config` for an explicit path.
pub fn load_config_from(path: &Path) -> Result<NavstackConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(NavstackConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: NavstackConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# navstack configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [navigator]
# child_back_policy = "most_recently_active"   # or "registration_order"
# default_retain_view_mode = "release_detach"  # or "retain_detach"

# [demo]
# animation_ms = 250                 # Or NAVSTACK_ANIMATION_MS, or --animation-ms
# state_file = "state.json"          # Relative to ~/.navstack/
# restore_on_start = true            # --fresh skips the saved state
# log_file = "navstack.log"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_animation_ms` and `cli_fresh` come from CLI flags.
pub fn resolve(
    config: &NavstackConfig,
    cli_animation_ms: Option<u64>,
    cli_fresh: bool,
) -> ResolvedConfig {
    // Back policy: env → config → default
    let child_back_policy = env_parse::<ChildBackPolicy>("NAVSTACK_CHILD_BACK_POLICY")
        .or(config.navigator.child_back_policy)
        .unwrap_or_default();

    // Animation: CLI → env → config → default
    let animation_ms = cli_animation_ms
        .or_else(|| {
            std::env::var("NAVSTACK_ANIMATION_MS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
        })
        .or(config.demo.animation_ms)
        .unwrap_or(DEFAULT_ANIMATION_MS);

    // State file: env → config → default, relative names land in ~/.navstack/
    let state_file = std::env::var("NAVSTACK_STATE_FILE")
        .ok()
        .or_else(|| config.demo.state_file.clone())
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());

    let log_file = config
        .demo
        .log_file
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

    ResolvedConfig {
        navigator: NavigatorConfig { child_back_policy },
        default_retain_view_mode: config.navigator.default_retain_view_mode.unwrap_or_default(),
        animation_ms,
        state_file: in_config_dir(&state_file),
        restore_on_start: !cli_fresh && config.demo.restore_on_start.unwrap_or(true),
        log_file: PathBuf::from(log_file),
    }
}

/// Parses an env var holding a snake_case enum name, e.g. `registration_order`.
fn env_parse<T: for<'de> Deserialize<'de>>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match serde_json::from_value(serde_json::Value::String(raw.trim().to_string())) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}: {}", name, e);
            None
        }
    }
}

fn in_config_dir(name: &str) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    match config_dir() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_empty() {
        let config = NavstackConfig::default();
        assert!(config.navigator.child_back_policy.is_none());
        assert!(config.demo.animation_ms.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let config = NavstackConfig::default();
        let resolved = resolve(&config, None, false);
        assert_eq!(resolved.navigator, NavigatorConfig::default());
        assert_eq!(resolved.default_retain_view_mode, RetainViewMode::ReleaseDetach);
        assert!(resolved.restore_on_start);
        assert!(resolved.state_file.ends_with(DEFAULT_STATE_FILE));
        assert_eq!(resolved.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = NavstackConfig {
            navigator: NavigatorSection {
                child_back_policy: Some(ChildBackPolicy::RegistrationOrder),
                default_retain_view_mode: Some(RetainViewMode::RetainDetach),
            },
            demo: DemoSection {
                restore_on_start: Some(false),
                state_file: Some("/tmp/navstack-state.json".to_string()),
                ..Default::default()
            },
        };
        let resolved = resolve(&config, None, false);
        assert_eq!(resolved.navigator.child_back_policy, ChildBackPolicy::RegistrationOrder);
        assert_eq!(resolved.default_retain_view_mode, RetainViewMode::RetainDetach);
        assert!(!resolved.restore_on_start);
        assert_eq!(resolved.state_file, PathBuf::from("/tmp/navstack-state.json"));
    }

    #[test]
    fn test_resolve_cli_wins() {
        let config = NavstackConfig {
            demo: DemoSection {
                animation_ms: Some(900),
                restore_on_start: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve(&config, Some(0), true);
        assert_eq!(resolved.animation_ms, 0);
        assert!(!resolved.restore_on_start);
    }

    #[test]
    fn test_toml_parses_all_sections() {
        let toml_str = r#"
[navigator]
child_back_policy = "registration_order"
default_retain_view_mode = "retain_detach"

[demo]
animation_ms = 120
state_file = "other.json"
restore_on_start = false
log_file = "/var/log/navstack.log"
"#;
        let config: NavstackConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.navigator.child_back_policy,
            Some(ChildBackPolicy::RegistrationOrder)
        );
        assert_eq!(
            config.navigator.default_retain_view_mode,
            Some(RetainViewMode::RetainDetach)
        );
        assert_eq!(config.demo.animation_ms, Some(120));
        assert_eq!(config.demo.state_file.as_deref(), Some("other.json"));
        assert_eq!(config.demo.restore_on_start, Some(false));
    }

    #[test]
    fn test_sparse_toml_parses() {
        let toml_str = r#"
[demo]
animation_ms = 0
"#;
        let config: NavstackConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.demo.animation_ms, Some(0));
        assert!(config.navigator.child_back_policy.is_none());
        assert!(config.demo.state_file.is_none());
    }

    #[test]
    fn test_unknown_policy_is_a_parse_error() {
        let toml_str = r#"
[navigator]
child_back_policy = "alphabetical"
"#;
        assert!(toml::from_str::<NavstackConfig>(toml_str).is_err());
    }

    #[test]
    fn test_missing_file_generates_commented_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = load_config_from(&path).unwrap();
        assert!(config.navigator.child_back_policy.is_none());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# [navigator]"));
        // Everything is commented out, so it parses back to the defaults.
        let reparsed: NavstackConfig = toml::from_str(&written).unwrap();
        assert!(reparsed.demo.animation_ms.is_none());
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[demo\nanimation_ms = ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
