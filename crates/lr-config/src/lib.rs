//! Configuration management for lr.
//!
//! Parses `lr.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `watch.root`

mod expand;

use lr_watch::DEFAULT_IGNORE_PATTERNS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override watched root directory.
    pub root: Option<PathBuf>,
    /// Override debounce window.
    pub debounce_ms: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "lr.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Watch configuration (root is a relative string from TOML).
    watch: WatchConfigRaw,
    /// Live reload configuration.
    pub live_reload: LiveReloadConfig,

    /// Resolved watch configuration (set after loading).
    #[serde(skip)]
    pub watch_resolved: WatchConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
        }
    }
}

/// Raw watch configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WatchConfigRaw {
    root: Option<String>,
    ignore: Option<Vec<String>>,
}

/// Resolved watch configuration with an absolute root.
#[derive(Debug, Default)]
pub struct WatchConfig {
    /// Directory to watch and serve.
    pub root: PathBuf,
    /// Glob patterns (relative to `root`) whose changes are ignored.
    pub ignore: Vec<String>,
}

/// Live reload configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Path of the WebSocket upgrade endpoint.
    pub endpoint: String,
    /// Quiet window collapsing bursts of changes, in milliseconds.
    pub debounce_ms: u64,
    /// Deadline for writing a reload frame to one client, in milliseconds.
    pub write_timeout_ms: u64,
    /// Pending reload signals buffered per client before it is dropped.
    pub send_buffer: usize,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            endpoint: "/reload".to_owned(),
            debounce_ms: 100,
            write_timeout_ms: 5000,
            send_buffer: 8,
        }
    }
}

/// Path the live reload client script is served from.
///
/// Reserved: the upgrade endpoint may not take it.
pub const CLIENT_SCRIPT_PATH: &str = "/lr-client.js";

/// Default ignore patterns, shared with the watcher.
fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS
        .iter()
        .map(|p| (*p).to_owned())
        .collect()
}

/// Check that `endpoint` can be mounted as the live reload route.
///
/// The path must be absolute, not `/`, not the client script path, and free
/// of route capture syntax (`:`, `*`, `{`, `}`).
///
/// # Errors
///
/// Returns `ConfigError::Validation` naming `live_reload.endpoint`.
pub fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| {
        Err(ConfigError::Validation(format!(
            "live_reload.endpoint {reason}, got {endpoint:?}"
        )))
    };

    if !endpoint.starts_with('/') || endpoint.len() < 2 {
        return invalid("must be an absolute path other than \"/\"");
    }
    if endpoint == CLIENT_SCRIPT_PATH {
        return invalid("is reserved for the client script");
    }
    if endpoint.contains([':', '*', '{', '}']) {
        return invalid("cannot contain ':', '*', '{' or '}'");
    }
    Ok(())
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`LR_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `lr.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(root) = &settings.root {
            self.watch_resolved.root.clone_from(root);
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.live_reload.debounce_ms = debounce_ms;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            watch: WatchConfigRaw::default(),
            live_reload: LiveReloadConfig::default(),
            watch_resolved: WatchConfig {
                root: base.to_path_buf(),
                ignore: default_ignore(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_watch()?;
        self.validate_live_reload()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 asks the OS for a random port, which a browser can't guess
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate watch configuration.
    fn validate_watch(&self) -> Result<(), ConfigError> {
        if self.watch_resolved.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "watch.root cannot be empty".to_owned(),
            ));
        }

        for pattern in &self.watch_resolved.ignore {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("watch.ignore: invalid pattern {pattern:?}: {e}"))
            })?;
        }

        Ok(())
    }

    /// Validate live reload configuration.
    fn validate_live_reload(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.live_reload.endpoint)?;
        if self.live_reload.write_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "live_reload.write_timeout_ms must be greater than 0".to_owned(),
            ));
        }
        if self.live_reload.send_buffer == 0 {
            return Err(ConfigError::Validation(
                "live_reload.send_buffer must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref root) = self.watch.root {
            self.watch.root = Some(expand::expand_env(root, "watch.root")?);
        }

        Ok(())
    }

    /// Resolve the watch root against the config file directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.watch_resolved = WatchConfig {
            root: config_dir.join(self.watch.root.as_deref().unwrap_or(".")),
            ignore: self.watch.ignore.clone().unwrap_or_else(default_ignore),
        };
    }
}
