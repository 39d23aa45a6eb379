//! Configuration management for puml.
//!
//! Parses `puml.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. The same flat keys
//! can be supplied by a host as key/value properties via
//! [`Config::from_properties`].
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
//! This is how an `http_proxy` from the environment is opted into:
//! `proxy = "${http_proxy:-}"`.

mod expand;
mod kind;

pub use kind::{BackendKind, DiagramFormat};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "puml.toml";

/// Default PlantUML server base URI.
pub const DEFAULT_CLOUD_URI: &str = "https://www.plantuml.com/plantuml";

/// Default timeout for renderer subprocesses and HTTP fetches, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound for `timeout_secs`.
const MAX_TIMEOUT_SECS: u64 = 600;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override default output format.
    pub format: Option<DiagramFormat>,
    /// Override default backend.
    pub backend: Option<BackendKind>,
    /// Override cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Override web path that serves the cache directory.
    pub web_path: Option<String>,
    /// Override PlantUML server base URI.
    pub cloud_uri: Option<String>,
    /// Override debug flag.
    pub debug: Option<bool>,
}

/// Raw configuration as parsed from TOML or properties (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    format: Option<DiagramFormat>,
    backend: Option<BackendKind>,
    cache_dir: Option<String>,
    web_path: Option<String>,
    java: Option<String>,
    jar_file: Option<String>,
    cloud_uri: Option<String>,
    proxy: Option<String>,
    fetch_map: Option<bool>,
    debug: Option<bool>,
    timeout_secs: Option<u64>,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default output format when a request does not choose one.
    pub format: DiagramFormat,
    /// Default backend when a request does not choose one.
    pub backend: BackendKind,
    /// Directory holding rendered artifacts (the cache).
    pub cache_dir: PathBuf,
    /// Web-facing path under which `cache_dir` is served.
    pub web_path: String,
    /// Java executable used to launch the PlantUML jar.
    pub java: String,
    /// Path to the PlantUML jar.
    pub jar_file: PathBuf,
    /// PlantUML server base URI for the remote backend.
    pub cloud_uri: String,
    /// HTTP proxy for the remote backend. `None` means a direct connection.
    pub proxy: Option<String>,
    /// Whether the remote backend also fetches image-map data.
    pub fetch_map: bool,
    /// Keep failed render inputs and log renderer invocations.
    pub debug: bool,
    /// Bound on subprocess execution and HTTP fetches.
    pub timeout: Duration,
    /// Path to the config file (set after loading from a file).
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
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
        /// Config key (e.g., "proxy").
        field: String,
        /// Error message (e.g., "${`PROXY_HOST`} not set").
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

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Parse a boolean property value.
fn parse_bool(value: &str, field: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Validation(format!(
            "{field} must be a boolean, got: {value}"
        ))),
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `puml.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
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

    /// Build configuration from flat key/value properties supplied by a host.
    ///
    /// Recognized keys match the `puml.toml` keys. Unknown keys are ignored so
    /// that a host can pass its whole property bag. Relative paths are resolved
    /// against `base`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for unparsable or invalid values.
    pub fn from_properties<I, K, V>(base: &Path, properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = ConfigFile::default();
        for (key, value) in properties {
            let key = key.as_ref();
            let value = value.as_ref();
            match key {
                "format" => raw.format = Some(value.parse()?),
                "backend" => raw.backend = Some(value.parse()?),
                "cache_dir" => raw.cache_dir = Some(value.to_owned()),
                "web_path" => raw.web_path = Some(value.to_owned()),
                "java" => raw.java = Some(value.to_owned()),
                "jar_file" => raw.jar_file = Some(value.to_owned()),
                "cloud_uri" => raw.cloud_uri = Some(value.to_owned()),
                "proxy" => raw.proxy = Some(value.to_owned()),
                "fetch_map" => raw.fetch_map = Some(parse_bool(value, key)?),
                "debug" => raw.debug = Some(parse_bool(value, key)?),
                "timeout_secs" => {
                    let secs = value.trim().parse().map_err(|_| {
                        ConfigError::Validation(format!(
                            "timeout_secs must be a whole number of seconds, got: {value}"
                        ))
                    })?;
                    raw.timeout_secs = Some(secs);
                }
                _ => {}
            }
        }

        let config = Self::resolve(raw, base)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(format) = settings.format {
            self.format = format;
        }
        if let Some(backend) = settings.backend {
            self.backend = backend;
        }
        if let Some(cache_dir) = &settings.cache_dir {
            self.cache_dir.clone_from(cache_dir);
        }
        if let Some(web_path) = &settings.web_path {
            self.web_path.clone_from(web_path);
        }
        if let Some(cloud_uri) = &settings.cloud_uri {
            self.cloud_uri.clone_from(cloud_uri);
        }
        if let Some(debug) = settings.debug {
            self.debug = debug;
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
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            format: DiagramFormat::Png,
            backend: BackendKind::Local,
            cache_dir: base.join("images"),
            web_path: "/images".to_owned(),
            java: "java".to_owned(),
            jar_file: base.join("plantuml.jar"),
            cloud_uri: DEFAULT_CLOUD_URI.to_owned(),
            proxy: None,
            fetch_map: false,
            debug: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let raw: ConfigFile = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::resolve(raw, config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Expand environment variables and resolve relative paths against `base`.
    fn resolve(raw: ConfigFile, base: &Path) -> Result<Self, ConfigError> {
        let defaults = Self::default_with_base(base);
        let expand_opt = |value: Option<String>, field: &str| -> Result<Option<String>, ConfigError> {
            value.map(|v| expand::expand_env(&v, field)).transpose()
        };

        let cache_dir = expand_opt(raw.cache_dir, "cache_dir")?.map(|d| base.join(d));
        let jar_file = expand_opt(raw.jar_file, "jar_file")?.map(|j| base.join(j));
        let proxy = expand_opt(raw.proxy, "proxy")?.filter(|p| !p.trim().is_empty());

        Ok(Self {
            format: raw.format.unwrap_or(defaults.format),
            backend: raw.backend.unwrap_or(defaults.backend),
            cache_dir: cache_dir.unwrap_or(defaults.cache_dir),
            web_path: expand_opt(raw.web_path, "web_path")?.unwrap_or(defaults.web_path),
            java: expand_opt(raw.java, "java")?.unwrap_or(defaults.java),
            jar_file: jar_file.unwrap_or(defaults.jar_file),
            cloud_uri: expand_opt(raw.cloud_uri, "cloud_uri")?.unwrap_or(defaults.cloud_uri),
            proxy,
            fetch_map: raw.fetch_map.unwrap_or(defaults.fetch_map),
            debug: raw.debug.unwrap_or(defaults.debug),
            timeout: raw
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            config_path: None,
        })
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.java, "java")?;
        require_non_empty(&self.cloud_uri, "cloud_uri")?;
        require_http_url(&self.cloud_uri, "cloud_uri")?;

        let secs = self.timeout.as_secs();
        if secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "timeout_secs cannot exceed {MAX_TIMEOUT_SECS}"
            )));
        }

        Ok(())
    }
}
