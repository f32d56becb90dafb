//! Configuration management for the document mirror.
//!
//! Parses `mirror.toml` configuration files with serde and provides
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
//! - `source.host`
//! - `output.dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the hosted service URL.
    pub host: Option<String>,
    /// Override the output directory.
    pub output_dir: Option<PathBuf>,
    /// Override the root directory name.
    pub repo_dir: Option<String>,
    /// Override the clean flag.
    pub clean: Option<bool>,
    /// Override draft retention.
    pub keep_drafts: Option<bool>,
    /// Override the worker pool size.
    pub concurrency: Option<usize>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mirror.toml";

/// Name of the metadata directory inside the output directory.
const META_DIR: &str = ".meta";

/// Root directory value that writes straight into the output directory.
const REPO_DIR_PASSTHROUGH: &str = ".";

const MAX_CONCURRENCY: usize = 256;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hosted service configuration.
    pub source: SourceConfig,
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Build configuration.
    pub build: BuildSettings,

    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Hosted service configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Canonical URL prefix of published documents.
    pub host: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: "https://www.yuque.com".to_owned(),
        }
    }
}

/// Raw output configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    repo_dir: Option<String>,
    clean: Option<bool>,
}

/// Resolved output configuration with absolute paths.
#[derive(Debug, Default)]
pub struct OutputConfig {
    /// Output root.
    pub dir: PathBuf,
    /// Root directory name override (`.` writes into the output root).
    pub repo_dir: Option<String>,
    /// Empty the output area before building.
    pub clean: bool,
}

impl OutputConfig {
    /// Metadata directory (`<dir>/.meta`).
    #[must_use]
    pub fn meta_dir(&self) -> PathBuf {
        self.dir.join(META_DIR)
    }
}

/// Build configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Worker pool size.
    pub concurrency: usize,
    /// Keep unlisted documents.
    pub keep_drafts: bool,
    /// Title of the container for unlisted documents.
    pub uncategorized_title: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            concurrency: 10,
            keep_drafts: false,
            uncategorized_title: "_Uncategorized".to_owned(),
        }
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
        /// Config field path (e.g., "`source.host`").
        field: String,
        /// Error message (e.g., "${`MIRROR_HOST`} not set").
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

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mirror.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated last.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the final configuration is invalid.
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
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.source.host.clone_from(host);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.output_resolved.dir.clone_from(output_dir);
        }
        if let Some(repo_dir) = &settings.repo_dir {
            self.output_resolved.repo_dir = Some(repo_dir.clone());
        }
        if let Some(clean) = settings.clean {
            self.output_resolved.clean = clean;
        }
        if let Some(keep_drafts) = settings.keep_drafts {
            self.build.keep_drafts = keep_drafts;
        }
        if let Some(concurrency) = settings.concurrency {
            self.build.concurrency = concurrency;
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
            source: SourceConfig::default(),
            output: OutputConfigRaw::default(),
            build: BuildSettings::default(),
            output_resolved: OutputConfig {
                dir: base.join("storage"),
                repo_dir: None,
                clean: false,
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

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically at the end of [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_source()?;
        self.validate_output()?;
        self.validate_build()?;
        Ok(())
    }

    fn validate_source(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.source.host, "source.host")?;
        require_http_url(&self.source.host, "source.host")?;
        Ok(())
    }

    fn validate_output(&self) -> Result<(), ConfigError> {
        if let Some(repo_dir) = &self.output_resolved.repo_dir {
            require_non_empty(repo_dir, "output.repo_dir")?;
            if repo_dir != REPO_DIR_PASSTHROUGH
                && (repo_dir.contains('/') || repo_dir.contains('\\'))
            {
                return Err(ConfigError::Validation(
                    "output.repo_dir must be a single directory name".to_owned(),
                ));
            }
        }
        Ok(())
    }

    fn validate_build(&self) -> Result<(), ConfigError> {
        let concurrency = self.build.concurrency;
        if concurrency == 0 {
            return Err(ConfigError::Validation(
                "build.concurrency must be greater than 0".to_owned(),
            ));
        }
        if concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Validation(format!(
                "build.concurrency cannot exceed {MAX_CONCURRENCY}"
            )));
        }
        require_non_empty(&self.build.uncategorized_title, "build.uncategorized_title")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.source.host = expand::expand_env(&self.source.host, "source.host")?;

        if let Some(ref dir) = self.output.dir {
            self.output.dir = Some(expand::expand_env(dir, "output.dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.output_resolved = OutputConfig {
            dir: config_dir.join(self.output.dir.as_deref().unwrap_or("storage")),
            repo_dir: self.output.repo_dir.clone(),
            clean: self.output.clean.unwrap_or(false),
        };
    }
}
