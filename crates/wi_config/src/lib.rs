//! wi_config - Configuration for WLAN Inventory
//!
//! Loads `wi.toml`, applies `WI_*` environment overrides and validates the
//! result. Every section is optional; missing values fall back to defaults.

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use wi_collect::executor::{DEFAULT_PROMPT_PATTERN, LoginCredentials, SshTarget};
use wi_collect::{SessionMode, ShapePolicy};

pub const CONFIG_FILE_NAME: &str = "wi.toml";
const APP_DIR: &str = "wlan_inventory";

pub const ENV_OUTPUT_DIR: &str = "WI_OUTPUT_DIR";
pub const ENV_COMMAND_TIMEOUT: &str = "WI_COMMAND_TIMEOUT_SECS";
pub const ENV_SHAPE_POLICY: &str = "WI_SHAPE_POLICY";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiConfig {
    pub global: GlobalConfig,
    pub session: SessionConfig,
    pub templates: TemplatesConfig,
    pub export: ExportConfig,
    pub controllers: Vec<ControllerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Directory for exported tables
    pub output_dir: PathBuf,
    /// strftime format used in output file names
    pub timestamp_format: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            timestamp_format: "%Y-%m-%d-%H-%M-%S".to_string(),
        }
    }
}

/// Working-mode commands, prompt and timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub setup_commands: Vec<String>,
    pub teardown_commands: Vec<String>,
    pub prompt_pattern: String,
    pub command_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub validate_os: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mode = SessionMode::aireos();
        Self {
            setup_commands: mode.setup_commands,
            teardown_commands: mode.teardown_commands,
            prompt_pattern: DEFAULT_PROMPT_PATTERN.to_string(),
            command_timeout_secs: 30,
            connect_timeout_secs: 10,
            validate_os: mode.validate_os,
        }
    }
}

impl SessionConfig {
    pub fn mode(&self) -> SessionMode {
        SessionMode {
            setup_commands: self.setup_commands.clone(),
            teardown_commands: self.teardown_commands.clone(),
            validate_os: self.validate_os,
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Template overrides; unset paths use the bundled templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub summary: Option<PathBuf>,
    pub detail: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Single ASCII character
    pub delimiter: String,
    pub shape_policy: ShapePolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            shape_policy: ShapePolicy::Strict,
        }
    }
}

impl ExportConfig {
    /// The delimiter as a byte; call after [`WiConfig::validate`]
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// One controller reachable over SSH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub user: String,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// Answer for the controller's own `User:` prompt
    #[serde(default)]
    pub login_user: Option<String>,
    /// Environment variable holding the `Password:` answer
    #[serde(default)]
    pub password_env: Option<String>,
}

impl ControllerConfig {
    /// Build the SSH target, reading the password from the environment
    pub fn ssh_target(&self) -> Result<SshTarget, ConfigError> {
        self.ssh_target_with(|key| std::env::var(key).ok())
    }

    pub fn ssh_target_with<F>(&self, lookup: F) -> Result<SshTarget, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let password = match &self.password_env {
            Some(var) => Some(lookup(var).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "controller '{}': environment variable {var} is not set",
                    self.name
                ))
            })?),
            None => None,
        };

        Ok(SshTarget {
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            key_path: self
                .key_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            login: LoginCredentials {
                user: self.login_user.clone(),
                password,
            },
        })
    }
}

impl WiConfig {
    /// Load from a specific file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from a file, then apply environment overrides and validate
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// First existing file from [`WiConfig::config_paths`], else defaults
    pub fn discover() -> Result<Self, ConfigError> {
        for path in Self::config_paths() {
            if path.is_file() {
                return Self::load(&path);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn discover_with_env() -> Result<Self, ConfigError> {
        let mut config = Self::discover()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Search paths, in order of precedence
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(APP_DIR).join(CONFIG_FILE_NAME));
        }
        paths
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `WI_*` overrides from an arbitrary lookup
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            debug!(output_dir = %dir, "Output directory from environment");
            self.global.output_dir = PathBuf::from(dir);
        }

        if let Some(secs) = lookup(ENV_COMMAND_TIMEOUT) {
            self.session.command_timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{ENV_COMMAND_TIMEOUT} must be a whole number of seconds, got '{secs}'"
                ))
            })?;
        }

        if let Some(policy) = lookup(ENV_SHAPE_POLICY) {
            self.export.shape_policy = policy.parse().map_err(ConfigError::ValidationError)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let delimiter = self.export.delimiter.as_bytes();
        if delimiter.len() != 1 || !delimiter[0].is_ascii() {
            return Err(ConfigError::ValidationError(format!(
                "export.delimiter must be a single ASCII character, got {:?}",
                self.export.delimiter
            )));
        }

        if self.session.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.command_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.session.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }

        regex::Regex::new(&self.session.prompt_pattern).map_err(|e| {
            ConfigError::ValidationError(format!("session.prompt_pattern is invalid: {e}"))
        })?;

        if StrftimeItems::new(&self.global.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::ValidationError(format!(
                "global.timestamp_format is invalid: {:?}",
                self.global.timestamp_format
            )));
        }

        let mut seen = HashSet::new();
        for controller in &self.controllers {
            if controller.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "controller name must not be empty".to_string(),
                ));
            }
            if !seen.insert(controller.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate controller name '{}'",
                    controller.name
                )));
            }
        }

        Ok(())
    }

    pub fn controller(&self, name: &str) -> Option<&ControllerConfig> {
        self.controllers.iter().find(|c| c.name == name)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Commented starter configuration
    pub fn generate_default_toml() -> String {
        format!(
            r#"# WLAN Inventory configuration

[global]
output_dir = "output"
timestamp_format = "%Y-%m-%d-%H-%M-%S"

[session]
setup_commands = ["config paging disable"]
teardown_commands = ["config paging enable"]
prompt_pattern = '{DEFAULT_PROMPT_PATTERN}'
command_timeout_secs = 30
connect_timeout_secs = 10
validate_os = true

[templates]
# summary = "templates/custom_summary.template"
# detail = "templates/custom_detail.template"

[export]
delimiter = ","
# strict drops rows whose width differs from the header; permissive keeps them
shape_policy = "strict"

# [[controllers]]
# name = "wlc-01"
# host = "10.0.0.10"
# port = 22
# user = "admin"
# key_path = "~/.ssh/id_ed25519"
# login_user = "admin"
# password_env = "WLC01_PASSWORD"
"#
        )
    }
}
