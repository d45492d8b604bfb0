//! Configuration loading, validation, and management for PairAdmin.
//!
//! Loads configuration from a TOML file supplied by the caller. The
//! security core never reads environment variables; every setting that
//! matters arrives through [`AppConfig`] at construction time.

use pairadmin_core::{PrivilegeLevel, RedactionStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Application directory name under the platform data directory.
pub const APP_DIR_NAME: &str = "pairadmin";

/// File name of the JSON-Lines audit log.
pub const AUDIT_LOG_FILE: &str = "audit.jsonl";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Command authorization policy
    #[serde(default)]
    pub security: SecurityPolicy,

    /// Audit trail settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// Sensitive-data filter settings
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Which command list is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Every non-empty command is allowed
    Disabled,
    /// Allowed unless blacklisted or matching a dangerous signature
    #[default]
    Blacklist,
    /// Allowed only if whitelisted
    Whitelist,
}

/// Declarative command authorization policy.
///
/// Only the list matching [`SecurityPolicy::mode`] is consulted; changing
/// the mode never touches either list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default)]
    pub mode: ValidationMode,

    #[serde(default = "default_blacklist")]
    pub blacklisted_commands: BTreeSet<String>,

    #[serde(default = "default_whitelist")]
    pub whitelisted_commands: BTreeSet<String>,

    /// Maximum command length in characters
    #[serde(default = "default_max_command_length")]
    pub max_command_length: usize,

    #[serde(default = "default_true")]
    pub filter_sensitive_data: bool,

    #[serde(default = "default_true")]
    pub block_dangerous_commands: bool,

    #[serde(default = "default_true")]
    pub require_confirmation_for_destructive: bool,

    /// Leading command token -> privilege it needs
    #[serde(default = "default_privilege_requirements")]
    pub command_privilege_requirements: BTreeMap<String, PrivilegeLevel>,
}

fn default_true() -> bool {
    true
}
fn default_max_command_length() -> usize {
    4096
}

fn default_blacklist() -> BTreeSet<String> {
    ["mkfs", "fdisk", "shutdown", "reboot", "halt", "poweroff", "init"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_whitelist() -> BTreeSet<String> {
    [
        "ls", "cat", "grep", "pwd", "echo", "head", "tail", "less", "df", "du", "ps", "top",
        "whoami", "uname", "hostname", "uptime", "free", "journalctl",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_privilege_requirements() -> BTreeMap<String, PrivilegeLevel> {
    [
        ("systemctl", PrivilegeLevel::Elevated),
        ("apt", PrivilegeLevel::Elevated),
        ("apt-get", PrivilegeLevel::Elevated),
        ("dnf", PrivilegeLevel::Elevated),
        ("yum", PrivilegeLevel::Elevated),
        ("mount", PrivilegeLevel::Elevated),
        ("iptables", PrivilegeLevel::Root),
        ("useradd", PrivilegeLevel::Root),
        ("userdel", PrivilegeLevel::Root),
        ("visudo", PrivilegeLevel::Root),
    ]
    .into_iter()
    .map(|(cmd, level)| (cmd.to_string(), level))
    .collect()
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            blacklisted_commands: default_blacklist(),
            whitelisted_commands: default_whitelist(),
            command_privilege_requirements: default_privilege_requirements(),
            max_command_length: default_max_command_length(),
            filter_sensitive_data: true,
            block_dangerous_commands: true,
            require_confirmation_for_destructive: true,
        }
    }
}

impl SecurityPolicy {
    /// Validate the policy. An unusable policy is rejected rather than
    /// silently weakening protection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_command_length == 0 {
            return Err(ConfigError::ValidationError(
                "security.max_command_length must be greater than zero".into(),
            ));
        }
        if let Some(empty) = self
            .blacklisted_commands
            .iter()
            .chain(self.whitelisted_commands.iter())
            .find(|c| c.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "security command lists must not contain blank entries (got {empty:?})"
            )));
        }
        if self.mode == ValidationMode::Whitelist && self.whitelisted_commands.is_empty() {
            tracing::warn!("Whitelist mode with an empty whitelist: every command will be denied");
        }
        Ok(())
    }

    /// Case-insensitive blacklist lookup for a single command token.
    pub fn blacklist_contains(&self, token: &str) -> bool {
        self.blacklisted_commands
            .iter()
            .any(|c| c.eq_ignore_ascii_case(token))
    }

    /// Case-insensitive whitelist lookup for a single command token.
    pub fn whitelist_contains(&self, token: &str) -> bool {
        self.whitelisted_commands
            .iter()
            .any(|c| c.eq_ignore_ascii_case(token))
    }

    /// Privilege required by a command token; unknown tokens need
    /// [`PrivilegeLevel::Standard`].
    pub fn required_privilege(&self, token: &str) -> PrivilegeLevel {
        self.command_privilege_requirements
            .iter()
            .find(|(cmd, _)| cmd.eq_ignore_ascii_case(token))
            .map(|(_, level)| *level)
            .unwrap_or_default()
    }
}

/// Audit trail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Override for the log file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Maximum number of entries kept in memory
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Capacity of the queue feeding the persistence worker
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_entries() -> usize {
    10_000
}
fn default_channel_capacity() -> usize {
    1024
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            max_entries: default_max_entries(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl AuditConfig {
    /// Audit config writing to an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// The log file path: the override if set, otherwise
    /// `<data dir>/pairadmin/audit.jsonl`.
    pub fn resolved_log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| AppConfig::data_dir().join(AUDIT_LOG_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "audit.max_entries must be greater than zero".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "audit.channel_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Sensitive-data filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Seed the built-in pattern catalog before custom patterns
    #[serde(default = "default_true")]
    pub use_default_patterns: bool,

    /// Built-in patterns to switch off, by name
    #[serde(default)]
    pub disabled_patterns: Vec<String>,

    /// Custom patterns, applied after the built-in ones in listed order
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            use_default_patterns: true,
            disabled_patterns: Vec::new(),
            patterns: Vec::new(),
        }
    }
}

/// How a custom pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// `value` is a regular expression
    Regex,
    /// `value` is a literal, matched case-insensitively
    Keyword,
}

/// A user-defined redaction pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub kind: PatternKind,
    pub value: String,
    #[serde(default)]
    pub strategy: RedactionStrategy,
    /// Leading characters left visible under `mask`
    #[serde(default)]
    pub preserve_length: usize,
    /// Replacement literal under `placeholder`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl AppConfig {
    /// Load configuration from a specific file path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Per-application data directory.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    /// Default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.security.validate()?;
        self.audit.validate()?;

        for pattern in &self.filter.patterns {
            if pattern.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "filter pattern name cannot be empty".into(),
                ));
            }
            if pattern.value.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "filter pattern '{}' has an empty value",
                    pattern.name
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {}: {reason}", path.display())]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {}: {reason}", path.display())]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for pairadmin_core::Error {
    fn from(err: ConfigError) -> Self {
        pairadmin_core::Error::Config {
            message: err.to_string(),
        }
    }
}
