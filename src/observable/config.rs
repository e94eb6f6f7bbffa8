use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::error::{ObservableError, ErrorCode};

/// What `subscribe` does when the subscriber is already on the topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse with `DuplicateSubscription`, state unchanged
    #[default]
    Reject,
    /// Append again; the subscriber is then notified once per entry
    Allow,
}

/// What happens to a topic entry once its last subscriber leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyTopicPolicy {
    #[default]
    Prune,
    Retain,
}

/// How `publish` reacts to a failing subscriber callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Skip the rest of the snapshot and surface the failure immediately
    Abort,
    /// Notify everyone, then report all failures together
    #[default]
    ContinueAndCollect,
    /// Notify everyone, log failures and report success
    LogAndContinue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub duplicate_subscribe_policy: DuplicatePolicy,
    pub empty_topic_policy: EmptyTopicPolicy,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on deliveries running at the same time
    pub max_in_flight: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ObservableError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ObservableError::new(ErrorCode::ConfigInvalid, format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ObservableError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ObservableError::new(ErrorCode::ConfigInvalid, format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ObservableError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ObservableError::new(ErrorCode::ConfigInvalid, format!("Failed to serialize to TOML: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| ObservableError::new(ErrorCode::ConfigInvalid, format!("Failed to write config file: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ObservableError> {
        if self.dispatch.max_in_flight == 0 {
            return Err(ObservableError::new(
                ErrorCode::ConfigInvalid,
                "dispatch.max_in_flight must be at least 1",
            ));
        }
        Ok(())
    }
}
