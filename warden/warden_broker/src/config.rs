//! Broker configuration.
//!
//! Loaded from a TOML file; every key is optional:
//!
//! ```toml
//! platform_timeout_ms = 30000
//! store_path = "/var/lib/app/permissions.json"
//! log_level = "debug"
//! categories = ["location-when-in-use", "location-always", 6100]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use warden_core::{Category, CategoryRegistry, ConfigError, LogLevel};

/// Broker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Bounded wait for a requester call, in milliseconds
    #[serde(default = "default_platform_timeout_ms")]
    pub platform_timeout_ms: u64,

    /// JSON status file; `None` keeps statuses in memory only
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Log level for front ends that install a subscriber
    #[serde(default)]
    pub log_level: LogLevel,

    /// Registered categories; `None` registers the whole catalogue
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
}

fn default_platform_timeout_ms() -> u64 {
    60_000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            platform_timeout_ms: default_platform_timeout_ms(),
            store_path: None,
            log_level: LogLevel::default(),
            categories: None,
        }
    }
}

impl BrokerConfig {
    /// Load and validate a configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        let config = Self::from_toml(&contents)?;
        info!(path = %path.display(), "loaded broker configuration");
        Ok(config)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.platform_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "platform_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if let Some(categories) = &self.categories {
            if categories.is_empty() {
                return Err(ConfigError::Invalid(
                    "categories must not be empty when given".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Set the platform timeout, builder style.
    pub fn with_platform_timeout(mut self, timeout: Duration) -> Self {
        self.platform_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    /// Set the registered categories, builder style.
    pub fn with_categories<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        self.categories = Some(categories.into_iter().collect());
        self
    }

    /// The platform timeout as a duration.
    pub fn platform_timeout(&self) -> Duration {
        Duration::from_millis(self.platform_timeout_ms)
    }

    /// The registry described by this configuration.
    pub fn registry(&self) -> CategoryRegistry {
        match &self.categories {
            Some(categories) => CategoryRegistry::with_categories(categories.iter().copied()),
            None => CategoryRegistry::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::from_toml("").unwrap();
        assert_eq!(config, BrokerConfig::default());
        assert_eq!(config.platform_timeout(), Duration::from_secs(60));
        assert_eq!(config.registry().len(), Category::ALL.len());
    }

    #[test]
    fn test_full_file() {
        let config = BrokerConfig::from_toml(
            r#"
            platform_timeout_ms = 1500
            store_path = "statuses.json"
            log_level = "debug"
            categories = ["location-when-in-use", 3100, "notification_local"]
            "#,
        )
        .unwrap();

        assert_eq!(config.platform_timeout(), Duration::from_millis(1500));
        assert_eq!(config.store_path, Some(PathBuf::from("statuses.json")));
        assert_eq!(config.log_level, LogLevel::Debug);

        let registry = config.registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(Category::LocationAlways));
        assert!(registry.contains(Category::NotificationLocal));
        assert!(!registry.contains(Category::Microphone));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            BrokerConfig::from_toml("platform_timeout_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BrokerConfig::from_toml("categories = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BrokerConfig::from_toml("categories = [\"teleport\"]"),
            Err(ConfigError::ParseFailed(_))
        ));
        assert!(matches!(
            BrokerConfig::from_toml("colour = \"blue\""),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        assert!(matches!(
            BrokerConfig::from_file("/definitely/not/here.toml").await,
            Err(ConfigError::LoadFailed(_))
        ));
    }
}
