//! Capability-specific configuration handed to a requester.
//!
//! Some categories need more than "ask the user": notifications are requested
//! for a set of presentation types, and account stores take an options map
//! (for instance an application identifier). These objects are validated
//! against the registry metadata, never by per-category branching.

use crate::category::{Category, ConfigurationKind};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Notification presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Show alerts
    pub alert: bool,

    /// Update the app badge
    pub badge: bool,

    /// Play sounds
    pub sound: bool,
}

impl NotificationSettings {
    /// Alerts only. Used when notifications are requested without settings.
    pub fn alert_only() -> Self {
        Self {
            alert: true,
            badge: false,
            sound: false,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self::alert_only()
    }
}

/// Configuration supplied before a category is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preconfiguration {
    /// Settings for notification categories.
    Notifications(NotificationSettings),

    /// Options for account store categories.
    AccountOptions {
        /// Option key/value pairs
        options: BTreeMap<String, String>,
    },
}

impl Preconfiguration {
    /// Build account options from key/value pairs.
    pub fn account_options<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::AccountOptions {
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The kind of this configuration.
    pub fn kind(&self) -> ConfigurationKind {
        match self {
            Self::Notifications(_) => ConfigurationKind::Notifications,
            Self::AccountOptions { .. } => ConfigurationKind::AccountOptions,
        }
    }

    /// Check that this configuration fits `category`.
    pub fn validate_for(&self, category: Category) -> Result<()> {
        let accepted = category.info().configuration;
        if accepted != Some(self.kind()) {
            return Err(Error::InvalidConfiguration {
                category,
                reason: match accepted {
                    Some(kind) => format!("expected {:?} configuration, got {:?}", kind, self.kind()),
                    None => "category does not accept configuration".to_string(),
                },
            });
        }

        if let Self::AccountOptions { options } = self {
            if category.info().requires_preconfiguration && options.is_empty() {
                return Err(Error::InvalidConfiguration {
                    category,
                    reason: "account options must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// The configuration to use when none was supplied, if the category has one.
    pub fn default_for(category: Category) -> Option<Self> {
        match category.info().configuration {
            Some(ConfigurationKind::Notifications) => {
                Some(Self::Notifications(NotificationSettings::alert_only()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_kind() {
        let settings = Preconfiguration::Notifications(NotificationSettings::default());
        assert!(settings.validate_for(Category::NotificationRemote).is_ok());
        assert!(matches!(
            settings.validate_for(Category::SocialTwitter),
            Err(Error::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            settings.validate_for(Category::Microphone),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_required_options_must_not_be_empty() {
        let empty = Preconfiguration::account_options(Vec::<(String, String)>::new());
        assert!(empty.validate_for(Category::SocialFacebook).is_err());
        assert!(empty.validate_for(Category::SocialTwitter).is_ok());

        let options = Preconfiguration::account_options([("app_id", "12345")]);
        assert!(options.validate_for(Category::SocialFacebook).is_ok());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            Preconfiguration::default_for(Category::NotificationLocal),
            Some(Preconfiguration::Notifications(NotificationSettings::alert_only()))
        );
        assert_eq!(Preconfiguration::default_for(Category::SocialFacebook), None);
        assert_eq!(Preconfiguration::default_for(Category::Health), None);
    }
}
