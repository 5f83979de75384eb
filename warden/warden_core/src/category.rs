//! Permission categories and their registry.
//!
//! A [`Category`] names one sensitive device capability. Every category has a
//! numeric code that is its persisted form. Codes are spaced so related
//! capabilities sit next to each other, and they must never be changed or
//! reused: stored states from earlier releases refer to them.
//!
//! # Examples
//!
//! ```
//! use warden_core::category::Category;
//! use std::str::FromStr;
//!
//! let category = Category::from_str("location-when-in-use").unwrap();
//! assert_eq!(category.code(), 3200);
//! assert_eq!(Category::try_from(3200).unwrap(), category);
//! assert!(!category.info().allows_repeated_prompting);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A sensitive device capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Step counting and motion activity queries.
    Activity,

    /// Health data. Not available on every device class.
    Health,

    /// Location at any time, including region and visit monitoring.
    /// Ask for `LocationWhenInUse` first when both are needed.
    LocationAlways,

    /// Location only while the app is visible.
    LocationWhenInUse,

    /// Microphone input.
    Microphone,

    /// Photo library.
    PhotoLibrary,

    /// Camera.
    PhotoCamera,

    /// Scheduling local notifications.
    NotificationLocal,

    /// User-facing remote notifications.
    NotificationRemote,

    /// Facebook accounts. Needs account options before it can be requested.
    SocialFacebook,

    /// Twitter accounts.
    SocialTwitter,

    /// Sina Weibo accounts.
    SocialSinaWeibo,

    /// Tencent Weibo accounts.
    SocialTencentWeibo,

    /// Contacts.
    AddressBook,

    /// Calendar events.
    Events,

    /// Reminders.
    Reminders,
}

/// Groups of categories served by the same capability requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFamily {
    Motion,
    Health,
    Location,
    Microphone,
    Photos,
    Camera,
    Notifications,
    SocialAccounts,
    Contacts,
    Calendar,
}

impl CategoryFamily {
    /// Every family, in catalogue order.
    pub const ALL: [CategoryFamily; 10] = [
        CategoryFamily::Motion,
        CategoryFamily::Health,
        CategoryFamily::Location,
        CategoryFamily::Microphone,
        CategoryFamily::Photos,
        CategoryFamily::Camera,
        CategoryFamily::Notifications,
        CategoryFamily::SocialAccounts,
        CategoryFamily::Contacts,
        CategoryFamily::Calendar,
    ];

    /// Stable name of this family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Motion => "motion",
            Self::Health => "health",
            Self::Location => "location",
            Self::Microphone => "microphone",
            Self::Photos => "photos",
            Self::Camera => "camera",
            Self::Notifications => "notifications",
            Self::SocialAccounts => "social_accounts",
            Self::Contacts => "contacts",
            Self::Calendar => "calendar",
        }
    }
}

impl fmt::Display for CategoryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which kind of preconfiguration object a category accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationKind {
    /// Notification presentation settings.
    Notifications,

    /// Key/value options handed to an account store.
    AccountOptions,
}

/// Immutable metadata of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    /// Human readable name.
    pub display_name: &'static str,

    /// Family whose requester serves this category.
    pub family: CategoryFamily,

    /// Whether the platform may prompt again after an answer.
    pub allows_repeated_prompting: bool,

    /// Whether a preconfiguration must be supplied before requesting.
    pub requires_preconfiguration: bool,

    /// Whether the status can be read without prompting.
    pub supports_silent_query: bool,

    /// Kind of preconfiguration accepted, if any.
    pub configuration: Option<ConfigurationKind>,
}

const fn info(
    display_name: &'static str,
    family: CategoryFamily,
    allows_repeated_prompting: bool,
    requires_preconfiguration: bool,
    supports_silent_query: bool,
    configuration: Option<ConfigurationKind>,
) -> CategoryInfo {
    CategoryInfo {
        display_name,
        family,
        allows_repeated_prompting,
        requires_preconfiguration,
        supports_silent_query,
        configuration,
    }
}

const ACTIVITY: CategoryInfo = info("Motion Activity", CategoryFamily::Motion, false, false, true, None);
// Health never reveals read authorization, and additional data types may be asked for later.
const HEALTH: CategoryInfo = info("Health", CategoryFamily::Health, true, false, false, None);
const LOCATION_ALWAYS: CategoryInfo = info("Location (Always)", CategoryFamily::Location, false, false, true, None);
const LOCATION_WHEN_IN_USE: CategoryInfo = info("Location (When In Use)", CategoryFamily::Location, false, false, true, None);
const MICROPHONE: CategoryInfo = info("Microphone", CategoryFamily::Microphone, false, false, true, None);
const PHOTO_LIBRARY: CategoryInfo = info("Photo Library", CategoryFamily::Photos, false, false, true, None);
const PHOTO_CAMERA: CategoryInfo = info("Camera", CategoryFamily::Camera, false, false, true, None);
const NOTIFICATION_LOCAL: CategoryInfo = info(
    "Local Notifications",
    CategoryFamily::Notifications,
    true,
    false,
    true,
    Some(ConfigurationKind::Notifications),
);
const NOTIFICATION_REMOTE: CategoryInfo = info(
    "Remote Notifications",
    CategoryFamily::Notifications,
    true,
    false,
    true,
    Some(ConfigurationKind::Notifications),
);
const SOCIAL_FACEBOOK: CategoryInfo = info(
    "Facebook",
    CategoryFamily::SocialAccounts,
    false,
    true,
    true,
    Some(ConfigurationKind::AccountOptions),
);
const SOCIAL_TWITTER: CategoryInfo = info(
    "Twitter",
    CategoryFamily::SocialAccounts,
    false,
    false,
    true,
    Some(ConfigurationKind::AccountOptions),
);
const SOCIAL_SINA_WEIBO: CategoryInfo = info(
    "Sina Weibo",
    CategoryFamily::SocialAccounts,
    false,
    false,
    true,
    Some(ConfigurationKind::AccountOptions),
);
const SOCIAL_TENCENT_WEIBO: CategoryInfo = info(
    "Tencent Weibo",
    CategoryFamily::SocialAccounts,
    false,
    false,
    true,
    Some(ConfigurationKind::AccountOptions),
);
const ADDRESS_BOOK: CategoryInfo = info("Contacts", CategoryFamily::Contacts, false, false, true, None);
const EVENTS: CategoryInfo = info("Calendar", CategoryFamily::Calendar, false, false, true, None);
const REMINDERS: CategoryInfo = info("Reminders", CategoryFamily::Calendar, false, false, true, None);

impl Category {
    /// Every category, in code order.
    pub const ALL: [Category; 16] = [
        Category::Activity,
        Category::Health,
        Category::LocationAlways,
        Category::LocationWhenInUse,
        Category::Microphone,
        Category::PhotoLibrary,
        Category::PhotoCamera,
        Category::NotificationLocal,
        Category::NotificationRemote,
        Category::SocialFacebook,
        Category::SocialTwitter,
        Category::SocialSinaWeibo,
        Category::SocialTencentWeibo,
        Category::AddressBook,
        Category::Events,
        Category::Reminders,
    ];

    /// Stable numeric code. Never change these values.
    pub fn code(&self) -> u32 {
        match self {
            Self::Activity => 1000,
            Self::Health => 2000,
            Self::LocationAlways => 3100,
            Self::LocationWhenInUse => 3200,
            Self::Microphone => 4000,
            Self::PhotoLibrary => 5000,
            Self::PhotoCamera => 5100,
            Self::NotificationLocal => 6100,
            Self::NotificationRemote => 6200,
            Self::SocialFacebook => 7100,
            Self::SocialTwitter => 7110,
            Self::SocialSinaWeibo => 7120,
            Self::SocialTencentWeibo => 7130,
            Self::AddressBook => 8100,
            Self::Events => 8200,
            Self::Reminders => 8250,
        }
    }

    /// Stable kebab-case name, mainly for logs and the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Health => "health",
            Self::LocationAlways => "location-always",
            Self::LocationWhenInUse => "location-when-in-use",
            Self::Microphone => "microphone",
            Self::PhotoLibrary => "photo-library",
            Self::PhotoCamera => "photo-camera",
            Self::NotificationLocal => "notification-local",
            Self::NotificationRemote => "notification-remote",
            Self::SocialFacebook => "social-facebook",
            Self::SocialTwitter => "social-twitter",
            Self::SocialSinaWeibo => "social-sina-weibo",
            Self::SocialTencentWeibo => "social-tencent-weibo",
            Self::AddressBook => "address-book",
            Self::Events => "events",
            Self::Reminders => "reminders",
        }
    }

    /// Static metadata for this category.
    pub fn info(&self) -> &'static CategoryInfo {
        match self {
            Self::Activity => &ACTIVITY,
            Self::Health => &HEALTH,
            Self::LocationAlways => &LOCATION_ALWAYS,
            Self::LocationWhenInUse => &LOCATION_WHEN_IN_USE,
            Self::Microphone => &MICROPHONE,
            Self::PhotoLibrary => &PHOTO_LIBRARY,
            Self::PhotoCamera => &PHOTO_CAMERA,
            Self::NotificationLocal => &NOTIFICATION_LOCAL,
            Self::NotificationRemote => &NOTIFICATION_REMOTE,
            Self::SocialFacebook => &SOCIAL_FACEBOOK,
            Self::SocialTwitter => &SOCIAL_TWITTER,
            Self::SocialSinaWeibo => &SOCIAL_SINA_WEIBO,
            Self::SocialTencentWeibo => &SOCIAL_TENCENT_WEIBO,
            Self::AddressBook => &ADDRESS_BOOK,
            Self::Events => &EVENTS,
            Self::Reminders => &REMINDERS,
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        self.info().display_name
    }

    /// Family whose requester serves this category.
    pub fn family(&self) -> CategoryFamily {
        self.info().family
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u32> for Category {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .ok_or_else(|| Error::UnknownCategory(code.to_string()))
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Parse a category from its code or its name. Names are
    /// case-insensitive and accept `_` in place of `-`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u32>() {
            return Category::try_from(code);
        }

        let normalized = trimmed.to_lowercase().replace('_', "-");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name() == normalized)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u32),
            Name(String),
        }

        let parsed = match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Category::try_from(code),
            Repr::Name(name) => Category::from_str(&name),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

/// The set of categories a broker instance manages.
///
/// Categories are declared once at startup. Looking up a category outside
/// the registered set is a programmer error and fails with
/// [`Error::UnknownCategory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: BTreeSet<Category>,
}

impl CategoryRegistry {
    /// A registry holding the whole catalogue.
    pub fn all() -> Self {
        Self {
            categories: Category::ALL.iter().copied().collect(),
        }
    }

    /// A registry holding only `categories`.
    pub fn with_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    /// Whether `category` is registered.
    pub fn contains(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Metadata for a registered category.
    pub fn lookup(&self, category: Category) -> Result<&'static CategoryInfo> {
        if self.contains(category) {
            Ok(category.info())
        } else {
            Err(Error::UnknownCategory(format!(
                "{} is not registered with this broker",
                category
            )))
        }
    }

    /// Registered categories in code order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.iter().copied()
    }

    /// Families needed to serve the registered categories.
    pub fn families(&self) -> BTreeSet<CategoryFamily> {
        self.categories.iter().map(|c| c.family()).collect()
    }

    /// Number of registered categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether no category is registered.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::all()
    }
}
