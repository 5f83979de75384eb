//! # Warden Core
//!
//! `warden_core` holds the vocabulary of the Warden permission broker: the
//! closed catalogue of permission categories, the state a category can be in,
//! the configuration objects some categories need before they can be
//! requested, and the error types shared by every crate in the workspace.
//!
//! ## Core Principles
//!
//! 1. **Stable identifiers**: every [`Category`] has a numeric code that is
//!    its persisted form. Codes are never renumbered or reused.
//!
//! 2. **Answers are sticky**: once the platform answered for a one-shot
//!    category, that answer is final for the broker. Only categories whose
//!    metadata allows repeated prompting go back to `Pending`.
//!
//! 3. **Failures are contained**: a failed request becomes a `Denied` state
//!    with a [`Diagnostic`], never an error that aborts unrelated work.
//!
//! ## Crate Structure
//!
//! - **category**: categories, their metadata and the registry
//! - **state**: statuses, permission states and resolutions
//! - **configuration**: per-category preconfiguration objects
//! - **error**: error types and diagnostics
//! - **id**: strongly-typed identifiers
//! - **utils**: log level vocabulary

pub mod category;
pub mod configuration;
pub mod error;
pub mod id;
pub mod state;
pub mod utils;

pub use category::{Category, CategoryFamily, CategoryInfo, CategoryRegistry, ConfigurationKind};
pub use configuration::{NotificationSettings, Preconfiguration};
pub use error::{ConfigError, Diagnostic, Error, Result, StoreError};
pub use id::{SessionId, SubscriptionId};
pub use state::{PermissionState, Resolution, Status};
pub use utils::LogLevel;
