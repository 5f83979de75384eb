//! Permission state of a single category.

use crate::category::{Category, CategoryInfo};
use crate::error::{Diagnostic, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization status of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The user has not been asked yet.
    NotDetermined,

    /// A platform request is in flight. Never persisted, never a final answer.
    Pending,

    /// The user granted access.
    Authorized,

    /// The user denied access, or the request failed (see [`Diagnostic`]).
    Denied,

    /// Blocked by policy outside the user's control.
    Restricted,

    /// The capability does not exist on this device or OS version.
    Unavailable,
}

impl Status {
    /// Get the name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDetermined => "not_determined",
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Denied => "denied",
            Self::Restricted => "restricted",
            Self::Unavailable => "unavailable",
        }
    }

    /// Whether this status is an answer (anything but `NotDetermined` and `Pending`).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotDetermined | Self::Pending)
    }

    /// Whether this status can never change again.
    pub fn is_sink(&self) -> bool {
        matches!(self, Self::Restricted | Self::Unavailable)
    }

    /// Whether this status may be written to a store.
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check whether moving from `self` to `next` is legal for a category
    /// with the given metadata.
    ///
    /// Staying in the same status is always legal. Sinks never leave.
    /// Answers go back to `Pending` only for categories that allow repeated
    /// prompting, and may flip between `Authorized` and `Denied` when a
    /// silent re-query reports a change made outside the app.
    pub fn can_transition_to(&self, next: Status, info: &CategoryInfo) -> bool {
        use Status::*;

        if *self == next {
            return true;
        }

        match (*self, next) {
            (Restricted | Unavailable, _) => false,
            (_, NotDetermined) => false,
            (NotDetermined | Pending, _) => true,
            (Authorized | Denied, Pending) => info.allows_repeated_prompting,
            (Authorized, Denied) | (Denied, Authorized) => true,
            (Authorized | Denied, Restricted | Unavailable) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The currently known status of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionState {
    /// The category this state belongs to
    pub category: Category,

    /// Its authorization status
    pub status: Status,
}

impl PermissionState {
    /// Create a new permission state.
    pub fn new(category: Category, status: Status) -> Self {
        Self { category, status }
    }

    /// The initial state of a category nobody has asked about.
    pub fn not_determined(category: Category) -> Self {
        Self::new(category, Status::NotDetermined)
    }

    /// Whether access is granted.
    pub fn is_authorized(&self) -> bool {
        self.status == Status::Authorized
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.status)
    }
}

/// The terminal result of resolving one category.
///
/// This is the completion signal for a single step: the category, its
/// resulting status, and the diagnostic when the status was not a platform
/// answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The category that was resolved
    pub category: Category,

    /// The resulting status
    pub status: Status,

    /// Why the status is a provisional `Denied`, if it is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl Resolution {
    /// A resolution that is a platform answer.
    pub fn answered(category: Category, status: Status) -> Self {
        Self {
            category,
            status,
            diagnostic: None,
        }
    }

    /// A provisional `Denied` caused by `diagnostic`.
    pub fn failed(category: Category, diagnostic: Diagnostic) -> Self {
        Self {
            category,
            status: Status::Denied,
            diagnostic: Some(diagnostic),
        }
    }

    /// The permission state this resolution describes.
    pub fn state(&self) -> PermissionState {
        PermissionState::new(self.category, self.status)
    }

    /// Whether the platform did not actually answer.
    pub fn is_provisional(&self) -> bool {
        self.diagnostic.is_some()
    }

    /// The answered state, or the error behind a provisional `Denied`.
    pub fn into_result(self) -> Result<PermissionState> {
        let state = self.state();
        match self.diagnostic {
            Some(diagnostic) => Err(diagnostic.into_error(self.category)),
            None => Ok(state),
        }
    }
}
