//! Capability requesters.
//!
//! A requester performs the actual platform call for one family of
//! categories. The broker treats it as a black box: it is asked once per
//! in-flight request, and whatever it answers (or fails to answer within the
//! configured timeout) becomes the category's terminal state.

pub mod scripted;

pub use scripted::{ScriptedOutcome, ScriptedRequester};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use warden_core::{Category, Preconfiguration, Status};

/// Raw outcome of a platform authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The user granted access.
    Granted,

    /// The user denied access.
    Denied,

    /// Policy blocks access.
    Restricted,

    /// The capability is absent.
    Unavailable,

    /// The platform call failed.
    Error(String),
}

impl RequestOutcome {
    /// The status this outcome maps to, or `None` for an error.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Granted => Some(Status::Authorized),
            Self::Denied => Some(Status::Denied),
            Self::Restricted => Some(Status::Restricted),
            Self::Unavailable => Some(Status::Unavailable),
            Self::Error(_) => None,
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Restricted => write!(f, "restricted"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Error(message) => write!(f, "error: {}", message),
        }
    }
}

impl FromStr for RequestOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "granted" | "authorized" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            "restricted" => Ok(Self::Restricted),
            "unavailable" => Ok(Self::Unavailable),
            "error" => Ok(Self::Error("platform reported an error".to_string())),
            other => Err(format!("unknown outcome '{}'", other)),
        }
    }
}

/// Performs platform authorization calls for a family of categories.
#[async_trait]
pub trait CapabilityRequester: Send + Sync {
    /// Ask the platform to authorize `category`, prompting the user if needed.
    ///
    /// `configuration` is the category's preconfiguration, already validated
    /// against the registry.
    async fn request_authorization(
        &self,
        category: Category,
        configuration: Option<&Preconfiguration>,
    ) -> RequestOutcome;

    /// Read the current authorization without prompting.
    ///
    /// Returns `None` when the platform cannot tell. The default
    /// implementation never can.
    async fn current_authorization(&self, _category: Category) -> Option<Status> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status() {
        assert_eq!(RequestOutcome::Granted.status(), Some(Status::Authorized));
        assert_eq!(RequestOutcome::Restricted.status(), Some(Status::Restricted));
        assert_eq!(RequestOutcome::Error("x".to_string()).status(), None);
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!("Granted".parse::<RequestOutcome>(), Ok(RequestOutcome::Granted));
        assert!(matches!(
            "error".parse::<RequestOutcome>(),
            Ok(RequestOutcome::Error(_))
        ));
        assert!("perhaps".parse::<RequestOutcome>().is_err());
    }
}
