//! Command implementations
//!
//! Every command builds its broker against the scripted platform, so the CLI
//! doubles as a simulator for permission flows.

pub mod categories;
pub mod run;
pub mod status;

use thiserror::Error;

/// Errors raised while parsing command line values.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("expected <category>=<outcome>, got '{0}'")]
    MalformedOutcome(String),

    #[error("unknown outcome '{0}', expected granted, denied, restricted, unavailable, error or hang")]
    UnknownOutcome(String),

    #[error("expected <category>:<key>=<value>, got '{0}'")]
    MalformedOption(String),

    #[error(transparent)]
    Category(#[from] warden_core::Error),
}
