use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{Category, Diagnostic, Resolution, SessionId, Status};

/// How a coordinator sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceOutcome {
    /// Every step ran.
    Completed,

    /// The session was canceled before every step ran.
    Canceled,
}

/// Summary of a coordinator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Session that produced this report
    pub session: SessionId,

    /// Results of the steps that ran, in order
    pub steps: Vec<Resolution>,

    /// Whether the run completed or was canceled
    pub outcome: SequenceOutcome,
}

impl SequenceReport {
    /// Whether every step that ran ended `Authorized`.
    pub fn all_authorized(&self) -> bool {
        self.steps.iter().all(|r| r.status == Status::Authorized)
    }

    /// Result for `category`, if its step ran.
    pub fn resolution(&self, category: Category) -> Option<&Resolution> {
        self.steps.iter().find(|r| r.category == category)
    }
}

/// A state transition of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Category that changed
    pub category: Category,

    /// Status before the change (the status the request started from)
    pub previous: Status,

    /// Status after the change
    pub current: Status,

    /// Set when `current` is a provisional `Denied`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,

    /// When the change happened
    pub at: DateTime<Utc>,
}

/// Everything published on the observation bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrokerEvent {
    /// A category reached a new terminal status.
    Transitioned(Transition),

    /// A coordinator advanced to a category.
    StepStarted {
        session: SessionId,
        index: usize,
        category: Category,
    },

    /// A coordinator step resolved.
    StepCompleted {
        session: SessionId,
        index: usize,
        resolution: Resolution,
    },

    /// A coordinator run ended.
    SequenceFinished(SequenceReport),
}

impl BrokerEvent {
    /// Short name of the event kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transitioned(_) => "transitioned",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::SequenceFinished(_) => "sequence_finished",
        }
    }

    /// Category the event is about, if it is about one.
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Transitioned(t) => Some(t.category),
            Self::StepStarted { category, .. } => Some(*category),
            Self::StepCompleted { resolution, .. } => Some(resolution.category),
            Self::SequenceFinished(_) => None,
        }
    }
}
