//! A deterministic requester that answers from a script.
//!
//! Used by the command line simulator and by tests. It records every call it
//! receives, the configuration each call carried, and the peak number of
//! calls that were in flight at the same time.

use super::{CapabilityRequester, RequestOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use warden_core::{Category, Preconfiguration, Status};

/// How the scripted platform answers a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Answer immediately.
    Respond(RequestOutcome),

    /// Answer after a delay.
    After(Duration, RequestOutcome),

    /// Never answer.
    Hang,
}

impl From<RequestOutcome> for ScriptedOutcome {
    fn from(outcome: RequestOutcome) -> Self {
        ScriptedOutcome::Respond(outcome)
    }
}

/// Decrements the in-flight counter when a call finishes or is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted capability requester.
pub struct ScriptedRequester {
    default: ScriptedOutcome,
    outcomes: Mutex<HashMap<Category, ScriptedOutcome>>,
    current: Mutex<HashMap<Category, Status>>,
    calls: Mutex<Vec<Category>>,
    configurations: Mutex<HashMap<Category, Option<Preconfiguration>>>,
    queries: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedRequester {
    /// A requester answering every category with `default`.
    pub fn new(default: impl Into<ScriptedOutcome>) -> Self {
        Self {
            default: default.into(),
            outcomes: Mutex::new(HashMap::new()),
            current: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            configurations: Mutex::new(HashMap::new()),
            queries: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// A requester granting everything.
    pub fn granting() -> Self {
        Self::new(RequestOutcome::Granted)
    }

    /// Set the answer for `category`, builder style.
    pub fn with_outcome(self, category: Category, outcome: impl Into<ScriptedOutcome>) -> Self {
        self.set_outcome(category, outcome);
        self
    }

    /// Set the answer for `category`.
    pub fn set_outcome(&self, category: Category, outcome: impl Into<ScriptedOutcome>) {
        self.outcomes.lock().insert(category, outcome.into());
    }

    /// Set what a silent query for `category` reports.
    pub fn set_current(&self, category: Category, status: Status) {
        self.current.lock().insert(category, status);
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<Category> {
        self.calls.lock().clone()
    }

    /// Number of requests received for `category`.
    pub fn call_count(&self, category: Category) -> usize {
        self.calls.lock().iter().filter(|c| **c == category).count()
    }

    /// Number of silent queries received.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Configuration carried by the last request for `category`.
    pub fn configuration_for(&self, category: Category) -> Option<Preconfiguration> {
        self.configurations.lock().get(&category).cloned().flatten()
    }

    /// Highest number of requests that were in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn outcome_for(&self, category: Category) -> ScriptedOutcome {
        self.outcomes
            .lock()
            .get(&category)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    fn remember(&self, category: Category, outcome: &RequestOutcome) {
        if let Some(status) = outcome.status() {
            self.current.lock().insert(category, status);
        }
    }
}

#[async_trait]
impl CapabilityRequester for ScriptedRequester {
    async fn request_authorization(
        &self,
        category: Category,
        configuration: Option<&Preconfiguration>,
    ) -> RequestOutcome {
        self.calls.lock().push(category);
        self.configurations
            .lock()
            .insert(category, configuration.cloned());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let script = self.outcome_for(category);
        debug!(category = %category, ?script, "scripted platform call");

        let outcome = match script {
            ScriptedOutcome::Respond(outcome) => outcome,
            ScriptedOutcome::After(delay, outcome) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            ScriptedOutcome::Hang => std::future::pending::<RequestOutcome>().await,
        };

        self.remember(category, &outcome);
        outcome
    }

    async fn current_authorization(&self, category: Category) -> Option<Status> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.current.lock().get(&category).copied()
    }
}
