//! Request coordinator.
//!
//! Drives an ordered sequence of distinct categories through their permission
//! requests one at a time. Each step is awaited to a terminal result before
//! the next begins. Per-category failures are recorded as that step's
//! diagnostic and never abort the run.

use crate::bus::{BrokerEvent, ObservationBus, SequenceOutcome, SequenceReport};
use crate::request::PermissionRequest;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use warden_core::{Category, CategoryRegistry, Error, Result, SessionId};

/// Cooperative cancellation flag for a coordinator session.
///
/// Checked at step boundaries: the step in flight still completes and its
/// result is kept, the remaining steps are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    canceled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a handle that is not canceled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Sequences permission requests.
#[derive(Clone)]
pub struct RequestCoordinator {
    registry: CategoryRegistry,
    requests: Arc<BTreeMap<Category, Arc<PermissionRequest>>>,
    bus: Arc<ObservationBus>,
}

impl RequestCoordinator {
    /// Create a coordinator over the broker's permission requests.
    pub fn new(
        registry: CategoryRegistry,
        requests: Arc<BTreeMap<Category, Arc<PermissionRequest>>>,
        bus: Arc<ObservationBus>,
    ) -> Self {
        Self {
            registry,
            requests,
            bus,
        }
    }

    /// Validate `categories` and prepare a session without running it.
    ///
    /// Fails with `InvalidSequence` for an empty sequence or a repeated
    /// category, and with `UnknownCategory` for a category the broker does
    /// not manage. Nothing is requested and nothing is published on failure.
    pub fn begin<I>(&self, categories: I) -> Result<CoordinatorSession>
    where
        I: IntoIterator<Item = Category>,
    {
        let categories: Vec<Category> = categories.into_iter().collect();
        if categories.is_empty() {
            return Err(Error::InvalidSequence("sequence is empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(categories.len());
        for category in categories {
            if !seen.insert(category) {
                return Err(Error::InvalidSequence(format!(
                    "{} appears more than once",
                    category
                )));
            }

            self.registry.lookup(category)?;
            let request = self.requests.get(&category).ok_or_else(|| {
                Error::UnknownCategory(format!("{} has no permission request", category))
            })?;
            steps.push(Arc::clone(request));
        }

        let session = CoordinatorSession {
            id: SessionId::new(),
            steps,
            cancel: CancelHandle::new(),
            bus: Arc::clone(&self.bus),
        };
        debug!(session = %session.id, steps = session.steps.len(), "coordinator session created");
        Ok(session)
    }

    /// Validate and run `categories` to completion.
    pub async fn run<I>(&self, categories: I) -> Result<SequenceReport>
    where
        I: IntoIterator<Item = Category>,
    {
        Ok(self.begin(categories)?.run().await)
    }
}

/// A validated, not yet finished coordinator run.
pub struct CoordinatorSession {
    id: SessionId,
    steps: Vec<Arc<PermissionRequest>>,
    cancel: CancelHandle,
    bus: Arc<ObservationBus>,
}

impl CoordinatorSession {
    /// Session identifier, carried by every event of this run.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Categories of this session, in order.
    pub fn categories(&self) -> Vec<Category> {
        self.steps.iter().map(|r| r.category()).collect()
    }

    /// A handle that cancels this session from anywhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run every step in order and report the results.
    pub async fn run(self) -> SequenceReport {
        info!(session = %self.id, categories = ?self.categories(), "sequence started");

        let mut results = Vec::with_capacity(self.steps.len());
        let mut outcome = SequenceOutcome::Completed;

        for (index, request) in self.steps.iter().enumerate() {
            if self.cancel.is_canceled() {
                info!(session = %self.id, completed = index, "sequence canceled");
                outcome = SequenceOutcome::Canceled;
                break;
            }

            let category = request.category();
            self.bus.publish(&BrokerEvent::StepStarted {
                session: self.id,
                index,
                category,
            });

            let resolution = request.request().await;
            debug!(
                session = %self.id,
                index,
                category = %category,
                status = %resolution.status,
                "step completed"
            );

            self.bus.publish(&BrokerEvent::StepCompleted {
                session: self.id,
                index,
                resolution: resolution.clone(),
            });
            results.push(resolution);
        }

        let report = SequenceReport {
            session: self.id,
            steps: results,
            outcome,
        };
        info!(
            session = %self.id,
            outcome = ?report.outcome,
            steps = report.steps.len(),
            "sequence finished"
        );
        self.bus
            .publish(&BrokerEvent::SequenceFinished(report.clone()));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requester::ScriptedRequester;
    use crate::store::NoopStore;
    use std::time::Duration;

    fn coordinator(requester: Arc<ScriptedRequester>, bus: Arc<ObservationBus>) -> RequestCoordinator {
        let categories = [Category::Microphone, Category::PhotoLibrary, Category::Events];
        let requests: BTreeMap<_, _> = categories
            .iter()
            .map(|&category| {
                let request = PermissionRequest::new(
                    category,
                    requester.clone(),
                    Arc::new(NoopStore),
                    bus.clone(),
                    Duration::from_secs(1),
                    None,
                );
                (category, Arc::new(request))
            })
            .collect();

        RequestCoordinator::new(
            CategoryRegistry::with_categories(categories),
            Arc::new(requests),
            bus,
        )
    }

    #[tokio::test]
    async fn test_runs_in_order() {
        let requester = Arc::new(ScriptedRequester::granting());
        let coordinator = coordinator(requester.clone(), Arc::new(ObservationBus::new()));

        let report = coordinator
            .run([Category::Events, Category::Microphone])
            .await
            .unwrap();

        assert_eq!(report.outcome, SequenceOutcome::Completed);
        assert!(report.all_authorized());
        assert_eq!(requester.calls(), vec![Category::Events, Category::Microphone]);
    }

    #[tokio::test]
    async fn test_rejects_invalid_sequences() {
        let requester = Arc::new(ScriptedRequester::granting());
        let coordinator = coordinator(requester.clone(), Arc::new(ObservationBus::new()));

        assert!(matches!(
            coordinator.begin(Vec::new()),
            Err(Error::InvalidSequence(_))
        ));
        assert!(matches!(
            coordinator.begin([Category::Events, Category::Events]),
            Err(Error::InvalidSequence(_))
        ));
        assert!(matches!(
            coordinator.begin([Category::Events, Category::Health]),
            Err(Error::UnknownCategory(_))
        ));
        assert!(requester.calls().is_empty());
    }

    #[tokio::test]
    async fn test_canceled_before_start() {
        let requester = Arc::new(ScriptedRequester::granting());
        let coordinator = coordinator(requester.clone(), Arc::new(ObservationBus::new()));

        let session = coordinator.begin([Category::Events]).unwrap();
        session.cancel_handle().cancel();
        let report = session.run().await;

        assert_eq!(report.outcome, SequenceOutcome::Canceled);
        assert!(report.steps.is_empty());
        assert!(requester.calls().is_empty());
    }
}
