//! Permission request state machine.
//!
//! One [`PermissionRequest`] exists per registered category. It owns the
//! category's status, deduplicates concurrent requests onto a single platform
//! call, and publishes exactly one transition per platform resolution.
//!
//! The status moves to `Pending` while the request lock is held, before the
//! first suspension point, so a second caller always finds the in-flight call
//! and attaches to it. The platform call is driven by its own task; callers
//! only wait on a `watch` channel, so the state still reaches a terminal value
//! when every caller stops waiting.

use crate::bus::{BrokerEvent, ObservationBus, Transition};
use crate::requester::{CapabilityRequester, RequestOutcome};
use crate::store::StatusStore;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use warden_core::{
    Category, CategoryInfo, Diagnostic, PermissionState, Preconfiguration, Resolution, Result,
    Status,
};

type ResolutionReceiver = watch::Receiver<Option<Resolution>>;

struct Inner {
    status: Status,
    diagnostic: Option<Diagnostic>,
    configuration: Option<Preconfiguration>,
    in_flight: Option<ResolutionReceiver>,
    /// Bumped every time the status is written, so a silent query can tell
    /// whether a request overtook it.
    generation: u64,
}

/// What a silent query decided while holding the lock.
enum RefreshStep {
    Done(PermissionState),
    Yield(ResolutionReceiver),
    Changed {
        previous: Status,
        current: Status,
        generation: u64,
    },
    Confirmed(Status, u64),
}

/// State machine wrapping a single category.
pub struct PermissionRequest {
    category: Category,
    info: &'static CategoryInfo,
    requester: Arc<dyn CapabilityRequester>,
    store: Arc<dyn StatusStore>,
    bus: Arc<ObservationBus>,
    timeout: Duration,
    inner: Mutex<Inner>,
    /// Generation of the last status handed to the store. Writes are
    /// serialized through it so an older status never lands last.
    persisted: tokio::sync::Mutex<u64>,
}

impl PermissionRequest {
    /// Create the request for `category`, seeded with `initial` from a store.
    pub fn new(
        category: Category,
        requester: Arc<dyn CapabilityRequester>,
        store: Arc<dyn StatusStore>,
        bus: Arc<ObservationBus>,
        timeout: Duration,
        initial: Option<Status>,
    ) -> Self {
        let status = match initial {
            Some(Status::Pending) | None => Status::NotDetermined,
            Some(status) => status,
        };

        Self {
            category,
            info: category.info(),
            requester,
            store,
            bus,
            timeout,
            inner: Mutex::new(Inner {
                status,
                diagnostic: None,
                configuration: None,
                in_flight: None,
                generation: 0,
            }),
            persisted: tokio::sync::Mutex::new(0),
        }
    }

    /// The category this request manages.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Static metadata of the category.
    pub fn info(&self) -> &'static CategoryInfo {
        self.info
    }

    /// The currently known state.
    pub fn current_state(&self) -> PermissionState {
        PermissionState::new(self.category, self.inner.lock().status)
    }

    /// The diagnostic of a provisional `Denied`, if the state is one.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.inner.lock().diagnostic.clone()
    }

    /// Whether a platform call is in flight.
    pub fn is_pending(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }

    /// The preconfiguration the next platform call will carry.
    pub fn configuration(&self) -> Option<Preconfiguration> {
        self.inner
            .lock()
            .configuration
            .clone()
            .or_else(|| Preconfiguration::default_for(self.category))
    }

    /// Attach a preconfiguration for later platform calls.
    ///
    /// A call already in flight keeps the configuration it started with.
    pub fn configure(&self, configuration: Preconfiguration) -> Result<()> {
        configuration.validate_for(self.category)?;
        debug!(category = %self.category, kind = ?configuration.kind(), "preconfiguration set");
        self.inner.lock().configuration = Some(configuration);
        Ok(())
    }

    /// Resolve the category, asking the platform only if needed.
    ///
    /// A terminal answer is returned without a platform call. A call already
    /// in flight is joined. A provisional `Denied` is retried.
    pub async fn request(self: &Arc<Self>) -> Resolution {
        self.resolve(false).await
    }

    /// Like [`request`](Self::request), but sends an `Authorized` or `Denied`
    /// answer back to the platform when the category allows repeated
    /// prompting.
    pub async fn reprompt(self: &Arc<Self>) -> Resolution {
        self.resolve(true).await
    }

    /// Re-read the platform's current answer without prompting.
    ///
    /// Never passes through `Pending`. If a request is in flight, or one
    /// starts while the query is outstanding, the request's result wins.
    pub async fn refresh(&self) -> PermissionState {
        let (in_flight, generation) = {
            let inner = self.inner.lock();
            (inner.in_flight.clone(), inner.generation)
        };

        if let Some(mut receiver) = in_flight {
            return self.wait(&mut receiver).await.state();
        }

        if !self.info.supports_silent_query {
            debug!(category = %self.category, "silent query not supported");
            return self.current_state();
        }

        let query = self.requester.current_authorization(self.category);
        let reported = match tokio::time::timeout(self.timeout, query).await {
            Ok(Some(reported)) => reported,
            Ok(None) => return self.current_state(),
            Err(_) => {
                warn!(
                    category = %self.category,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "silent query timed out"
                );
                return self.current_state();
            }
        };

        let step = {
            let mut inner = self.inner.lock();
            if let Some(receiver) = &inner.in_flight {
                RefreshStep::Yield(receiver.clone())
            } else if inner.generation != generation || reported == Status::Pending {
                RefreshStep::Done(PermissionState::new(self.category, inner.status))
            } else if reported == inner.status {
                if inner.diagnostic.take().is_some() {
                    inner.generation += 1;
                    RefreshStep::Confirmed(reported, inner.generation)
                } else {
                    RefreshStep::Done(PermissionState::new(self.category, inner.status))
                }
            } else if inner.status.can_transition_to(reported, self.info) {
                let previous = inner.status;
                inner.status = reported;
                inner.diagnostic = None;
                inner.generation += 1;
                RefreshStep::Changed {
                    previous,
                    current: reported,
                    generation: inner.generation,
                }
            } else {
                warn!(
                    category = %self.category,
                    current = %inner.status,
                    reported = %reported,
                    "ignoring illegal transition reported by silent query"
                );
                RefreshStep::Done(PermissionState::new(self.category, inner.status))
            }
        };

        match step {
            RefreshStep::Done(state) => state,
            RefreshStep::Yield(mut receiver) => self.wait(&mut receiver).await.state(),
            RefreshStep::Confirmed(status, generation) => {
                self.persist(status, generation).await;
                PermissionState::new(self.category, status)
            }
            RefreshStep::Changed {
                previous,
                current,
                generation,
            } => {
                info!(category = %self.category, %previous, %current, "status changed outside the app");
                self.persist(current, generation).await;
                self.publish(previous, current, None);
                PermissionState::new(self.category, current)
            }
        }
    }

    async fn resolve(self: &Arc<Self>, reprompt: bool) -> Resolution {
        let mut receiver = {
            let mut inner = self.inner.lock();
            let in_flight = inner.in_flight.clone();
            match in_flight {
                Some(receiver) => {
                    debug!(category = %self.category, "joining in-flight request");
                    receiver
                }
                None => match self.settled(&inner, reprompt) {
                    Some(resolution) => return resolution,
                    None => self.start(&mut inner),
                },
            }
        };

        self.wait(&mut receiver).await
    }

    /// The answer to return without a platform call, if there is one.
    fn settled(&self, inner: &Inner, reprompt: bool) -> Option<Resolution> {
        if !inner.status.is_terminal() || inner.diagnostic.is_some() {
            return None;
        }

        let repeatable = matches!(inner.status, Status::Authorized | Status::Denied)
            && self.info.allows_repeated_prompting;
        if reprompt && repeatable {
            return None;
        }

        Some(Resolution::answered(self.category, inner.status))
    }

    /// Move to `Pending` and spawn the driver. Called with the lock held.
    fn start(self: &Arc<Self>, inner: &mut Inner) -> ResolutionReceiver {
        let (sender, receiver) = watch::channel(None);
        let previous = inner.status;
        let configuration = inner
            .configuration
            .clone()
            .or_else(|| Preconfiguration::default_for(self.category));

        inner.status = Status::Pending;
        inner.diagnostic = None;
        inner.in_flight = Some(receiver.clone());

        info!(category = %self.category, %previous, "requesting authorization");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.drive(previous, configuration, sender).await;
        });

        receiver
    }

    async fn drive(
        self: Arc<Self>,
        previous: Status,
        configuration: Option<Preconfiguration>,
        sender: watch::Sender<Option<Resolution>>,
    ) {
        // The platform call runs in a task of its own so a panicking
        // requester still ends in a terminal state.
        let platform = tokio::spawn({
            let this = Arc::clone(&self);
            async move { this.call_platform(configuration).await }
        });

        let resolution = match platform.await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(category = %self.category, error = %e, "requester task failed");
                Resolution::failed(
                    self.category,
                    Diagnostic::PlatformError {
                        message: format!("requester task failed: {}", e),
                    },
                )
            }
        };

        let generation = {
            let mut inner = self.inner.lock();
            inner.status = resolution.status;
            inner.diagnostic = resolution.diagnostic.clone();
            inner.in_flight = None;
            inner.generation += 1;
            inner.generation
        };

        if resolution.is_provisional() {
            warn!(
                category = %self.category,
                diagnostic = ?resolution.diagnostic,
                "request failed, status is provisional"
            );
        } else {
            self.persist(resolution.status, generation).await;
        }

        self.publish(previous, resolution.status, resolution.diagnostic.clone());
        sender.send_replace(Some(resolution));
    }

    async fn call_platform(&self, configuration: Option<Preconfiguration>) -> Resolution {
        if self.info.requires_preconfiguration && configuration.is_none() {
            return Resolution::failed(self.category, Diagnostic::PreconfigurationMissing);
        }

        let call = self
            .requester
            .request_authorization(self.category, configuration.as_ref());

        match tokio::time::timeout(self.timeout, call).await {
            Ok(RequestOutcome::Error(message)) => {
                Resolution::failed(self.category, Diagnostic::PlatformError { message })
            }
            Ok(outcome) => Resolution::answered(
                self.category,
                outcome.status().unwrap_or(Status::Denied),
            ),
            Err(_) => Resolution::failed(
                self.category,
                Diagnostic::PlatformTimeout {
                    after_ms: self.timeout.as_millis() as u64,
                },
            ),
        }
    }

    async fn wait(&self, receiver: &mut ResolutionReceiver) -> Resolution {
        loop {
            let current = receiver.borrow_and_update().clone();
            if let Some(resolution) = current {
                return resolution;
            }

            if receiver.changed().await.is_err() {
                // The driver went away without resolving; report what is known.
                let inner = self.inner.lock();
                return Resolution {
                    category: self.category,
                    status: inner.status,
                    diagnostic: inner.diagnostic.clone(),
                };
            }
        }
    }

    async fn persist(&self, status: Status, generation: u64) {
        let mut persisted = self.persisted.lock().await;
        if generation <= *persisted {
            debug!(category = %self.category, %status, generation, "skipping stale status write");
            return;
        }
        *persisted = generation;

        if let Err(e) = self.store.save(self.category, status).await {
            error!(category = %self.category, %status, error = %e, "failed to store status");
        }
    }

    fn publish(&self, previous: Status, current: Status, diagnostic: Option<Diagnostic>) {
        self.bus.publish(&BrokerEvent::Transitioned(Transition {
            category: self.category,
            previous,
            current,
            diagnostic,
            at: Utc::now(),
        }));
    }
}
