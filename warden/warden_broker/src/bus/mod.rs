//! Observation bus.
//!
//! A light publish/subscribe registry through which a presentation layer
//! learns about state transitions and coordinator progress without polling.
//!
//! Delivery is synchronous and in registration order. `publish` takes a
//! snapshot of the registry before delivering, so a subscriber added while a
//! publish is running does not receive that event. A subscriber removed while
//! a publish is running is skipped if its turn has not come yet. Subscribers
//! may subscribe or unsubscribe from inside their own handler.

mod events;

pub use events::{BrokerEvent, SequenceOutcome, SequenceReport, Transition};

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, trace, warn};
use warden_core::SubscriptionId;

/// Error a subscriber may return. It is logged and otherwise ignored.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// A subscriber callback.
pub type EventHandler = Arc<dyn Fn(&BrokerEvent) -> Result<(), SubscriberError> + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    active: AtomicBool,
    handler: EventHandler,
}

/// Synchronous, ordered publish/subscribe registry.
#[derive(Default)]
pub struct ObservationBus {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
}

impl ObservationBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` and return its handle.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&BrokerEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        let subscriber = Arc::new(Subscriber {
            id: SubscriptionId::new(),
            active: AtomicBool::new(true),
            handler: Arc::new(handler),
        });
        let id = subscriber.id;
        self.subscribers.write().push(subscriber);
        trace!(subscription = %id, "subscriber registered");
        id
    }

    /// Remove a subscriber. Returns `false` if the handle was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        match subscribers.iter().position(|s| s.id == id) {
            Some(index) => {
                let removed = subscribers.remove(index);
                removed.active.store(false, Ordering::SeqCst);
                trace!(subscription = %id, "subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every registered subscriber, in registration order.
    ///
    /// Returns the number of subscribers that accepted the event. A
    /// subscriber that returns an error or panics does not stop delivery.
    pub fn publish(&self, event: &BrokerEvent) -> usize {
        let snapshot: Vec<Arc<Subscriber>> = self.subscribers.read().clone();
        let mut delivered = 0;

        for subscriber in snapshot {
            if !subscriber.active.load(Ordering::SeqCst) {
                continue;
            }

            let handler = &subscriber.handler;
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(
                        subscription = %subscriber.id,
                        event = event.kind(),
                        error = %e,
                        "subscriber failed to handle event"
                    );
                }
                Err(_) => {
                    error!(
                        subscription = %subscriber.id,
                        event = event.kind(),
                        "subscriber panicked while handling event"
                    );
                }
            }
        }

        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use warden_core::{Category, SessionId};

    fn started(category: Category) -> BrokerEvent {
        BrokerEvent::StepStarted {
            session: SessionId::new(),
            index: 0,
            category,
        }
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let bus = ObservationBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.subscribe(move |_| {
                seen.lock().push(name);
                Ok(())
            });
        }

        assert_eq!(bus.publish(&started(Category::Events)), 3);
        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failing_subscribers_are_isolated() {
        let bus = ObservationBus::new();
        let count = Arc::new(Mutex::new(0));

        bus.subscribe(|_| Err("nope".into()));
        bus.subscribe(|_| panic!("subscriber bug"));
        let c = count.clone();
        bus.subscribe(move |_| {
            *c.lock() += 1;
            Ok(())
        });

        assert_eq!(bus.publish(&started(Category::Events)), 1);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = ObservationBus::new();
        let id = bus.subscribe(|_| Ok(()));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(&started(Category::Events)), 0);
    }

    #[test]
    fn test_unsubscribe_during_publish_skips_later_subscriber() {
        let bus = Arc::new(ObservationBus::new());
        let victim_calls = Arc::new(Mutex::new(0));
        let victim_id = Arc::new(Mutex::new(None));

        let b = bus.clone();
        let v = victim_id.clone();
        bus.subscribe(move |_| {
            if let Some(id) = *v.lock() {
                b.unsubscribe(id);
            }
            Ok(())
        });

        let calls = victim_calls.clone();
        let id = bus.subscribe(move |_| {
            *calls.lock() += 1;
            Ok(())
        });
        *victim_id.lock() = Some(id);

        bus.publish(&started(Category::Events));
        assert_eq!(*victim_calls.lock(), 0);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_subscribe_during_publish_waits_for_next_event() {
        let bus = Arc::new(ObservationBus::new());
        let late_calls = Arc::new(Mutex::new(0));
        let added = Arc::new(AtomicBool::new(false));

        let b = bus.clone();
        let calls = late_calls.clone();
        bus.subscribe(move |_| {
            if !added.swap(true, Ordering::SeqCst) {
                let calls = calls.clone();
                b.subscribe(move |_| {
                    *calls.lock() += 1;
                    Ok(())
                });
            }
            Ok(())
        });

        bus.publish(&started(Category::Events));
        assert_eq!(*late_calls.lock(), 0);

        bus.publish(&started(Category::Events));
        assert_eq!(*late_calls.lock(), 1);
    }
}
