//! # Warden Broker
//!
//! The moving parts of the Warden permission broker: one state machine per
//! permission category, a coordinator that walks a sequence of categories one
//! at a time, and a synchronous observation bus that reports every transition
//! and every coordinator step.
//!
//! # Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_broker::{PermissionBroker, ScriptedRequester};
//! use warden_core::Category;
//!
//! # async fn example() -> warden_core::Result<()> {
//! let broker = PermissionBroker::builder()
//!     .requester_for_all(Arc::new(ScriptedRequester::granting()))
//!     .build()
//!     .await?;
//!
//! broker.subscribe(|event| {
//!     println!("{:?}", event);
//!     Ok(())
//! });
//!
//! let report = broker
//!     .coordinator()
//!     .run([Category::LocationWhenInUse, Category::Microphone])
//!     .await?;
//! assert!(report.all_authorized());
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - **requester**: the platform call interface and a scripted implementation
//! - **request**: the per-category state machine
//! - **coordinator**: sequencing of several requests
//! - **bus**: events and the publish/subscribe registry
//! - **store**: status persistence
//! - **config**: broker configuration
//! - **broker**: the facade tying everything together

pub mod broker;
pub mod bus;
pub mod config;
pub mod coordinator;
pub mod request;
pub mod requester;
pub mod store;

pub use broker::{BrokerBuilder, PermissionBroker};
pub use bus::{BrokerEvent, ObservationBus, SequenceOutcome, SequenceReport, SubscriberError, Transition};
pub use config::BrokerConfig;
pub use coordinator::{CancelHandle, CoordinatorSession, RequestCoordinator};
pub use request::PermissionRequest;
pub use requester::{CapabilityRequester, RequestOutcome, ScriptedOutcome, ScriptedRequester};
pub use store::{FileStore, MemoryStore, NoopStore, StatusStore};
