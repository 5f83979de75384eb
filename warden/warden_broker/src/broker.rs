//! Broker facade.
//!
//! [`PermissionBroker`] owns one [`PermissionRequest`] per registered
//! category, the observation bus and the status store. Application code asks
//! the broker; it never talks to a requester directly.

use crate::bus::{BrokerEvent, ObservationBus, SubscriberError};
use crate::config::BrokerConfig;
use crate::coordinator::RequestCoordinator;
use crate::request::PermissionRequest;
use crate::requester::CapabilityRequester;
use crate::store::{FileStore, NoopStore, StatusStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use warden_core::{
    Category, CategoryFamily, CategoryRegistry, Error, PermissionState, Preconfiguration,
    Resolution, Result, SubscriptionId,
};

/// Builder for [`PermissionBroker`].
#[derive(Default)]
pub struct BrokerBuilder {
    config: BrokerConfig,
    store: Option<Arc<dyn StatusStore>>,
    requesters: HashMap<CategoryFamily, Arc<dyn CapabilityRequester>>,
    fallback: Option<Arc<dyn CapabilityRequester>>,
}

impl BrokerBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`.
    pub fn config(mut self, config: BrokerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `store` instead of the one the configuration describes.
    pub fn store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `requester` for every category of `family`.
    pub fn requester(mut self, family: CategoryFamily, requester: Arc<dyn CapabilityRequester>) -> Self {
        self.requesters.insert(family, requester);
        self
    }

    /// Use `requester` for every family without a requester of its own.
    pub fn requester_for_all(mut self, requester: Arc<dyn CapabilityRequester>) -> Self {
        self.fallback = Some(requester);
        self
    }

    /// Build the broker, seeding every registered category from the store.
    pub async fn build(self) -> Result<PermissionBroker> {
        self.config.validate()?;
        let registry = self.config.registry();

        let store: Arc<dyn StatusStore> = match (self.store, &self.config.store_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileStore::open(path.clone()).await?),
            (None, None) => Arc::new(NoopStore),
        };

        let bus = Arc::new(ObservationBus::new());
        let timeout = self.config.platform_timeout();

        let mut requests = BTreeMap::new();
        for category in registry.iter() {
            let family = category.family();
            let requester = self
                .requesters
                .get(&family)
                .or(self.fallback.as_ref())
                .cloned()
                .ok_or(Error::MissingRequester(family))?;

            let initial = store.load(category).await?;
            debug!(category = %category, initial = ?initial, "seeded permission request");

            let request = PermissionRequest::new(
                category,
                requester,
                Arc::clone(&store),
                Arc::clone(&bus),
                timeout,
                initial,
            );
            requests.insert(category, Arc::new(request));
        }

        info!(
            categories = requests.len(),
            timeout_ms = self.config.platform_timeout_ms,
            "permission broker ready"
        );

        Ok(PermissionBroker {
            config: self.config,
            registry,
            bus,
            requests: Arc::new(requests),
        })
    }
}

/// Permission broker.
pub struct PermissionBroker {
    config: BrokerConfig,
    registry: CategoryRegistry,
    bus: Arc<ObservationBus>,
    requests: Arc<BTreeMap<Category, Arc<PermissionRequest>>>,
}

impl PermissionBroker {
    /// Start building a broker.
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::new()
    }

    /// The configuration the broker was built with.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// The registered categories.
    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// The observation bus.
    pub fn bus(&self) -> &Arc<ObservationBus> {
        &self.bus
    }

    /// The permission request of a registered category.
    pub fn permission(&self, category: Category) -> Result<&Arc<PermissionRequest>> {
        self.registry.lookup(category)?;
        self.requests.get(&category).ok_or_else(|| {
            Error::UnknownCategory(format!("{} has no permission request", category))
        })
    }

    /// Current state of a registered category.
    pub fn current_state(&self, category: Category) -> Result<PermissionState> {
        Ok(self.permission(category)?.current_state())
    }

    /// Current state of every registered category, in code order.
    pub fn states(&self) -> Vec<PermissionState> {
        self.requests.values().map(|r| r.current_state()).collect()
    }

    /// Resolve a category.
    pub async fn request(&self, category: Category) -> Result<Resolution> {
        Ok(self.permission(category)?.request().await)
    }

    /// Resolve a category, prompting again where the platform allows it.
    pub async fn reprompt(&self, category: Category) -> Result<Resolution> {
        Ok(self.permission(category)?.reprompt().await)
    }

    /// Re-read a category from the platform without prompting.
    pub async fn refresh(&self, category: Category) -> Result<PermissionState> {
        Ok(self.permission(category)?.refresh().await)
    }

    /// Attach a preconfiguration to a category.
    pub fn configure(&self, category: Category, configuration: Preconfiguration) -> Result<()> {
        self.permission(category)?.configure(configuration)
    }

    /// Register an observer on the bus.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&BrokerEvent) -> std::result::Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.bus.subscribe(handler)
    }

    /// Remove an observer.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// A coordinator over this broker's categories.
    pub fn coordinator(&self) -> RequestCoordinator {
        RequestCoordinator::new(
            self.registry.clone(),
            Arc::clone(&self.requests),
            Arc::clone(&self.bus),
        )
    }
}
