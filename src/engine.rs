//! Entry point used by the CLI and by embedding callers.
//!
//! [`Engine`] wires the catalog, the alchemist directory, the lifecycle store,
//! the change notifier and the optional completion scheduler together.

use std::sync::Arc;

use crate::catalog::{InMemoryCatalog, InMemoryDirectory, MaterialCatalog};
use crate::config::TransmuteConfig;
use crate::error::EngineError;
use crate::feed::{ChangeNotifier, Subscription};
use crate::ids::{AlchemistId, TransmutationId};
use crate::lifecycle::{Actor, LifecycleStore, Transmutation, TransmutationStatus};
use crate::observer::{LocalFeed, ObserverHandle, ObserverSession, SessionConfig};
use crate::pricing::{PricingModel, SimulationRequest, SimulationResult};
use crate::scheduler::CompletionScheduler;

pub struct Engine {
    pricing: PricingModel,
    catalog: Arc<InMemoryCatalog>,
    notifier: Arc<ChangeNotifier>,
    store: Arc<LifecycleStore>,
    scheduler: Option<CompletionScheduler>,
    session_config: SessionConfig,
}

impl Engine {
    /// Builds an engine from configuration. Must be called inside a Tokio
    /// runtime when `auto_complete` is enabled.
    pub fn from_config(config: &TransmuteConfig) -> Self {
        let pricing = PricingModel::new(config.pricing.base_duration_secs);
        let catalog = Arc::new(InMemoryCatalog::new(config.materials.iter().cloned()));
        let directory = Arc::new(InMemoryDirectory::new(config.alchemists.iter().cloned()));
        let notifier = Arc::new(ChangeNotifier::new(config.feed.session_queue_capacity));

        let store = Arc::new(
            LifecycleStore::new(
                pricing,
                Arc::clone(&catalog) as Arc<dyn MaterialCatalog>,
                directory,
                Arc::clone(&notifier),
            )
            .with_single_active_per_alchemist(config.lifecycle.single_active_per_alchemist),
        );
        let scheduler = config
            .lifecycle
            .auto_complete
            .then(|| CompletionScheduler::new(Arc::clone(&store)));

        tracing::debug!(
            materials = config.materials.len(),
            alchemists = config.alchemists.len(),
            auto_complete = config.lifecycle.auto_complete,
            "engine ready"
        );

        Self {
            pricing,
            catalog,
            notifier,
            store,
            scheduler,
            session_config: SessionConfig {
                reconnect_delay: config.feed.reconnect_delay(),
            },
        }
    }

    /// Validates and prices a hypothetical transmutation. Never mutates state.
    pub fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult, EngineError> {
        request.validate()?;
        Ok(self.pricing.simulate(request, self.catalog.as_ref()))
    }

    pub async fn start(
        &self,
        alchemist_id: AlchemistId,
        request: &SimulationRequest,
    ) -> Result<Transmutation, EngineError> {
        self.store.start(alchemist_id, request).await
    }

    /// Applies a transition and keeps the completion timer in step with it.
    pub async fn transition(
        &self,
        id: TransmutationId,
        target: TransmutationStatus,
        actor: &Actor,
    ) -> Result<Transmutation, EngineError> {
        let record = self.store.transition(id, target, actor).await?;
        self.sync_timer(&record);
        Ok(record)
    }

    pub async fn transition_expecting(
        &self,
        id: TransmutationId,
        expected: TransmutationStatus,
        target: TransmutationStatus,
        actor: &Actor,
    ) -> Result<Transmutation, EngineError> {
        let record = self
            .store
            .transition_expecting(id, expected, target, actor)
            .await?;
        self.sync_timer(&record);
        Ok(record)
    }

    pub async fn cancel(&self, id: TransmutationId, actor: &Actor) -> Result<Transmutation, EngineError> {
        self.transition(id, TransmutationStatus::Cancelled, actor).await
    }

    pub fn get(&self, id: TransmutationId) -> Option<Transmutation> {
        self.store.get(id)
    }

    /// Every transmutation, newest first.
    pub fn list(&self) -> Vec<Transmutation> {
        self.store.list()
    }

    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    /// Raw feed subscription. Most callers want [`observe`](Self::observe).
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    pub fn local_feed(&self) -> LocalFeed {
        LocalFeed::new(Arc::clone(&self.notifier), Arc::clone(&self.store))
    }

    /// Opens an observer session over the in-process feed.
    pub fn observe(&self) -> ObserverHandle {
        ObserverSession::spawn(Arc::new(self.local_feed()), self.session_config)
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    pub fn store(&self) -> &Arc<LifecycleStore> {
        &self.store
    }

    pub fn pending_completions(&self) -> usize {
        self.scheduler.as_ref().map_or(0, CompletionScheduler::pending)
    }

    fn sync_timer(&self, record: &Transmutation) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        match record.status {
            TransmutationStatus::InProgress => scheduler.schedule(record),
            status if status.is_terminal() => scheduler.cancel(record.id),
            _ => {}
        }
    }
}
