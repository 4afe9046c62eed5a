use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::actor::Actor;
use super::locks::KeyedLocks;
use super::status::{StateMachine, Transition, TransmutationStatus};
use super::transmutation::Transmutation;
use crate::catalog::{AlchemistDirectory, MaterialCatalog};
use crate::error::{EngineError, TransitionDenial, ValidationError};
use crate::feed::{ChangeEvent, ChangeNotifier};
use crate::ids::{AlchemistId, TransmutationId};
use crate::pricing::{PricingModel, SimulationRequest};

/// Sole owner and writer of transmutation records.
///
/// Every mutation of one id runs under that id's lock and publishes its change
/// event before the lock is released, so observers see each id's events in
/// commit order. Operations on different ids proceed independently.
pub struct LifecycleStore {
    records: RwLock<BTreeMap<TransmutationId, Transmutation>>,
    next_id: AtomicU64,
    entity_locks: KeyedLocks<TransmutationId>,
    alchemist_locks: KeyedLocks<AlchemistId>,
    pricing: PricingModel,
    catalog: Arc<dyn MaterialCatalog>,
    directory: Arc<dyn AlchemistDirectory>,
    notifier: Arc<ChangeNotifier>,
    single_active_per_alchemist: bool,
}

impl LifecycleStore {
    pub fn new(
        pricing: PricingModel,
        catalog: Arc<dyn MaterialCatalog>,
        directory: Arc<dyn AlchemistDirectory>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            entity_locks: KeyedLocks::new(),
            alchemist_locks: KeyedLocks::new(),
            pricing,
            catalog,
            directory,
            notifier,
            single_active_per_alchemist: true,
        }
    }

    /// Allow or forbid several active transmutations for one alchemist.
    pub fn with_single_active_per_alchemist(mut self, enabled: bool) -> Self {
        self.single_active_per_alchemist = enabled;
        self
    }

    /// Prices the request and records a new transmutation in PENDING_APPROVAL.
    /// Emits a `started` event.
    pub async fn start(
        &self,
        alchemist_id: AlchemistId,
        request: &SimulationRequest,
    ) -> Result<Transmutation, EngineError> {
        request.validate()?;
        if self.directory.find(alchemist_id).is_none() {
            return Err(ValidationError::UnknownAlchemist(alchemist_id).into());
        }

        // Serialises starts per alchemist so the active check cannot race.
        let _alchemist_guard = self.alchemist_locks.lock(alchemist_id).await;
        if self.single_active_per_alchemist
            && let Some(existing) = self.active_for(alchemist_id)
        {
            return Err(EngineError::ActiveTransmutation {
                alchemist_id,
                existing,
            });
        }

        let description = request.resolved_description();
        let estimate = self.pricing.simulate(request, self.catalog.as_ref());

        let id = TransmutationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let _entity_guard = self.entity_locks.lock(id).await;
        let record = Transmutation::new(id, alchemist_id, description, &estimate);
        self.write_records().insert(id, record.clone());
        self.notifier.publish(&ChangeEvent::Started(record.clone()));

        tracing::info!(
            id = id.0,
            alchemist_id = alchemist_id.0,
            estimated_cost = record.estimated_cost,
            duration_secs = record.estimated_duration_seconds,
            "transmutation started"
        );
        Ok(record)
    }

    /// Moves `id` to `target` if the state machine and the actor allow it.
    /// Same-status requests succeed without emitting anything.
    pub async fn transition(
        &self,
        id: TransmutationId,
        target: TransmutationStatus,
        actor: &Actor,
    ) -> Result<Transmutation, EngineError> {
        self.apply(id, None, target, actor).await
    }

    /// Like [`transition`](Self::transition), but fails with a stale-precondition
    /// denial unless the current status is still `expected` when the change is applied.
    pub async fn transition_expecting(
        &self,
        id: TransmutationId,
        expected: TransmutationStatus,
        target: TransmutationStatus,
        actor: &Actor,
    ) -> Result<Transmutation, EngineError> {
        self.apply(id, Some(expected), target, actor).await
    }

    async fn apply(
        &self,
        id: TransmutationId,
        expected: Option<TransmutationStatus>,
        target: TransmutationStatus,
        actor: &Actor,
    ) -> Result<Transmutation, EngineError> {
        let _guard = self.entity_locks.lock(id).await;

        let mut record = self.get(id).ok_or(EngineError::NotFound(id))?;
        let current = record.status;
        let denied = move |reason| EngineError::IllegalTransition {
            id,
            from: current,
            to: target,
            reason,
        };

        if let Some(expected) = expected
            && record.status != expected
        {
            return Err(denied(TransitionDenial::StalePrecondition { expected }));
        }

        match StateMachine::evaluate(record.status, target, actor, record.alchemist_id) {
            Ok(Transition::Unchanged) => {
                tracing::debug!(id = id.0, status = %record.status, "transition is a no-op");
                Ok(record)
            }
            Ok(Transition::Advance { from, to }) => {
                record.advance(to);
                self.write_records().insert(id, record.clone());
                self.notifier.publish(&ChangeEvent::for_transition(record.clone()));
                tracing::info!(id = id.0, %from, %to, role = ?actor.role, "transmutation transitioned");
                Ok(record)
            }
            Err(reason) => {
                tracing::debug!(id = id.0, from = %current, to = %target, %reason, "transition refused");
                Err(denied(reason))
            }
        }
    }

    pub fn get(&self, id: TransmutationId) -> Option<Transmutation> {
        self.read_records().get(&id).cloned()
    }

    /// Every transmutation, newest first.
    pub fn list(&self) -> Vec<Transmutation> {
        self.read_records().values().rev().cloned().collect()
    }

    fn active_for(&self, alchemist_id: AlchemistId) -> Option<TransmutationId> {
        self.read_records()
            .values()
            .find(|t| t.alchemist_id == alchemist_id && t.is_active())
            .map(|t| t.id)
    }

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<TransmutationId, Transmutation>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_records(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<TransmutationId, Transmutation>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Alchemist, InMemoryCatalog, InMemoryDirectory, Material};
    use crate::feed::{EventKind, FeedMessage};
    use crate::ids::MaterialId;
    use TransmutationStatus::*;

    fn store_with(notifier: Arc<ChangeNotifier>) -> LifecycleStore {
        let catalog = InMemoryCatalog::new([Material {
            id: MaterialId(1),
            name: "Mercury".into(),
            unit: "g".into(),
            unit_cost: 10.0,
            stock: 10.0,
        }]);
        let directory = InMemoryDirectory::new([7, 8].map(|id| Alchemist {
            id: AlchemistId(id),
            name: format!("Alchemist {id}"),
        }));
        LifecycleStore::new(
            PricingModel::new(30),
            Arc::new(catalog),
            Arc::new(directory),
            notifier,
        )
    }

    fn store() -> LifecycleStore {
        store_with(Arc::new(ChangeNotifier::new(64)))
    }

    fn request() -> SimulationRequest {
        SimulationRequest::new("Lead to gold").with_material(1, 2.0)
    }

    fn next_kind(sub: &mut crate::feed::Subscription) -> EventKind {
        let frame = sub.try_recv().expect("expected a frame");
        match FeedMessage::decode(&frame).unwrap() {
            FeedMessage::Change(ev) => ev.kind(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_creates_pending_and_emits_started() {
        let notifier = Arc::new(ChangeNotifier::new(64));
        let mut sub = notifier.subscribe();
        let store = store_with(Arc::clone(&notifier));

        let t = store.start(AlchemistId(7), &request()).await.unwrap();

        assert_eq!(t.status, PendingApproval);
        assert_eq!(t.alchemist_id, AlchemistId(7));
        assert_eq!(t.description, "Lead to gold");
        assert!(t.estimated_cost > 0.0);
        assert_eq!(store.get(t.id), Some(t.clone()));
        assert_eq!(next_kind(&mut sub), EventKind::Started);
    }

    #[tokio::test]
    async fn start_rejects_unknown_alchemist_without_side_effects() {
        let notifier = Arc::new(ChangeNotifier::new(64));
        let mut sub = notifier.subscribe();
        let store = store_with(Arc::clone(&notifier));

        let err = store.start(AlchemistId(99), &request()).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::UnknownAlchemist(AlchemistId(99)))
        ));
        assert!(store.list().is_empty());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn start_rejects_non_positive_quantity() {
        let store = store();
        let req = SimulationRequest::new("x").with_material(1, 0.0);
        let err = store.start(AlchemistId(7), &req).await.unwrap_err();
        assert!(err.is_validation());
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn blank_description_is_defaulted() {
        let store = store();
        let t = store
            .start(AlchemistId(7), &SimulationRequest::default())
            .await
            .unwrap();
        assert_eq!(t.description, "Generic transmutation");
    }

    #[tokio::test]
    async fn one_active_transmutation_per_alchemist() {
        let store = store();
        let first = store.start(AlchemistId(7), &request()).await.unwrap();

        let err = store.start(AlchemistId(7), &request()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::ActiveTransmutation { existing, .. } if existing == first.id
        ));

        // Another alchemist is unaffected.
        store.start(AlchemistId(8), &request()).await.unwrap();

        // Once the first is cancelled the alchemist may start again.
        store
            .transition(first.id, Cancelled, &Actor::alchemist(AlchemistId(7)))
            .await
            .unwrap();
        store.start(AlchemistId(7), &request()).await.unwrap();
    }

    #[tokio::test]
    async fn several_active_allowed_when_disabled() {
        let store = store().with_single_active_per_alchemist(false);
        store.start(AlchemistId(7), &request()).await.unwrap();
        store.start(AlchemistId(7), &request()).await.unwrap();
        assert_eq!(store.list().len(), 2);
    }

    #[tokio::test]
    async fn approve_then_complete_emits_events_in_order() {
        let notifier = Arc::new(ChangeNotifier::new(64));
        let mut sub = notifier.subscribe();
        let store = store_with(Arc::clone(&notifier));
        let t = store.start(AlchemistId(7), &request()).await.unwrap();

        let approved = store
            .transition(t.id, InProgress, &Actor::supervisor())
            .await
            .unwrap();
        assert_eq!(approved.status, InProgress);
        assert_eq!(approved.revision, 2);

        let done = store
            .transition(t.id, Completed, &Actor::supervisor())
            .await
            .unwrap();
        assert_eq!(done.status, Completed);

        assert_eq!(next_kind(&mut sub), EventKind::Started);
        assert_eq!(next_kind(&mut sub), EventKind::Updated);
        assert_eq!(next_kind(&mut sub), EventKind::Completed);
    }

    #[tokio::test]
    async fn alchemist_cannot_approve() {
        let store = store();
        let t = store.start(AlchemistId(7), &request()).await.unwrap();

        let err = store
            .transition(t.id, InProgress, &Actor::alchemist(AlchemistId(7)))
            .await
            .unwrap_err();

        assert_eq!(err.denial(), Some(TransitionDenial::Capability));
        assert_eq!(store.get(t.id).unwrap().status, PendingApproval);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let err = store()
            .transition(TransmutationId(42), Cancelled, &Actor::supervisor())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(TransmutationId(42))));
    }

    #[tokio::test]
    async fn terminal_records_refuse_transitions() {
        let store = store();
        let t = store.start(AlchemistId(7), &request()).await.unwrap();
        store
            .transition(t.id, Cancelled, &Actor::supervisor())
            .await
            .unwrap();

        for target in [PendingApproval, InProgress, Completed] {
            let err = store
                .transition(t.id, target, &Actor::supervisor())
                .await
                .unwrap_err();
            assert_eq!(err.denial(), Some(TransitionDenial::Terminal));
        }
        assert_eq!(store.get(t.id).unwrap().status, Cancelled);
    }

    #[tokio::test]
    async fn same_status_is_noop_without_event() {
        let notifier = Arc::new(ChangeNotifier::new(64));
        let store = store_with(Arc::clone(&notifier));
        let t = store.start(AlchemistId(7), &request()).await.unwrap();
        let mut sub = notifier.subscribe();

        let same = store
            .transition(t.id, PendingApproval, &Actor::alchemist(AlchemistId(7)))
            .await
            .unwrap();

        assert_eq!(same, t);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn stale_precondition_is_rejected() {
        let store = store();
        let t = store.start(AlchemistId(7), &request()).await.unwrap();
        store
            .transition(t.id, InProgress, &Actor::supervisor())
            .await
            .unwrap();

        let err = store
            .transition_expecting(t.id, PendingApproval, Cancelled, &Actor::supervisor())
            .await
            .unwrap_err();

        assert_eq!(
            err.denial(),
            Some(TransitionDenial::StalePrecondition {
                expected: PendingApproval
            })
        );
        assert_eq!(store.get(t.id).unwrap().status, InProgress);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transitions_have_exactly_one_winner() {
        for _ in 0..25 {
            let store = Arc::new(store().with_single_active_per_alchemist(false));
            let id = store.start(AlchemistId(7), &request()).await.unwrap().id;
            store
                .transition(id, InProgress, &Actor::supervisor())
                .await
                .unwrap();

            let race = |target| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .transition_expecting(id, InProgress, target, &Actor::supervisor())
                        .await
                })
            };
            let a = race(Completed);
            let b = race(Cancelled);
            let (a, b) = (a.await.unwrap(), b.await.unwrap());

            let winner = match (&a, &b) {
                (Ok(w), Err(e)) | (Err(e), Ok(w)) => {
                    assert!(e.is_illegal_transition());
                    w.status
                }
                _ => panic!("expected exactly one winner: {a:?} / {b:?}"),
            };
            assert_eq!(store.get(id).unwrap().status, winner);
        }
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = store().with_single_active_per_alchemist(false);
        let a = store.start(AlchemistId(7), &request()).await.unwrap();
        let b = store.start(AlchemistId(8), &request()).await.unwrap();
        let ids: Vec<_> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
