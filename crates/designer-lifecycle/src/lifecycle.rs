//! Design lifecycle
//!
//! Tracks persistence identity and dirtiness of the document owned by a
//! [`DocumentStore`], and performs save/update/delete through a
//! [`PersistencePort`].
//!
//! Operations are serialized by an async mutex held across the port call;
//! the state itself sits behind a short synchronous lock so document edits
//! can flip `Saved -> Dirty` while a call is in flight. State is only
//! written after the port call succeeded.

use crate::error::{LifecycleError, PersistenceError};
use crate::port::PersistencePort;
use crate::state::{
    available_actions, target_state, validate_transition, DesignId, LifecycleAction,
    LifecycleState,
};
use chrono::{DateTime, Utc};
use designer_document::{DesignDocument, DocumentChange, DocumentObserver, DocumentStore};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Observable lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LifecycleSnapshot {
    /// Current state
    pub state: LifecycleState,
    /// Persistence identity; `None` only while unsaved
    pub id: Option<DesignId>,
    /// Time of the last successful round trip
    pub persisted_at: Option<DateTime<Utc>>,
}

/// Status shared with the document store's observer list
#[derive(Debug)]
struct Shared {
    status: Mutex<LifecycleSnapshot>,
    watch: watch::Sender<LifecycleSnapshot>,
}

impl Shared {
    fn snapshot(&self) -> LifecycleSnapshot {
        self.status.lock().clone()
    }
}

impl DocumentObserver for Shared {
    fn document_changed(&self, change: &DocumentChange) {
        if !change.kind.is_content() {
            return;
        }
        let mut status = self.status.lock();
        if let Some(next) = target_state(status.state, LifecycleAction::Edit) {
            if next != status.state {
                tracing::info!(revision = change.revision, "design marked dirty");
                status.state = next;
                self.watch.send_replace(status.clone());
            }
        }
    }
}

/// Persistence lifecycle of one design document
pub struct DesignLifecycle {
    port: Arc<dyn PersistencePort>,
    document: Arc<DocumentStore>,
    persist_timeout: Duration,
    ops: tokio::sync::Mutex<()>,
    shared: Arc<Shared>,
}

impl fmt::Debug for DesignLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesignLifecycle")
            .field("status", &self.shared.snapshot())
            .field("persist_timeout", &self.persist_timeout)
            .finish_non_exhaustive()
    }
}

impl DesignLifecycle {
    /// Create an unsaved lifecycle observing `document`
    #[must_use]
    pub fn new(
        port: Arc<dyn PersistencePort>,
        document: Arc<DocumentStore>,
        persist_timeout: Duration,
    ) -> Self {
        let (watch, _) = watch::channel(LifecycleSnapshot::default());
        let shared = Arc::new(Shared {
            status: Mutex::new(LifecycleSnapshot::default()),
            watch,
        });
        document.register_observer(shared.clone());
        Self {
            port,
            document,
            persist_timeout,
            ops: tokio::sync::Mutex::new(()),
            shared,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.shared.status.lock().state
    }

    /// Current identity
    #[must_use]
    pub fn id(&self) -> Option<DesignId> {
        self.shared.status.lock().id.clone()
    }

    /// Current status
    #[must_use]
    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.shared.snapshot()
    }

    /// Watch status changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleSnapshot> {
        self.shared.watch.subscribe()
    }

    /// Actions a toolbar should offer right now
    #[must_use]
    pub fn available_actions(&self) -> Vec<LifecycleAction> {
        available_actions(self.state())
    }

    /// Persist the document as a new design
    ///
    /// # Errors
    /// - `TransitionRejected` unless unsaved
    /// - `PersistenceFailed` if the port fails; state is unchanged
    pub async fn save(&self) -> Result<DesignId, LifecycleError> {
        let _op = self.ops.lock().await;
        let from = self.state();
        validate_transition(from, LifecycleAction::Save)?;

        let (mut document, revision) = self.document.snapshot();
        document.id = None;
        let id = self
            .persist(LifecycleAction::Save, self.port.create(&document))
            .await?;

        self.document.assign_id(Some(id.to_string()));
        let landed = self.settle(Some(id.clone()), revision);
        tracing::info!(%id, state = %landed, "design saved");
        Ok(id)
    }

    /// Overwrite the persisted design with the current document
    ///
    /// # Errors
    /// - `TransitionRejected` unless saved or dirty
    /// - `DesignIdMismatch` if `id` is not the owned design
    /// - `PersistenceFailed` if the port fails; state is unchanged
    pub async fn update(&self, id: &DesignId) -> Result<(), LifecycleError> {
        let _op = self.ops.lock().await;
        let current = self.snapshot();
        validate_transition(current.state, LifecycleAction::Update)?;
        Self::check_owned(current, LifecycleAction::Update, id)?;

        let (mut document, revision) = self.document.snapshot();
        document.id = Some(id.to_string());
        self.persist(LifecycleAction::Update, self.port.replace(id, &document))
            .await?;

        let landed = self.settle(Some(id.clone()), revision);
        tracing::info!(%id, state = %landed, "design updated");
        Ok(())
    }

    /// Remove the persisted design; the lifecycle becomes terminal
    ///
    /// # Errors
    /// - `TransitionRejected` unless saved or dirty
    /// - `DesignIdMismatch` if `id` is not the owned design
    /// - `PersistenceFailed` if the port fails; state is unchanged
    pub async fn delete(&self, id: &DesignId) -> Result<(), LifecycleError> {
        let _op = self.ops.lock().await;
        let current = self.snapshot();
        let next = validate_transition(current.state, LifecycleAction::Delete)?;
        Self::check_owned(current, LifecycleAction::Delete, id)?;

        self.persist(LifecycleAction::Delete, self.port.remove(id))
            .await?;

        self.document.assign_id(None);
        {
            let mut status = self.shared.status.lock();
            status.state = next;
            status.persisted_at = Some(Utc::now());
            self.shared.watch.send_replace(status.clone());
        }
        tracing::info!(%id, "design deleted");
        Ok(())
    }

    /// Adopt a persisted design: hydrate the document and start as saved
    ///
    /// # Errors
    /// - `TransitionRejected` unless unsaved
    /// - `PersistenceFailed` if the design cannot be fetched
    pub async fn load(&self, id: &DesignId) -> Result<DesignDocument, LifecycleError> {
        let _op = self.ops.lock().await;
        validate_transition(self.state(), LifecycleAction::Load)?;

        let mut document = self
            .persist(LifecycleAction::Load, self.port.fetch(id))
            .await?;
        document.id = Some(id.to_string());

        let change = self.document.hydrate(document.clone());
        let landed = self.settle(Some(id.clone()), change.revision);
        tracing::info!(%id, state = %landed, "design loaded");
        Ok(document)
    }

    fn check_owned(
        current: LifecycleSnapshot,
        action: LifecycleAction,
        id: &DesignId,
    ) -> Result<(), LifecycleError> {
        match current.id {
            Some(owned) if &owned == id => Ok(()),
            Some(owned) => Err(LifecycleError::DesignIdMismatch {
                expected: owned,
                actual: id.clone(),
            }),
            None => Err(LifecycleError::TransitionRejected {
                from: current.state,
                attempted: action,
            }),
        }
    }

    /// Record a successful round trip of the document at `revision`
    ///
    /// Lands in `Dirty` if the document moved on while the call was in
    /// flight. The status lock is taken before reading the revision so a
    /// concurrent edit is either seen here or by the observer afterwards.
    fn settle(&self, id: Option<DesignId>, revision: u64) -> LifecycleState {
        let mut status = self.shared.status.lock();
        status.state = if self.document.revision() > revision {
            LifecycleState::Dirty
        } else {
            LifecycleState::Saved
        };
        status.id = id;
        status.persisted_at = Some(Utc::now());
        self.shared.watch.send_replace(status.clone());
        status.state
    }

    async fn persist<T, F>(&self, operation: LifecycleAction, call: F) -> Result<T, LifecycleError>
    where
        F: Future<Output = Result<T, PersistenceError>>,
    {
        let cause = match tokio::time::timeout(self.persist_timeout, call).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(cause)) => cause,
            Err(_) => PersistenceError::TimedOut {
                after_ms: u64::try_from(self.persist_timeout.as_millis()).unwrap_or(u64::MAX),
            },
        };
        tracing::error!(%operation, error = %cause, "persistence call failed");
        Err(LifecycleError::PersistenceFailed { operation, cause })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDesignStore;
    use async_trait::async_trait;
    use designer_catalog::ComponentSchema;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Memory store with switchable failure and an optional gate on create
    #[derive(Default)]
    struct ScriptedPort {
        inner: MemoryDesignStore,
        fail: AtomicBool,
        hang: AtomicBool,
        started: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedPort {
        fn check(&self) -> Result<(), PersistenceError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(PersistenceError::Backend("unavailable".to_string()))
            } else {
                Ok(())
            }
        }

        async fn wait(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
        }
    }

    #[async_trait]
    impl PersistencePort for ScriptedPort {
        async fn create(&self, document: &DesignDocument) -> Result<DesignId, PersistenceError> {
            self.wait().await;
            self.check()?;
            self.inner.create(document).await
        }

        async fn replace(
            &self,
            id: &DesignId,
            document: &DesignDocument,
        ) -> Result<(), PersistenceError> {
            self.wait().await;
            self.check()?;
            self.inner.replace(id, document).await
        }

        async fn remove(&self, id: &DesignId) -> Result<(), PersistenceError> {
            self.check()?;
            self.inner.remove(id).await
        }

        async fn fetch(&self, id: &DesignId) -> Result<DesignDocument, PersistenceError> {
            self.check()?;
            self.inner.fetch(id).await
        }
    }

    fn setup(port: Arc<ScriptedPort>) -> (Arc<DocumentStore>, Arc<DesignLifecycle>) {
        let document = Arc::new(DocumentStore::default());
        let lifecycle = Arc::new(DesignLifecycle::new(
            port,
            document.clone(),
            Duration::from_secs(5),
        ));
        (document, lifecycle)
    }

    fn edit(document: &DocumentStore, image: &str) {
        document
            .apply_component_value(&ComponentSchema::new("container"), json!({ "image": image }))
            .unwrap();
    }

    #[tokio::test]
    async fn save_assigns_identity() {
        let port = Arc::new(ScriptedPort::default());
        let (document, lifecycle) = setup(port.clone());
        edit(&document, "nginx");

        let id = lifecycle.save().await.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::Saved);
        assert_eq!(lifecycle.id(), Some(id.clone()));
        assert_eq!(document.document().id, Some(id.to_string()));
        assert!(lifecycle.snapshot().persisted_at.is_some());
        assert_eq!(port.inner.len(), 1);
    }

    #[tokio::test]
    async fn second_save_is_rejected() {
        let (_document, lifecycle) = setup(Arc::new(ScriptedPort::default()));
        lifecycle.save().await.unwrap();

        let err = lifecycle.save().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::TransitionRejected {
                from: LifecycleState::Saved,
                attempted: LifecycleAction::Save
            }
        ));
    }

    #[tokio::test]
    async fn edit_dirties_and_update_cleans() {
        let port = Arc::new(ScriptedPort::default());
        let (document, lifecycle) = setup(port.clone());
        let id = lifecycle.save().await.unwrap();

        edit(&document, "nginx");
        assert_eq!(lifecycle.state(), LifecycleState::Dirty);

        lifecycle.update(&id).await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Saved);

        let stored = port.inner.fetch(&id).await.unwrap();
        assert_eq!(stored.services["container"].settings["image"], json!("nginx"));
        assert_eq!(stored.id, Some(id.to_string()));
    }

    #[tokio::test]
    async fn edits_before_first_save_stay_unsaved() {
        let (document, lifecycle) = setup(Arc::new(ScriptedPort::default()));
        edit(&document, "nginx");
        assert_eq!(lifecycle.state(), LifecycleState::Unsaved);
        assert!(lifecycle.id().is_none());
    }

    #[tokio::test]
    async fn delete_is_terminal() {
        let port = Arc::new(ScriptedPort::default());
        let (document, lifecycle) = setup(port.clone());
        let id = lifecycle.save().await.unwrap();

        lifecycle.delete(&id).await.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::Deleted);
        assert!(document.document().id.is_none());
        assert!(port.inner.is_empty());
        assert!(lifecycle.available_actions().is_empty());
        assert!(matches!(
            lifecycle.update(&id).await,
            Err(LifecycleError::TransitionRejected { .. })
        ));
        assert!(matches!(
            lifecycle.save().await,
            Err(LifecycleError::TransitionRejected { .. })
        ));

        edit(&document, "nginx");
        assert_eq!(lifecycle.state(), LifecycleState::Deleted);
    }

    #[tokio::test]
    async fn failed_save_leaves_state_untouched() {
        let port = Arc::new(ScriptedPort::default());
        port.fail.store(true, Ordering::SeqCst);
        let (document, lifecycle) = setup(port.clone());

        let err = lifecycle.save().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PersistenceFailed {
                operation: LifecycleAction::Save,
                cause: PersistenceError::Backend(_)
            }
        ));
        assert_eq!(lifecycle.state(), LifecycleState::Unsaved);
        assert!(lifecycle.id().is_none());
        assert!(document.document().id.is_none());

        port.fail.store(false, Ordering::SeqCst);
        assert!(lifecycle.save().await.is_ok());
    }

    #[tokio::test]
    async fn failed_update_stays_dirty() {
        let port = Arc::new(ScriptedPort::default());
        let (document, lifecycle) = setup(port.clone());
        let id = lifecycle.save().await.unwrap();
        edit(&document, "nginx");

        port.fail.store(true, Ordering::SeqCst);
        assert!(lifecycle.update(&id).await.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Dirty);

        assert!(lifecycle.delete(&id).await.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Dirty);
    }

    #[tokio::test]
    async fn concurrent_saves_only_one_wins() {
        let port = Arc::new(ScriptedPort::default());
        let (_document, lifecycle) = setup(port.clone());

        let (a, b) = tokio::join!(lifecycle.save(), lifecycle.save());

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        let rejected = if a.is_err() { a } else { b };
        assert!(matches!(
            rejected,
            Err(LifecycleError::TransitionRejected { from: LifecycleState::Saved, .. })
        ));
        assert_eq!(port.inner.len(), 1);
    }

    #[tokio::test]
    async fn edit_during_save_lands_dirty() {
        let gate = Arc::new(Notify::new());
        let port = Arc::new(ScriptedPort {
            gate: Some(gate.clone()),
            ..ScriptedPort::default()
        });
        let (document, lifecycle) = setup(port.clone());

        let save = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.save().await }
        });
        while port.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        edit(&document, "edited-while-saving");
        gate.notify_one();

        save.await.unwrap().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_backend_times_out() {
        let port = Arc::new(ScriptedPort::default());
        port.hang.store(true, Ordering::SeqCst);
        let (_document, lifecycle) = setup(port);

        let err = lifecycle.save().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PersistenceFailed {
                cause: PersistenceError::TimedOut { after_ms: 5000 },
                ..
            }
        ));
        assert_eq!(lifecycle.state(), LifecycleState::Unsaved);
    }

    #[tokio::test]
    async fn foreign_id_is_rejected() {
        let (_document, lifecycle) = setup(Arc::new(ScriptedPort::default()));
        lifecycle.save().await.unwrap();

        let err = lifecycle.update(&DesignId::new("someone-else")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::DesignIdMismatch { .. }));
        assert_eq!(lifecycle.state(), LifecycleState::Saved);
    }

    #[tokio::test]
    async fn load_hydrates_document() {
        let port = Arc::new(ScriptedPort::default());
        let seeded = DesignDocument::new().with_name("web");
        let id = port.inner.create(&seeded).await.unwrap();

        let (document, lifecycle) = setup(port);
        let loaded = lifecycle.load(&id).await.unwrap();

        assert_eq!(loaded.name.as_deref(), Some("web"));
        assert_eq!(document.document().id, Some(id.to_string()));
        assert_eq!(lifecycle.state(), LifecycleState::Saved);
        assert!(matches!(
            lifecycle.load(&id).await,
            Err(LifecycleError::TransitionRejected { .. })
        ));
    }

    #[tokio::test]
    async fn watchers_observe_transitions() {
        let (document, lifecycle) = setup(Arc::new(ScriptedPort::default()));
        let mut rx = lifecycle.subscribe();

        lifecycle.save().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, LifecycleState::Saved);

        edit(&document, "nginx");
        assert_eq!(rx.borrow_and_update().state, LifecycleState::Dirty);
    }
}
