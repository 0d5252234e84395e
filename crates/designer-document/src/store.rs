//! Canonical document store
//!
//! Holds the single in-memory [`DesignDocument`]. Every projection (YAML
//! text, JSON object, icon list) is derived from it on demand, and every
//! write goes through a keyed merge that holds the write lock for the whole
//! entry update.

use crate::document::{DesignDocument, DisplayMetadata, ServiceEntry, Settings, TRAITS_KEY};
use crate::error::DocumentError;
use designer_catalog::ComponentSchema;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// What changed in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A service entry was created or its settings replaced
    ServiceUpdated(String),
    /// A service entry was removed
    ServiceRemoved(String),
    /// The whole document was replaced
    Replaced,
    /// Only the persistence id changed
    IdentityAssigned,
}

impl ChangeKind {
    /// Whether the change alters design content, as opposed to identity
    #[inline]
    #[must_use]
    pub fn is_content(&self) -> bool {
        !matches!(self, Self::IdentityAssigned)
    }
}

/// Change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    /// Content revision after the change
    pub revision: u64,
    /// What changed
    pub kind: ChangeKind,
}

/// Synchronous change observer
///
/// Called after the write lock is released, on the writer's thread.
pub trait DocumentObserver: Send + Sync {
    /// React to a committed change
    fn document_changed(&self, change: &DocumentChange);
}

#[derive(Debug, Default)]
struct StoreInner {
    document: DesignDocument,
    revision: u64,
}

/// Owner of the design document for one configurator session
pub struct DocumentStore {
    inner: RwLock<StoreInner>,
    observers: RwLock<Vec<Arc<dyn DocumentObserver>>>,
    events: broadcast::Sender<DocumentChange>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("DocumentStore")
            .field("revision", &inner.revision)
            .field("services", &inner.document.services.len())
            .finish_non_exhaustive()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(64)
    }
}

impl DocumentStore {
    /// Empty store with the given change-event buffer
    #[must_use]
    pub fn new(event_capacity: usize) -> Self {
        Self::with_document(DesignDocument::new(), event_capacity)
    }

    /// Store seeded with an existing document
    #[must_use]
    pub fn with_document(document: DesignDocument, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            inner: RwLock::new(StoreInner {
                document,
                revision: 0,
            }),
            observers: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Register a synchronous observer
    pub fn register_observer(&self, observer: Arc<dyn DocumentObserver>) {
        self.observers.write().push(observer);
    }

    /// Subscribe to change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.events.subscribe()
    }

    /// Merge one component's form settings into its service entry
    ///
    /// The entry keyed by the component kind is created if absent; its
    /// settings are replaced by `settings` (last write wins), its traits are
    /// kept and refreshed with the component's display metadata. No other
    /// key is touched.
    ///
    /// # Errors
    /// `InvalidComponentEdit` if the component schema is marked invalid
    pub fn apply_component_settings(
        &self,
        component: &ComponentSchema,
        mut settings: Settings,
    ) -> Result<DocumentChange, DocumentError> {
        let kind = component.kind.clone();
        if component.has_invalid_schema() {
            tracing::warn!(%kind, "rejected edit of component with invalid schema");
            return Err(DocumentError::InvalidComponentEdit(kind));
        }

        if settings.remove(TRAITS_KEY).is_some() {
            tracing::debug!(%kind, "ignored reserved traits key in settings");
        }

        let change = {
            let mut inner = self.inner.write();
            let entry = inner.document.services.entry(kind.clone()).or_default();
            entry.settings = settings;
            if component.metadata.has_display_metadata() {
                entry.merge_display_fields(component.metadata.display_fields());
            }
            inner.revision += 1;
            let change = DocumentChange {
                revision: inner.revision,
                kind: ChangeKind::ServiceUpdated(kind),
            };
            self.broadcast(&change);
            change
        };

        tracing::debug!(revision = change.revision, "component settings merged");
        self.notify(&change);
        Ok(change)
    }

    /// Variant of [`apply_component_settings`](Self::apply_component_settings)
    /// taking an untyped form value
    ///
    /// # Errors
    /// `SettingsNotAnObject` for non-object values, otherwise as the typed variant
    pub fn apply_component_value(
        &self,
        component: &ComponentSchema,
        settings: Value,
    ) -> Result<DocumentChange, DocumentError> {
        match settings {
            Value::Object(map) => self.apply_component_settings(component, map),
            Value::Null => self.apply_component_settings(component, Settings::new()),
            _ => Err(DocumentError::SettingsNotAnObject(component.kind.clone())),
        }
    }

    /// Remove a service entry; returns whether it existed
    pub fn remove_service(&self, key: &str) -> bool {
        let change = {
            let mut inner = self.inner.write();
            if inner.document.services.shift_remove(key).is_none() {
                return false;
            }
            inner.revision += 1;
            let change = DocumentChange {
                revision: inner.revision,
                kind: ChangeKind::ServiceRemoved(key.to_string()),
            };
            self.broadcast(&change);
            change
        };
        self.notify(&change);
        true
    }

    /// Replace the whole document, e.g. when mounting a persisted design
    pub fn hydrate(&self, document: DesignDocument) -> DocumentChange {
        let change = {
            let mut inner = self.inner.write();
            inner.document = document;
            inner.revision += 1;
            let change = DocumentChange {
                revision: inner.revision,
                kind: ChangeKind::Replaced,
            };
            self.broadcast(&change);
            change
        };
        tracing::info!(revision = change.revision, "document hydrated");
        self.notify(&change);
        change
    }

    /// Apply an edit made in the YAML text view
    ///
    /// The persistence id is not editable through text and is kept.
    ///
    /// # Errors
    /// `Projection` if the text is not a design document
    pub fn replace_from_yaml(&self, text: &str) -> Result<DocumentChange, DocumentError> {
        let mut parsed = DesignDocument::from_yaml(text)?;
        let change = {
            let mut inner = self.inner.write();
            parsed.id = inner.document.id.clone();
            inner.document = parsed;
            inner.revision += 1;
            let change = DocumentChange {
                revision: inner.revision,
                kind: ChangeKind::Replaced,
            };
            self.broadcast(&change);
            change
        };
        self.notify(&change);
        Ok(change)
    }

    /// Set or clear the persistence id without bumping the content revision
    pub fn assign_id(&self, id: Option<String>) {
        let change = {
            let mut inner = self.inner.write();
            if inner.document.id == id {
                return;
            }
            inner.document.id = id;
            let change = DocumentChange {
                revision: inner.revision,
                kind: ChangeKind::IdentityAssigned,
            };
            self.broadcast(&change);
            change
        };
        self.notify(&change);
    }

    /// YAML text projection
    ///
    /// # Errors
    /// `Projection` if encoding fails
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        Ok(self.inner.read().document.to_yaml()?)
    }

    /// JSON object projection
    ///
    /// # Errors
    /// `Projection` if encoding fails
    pub fn to_json(&self) -> Result<Value, DocumentError> {
        Ok(self.inner.read().document.to_json()?)
    }

    /// Services carrying display metadata, in document order
    #[must_use]
    pub fn services_with_metadata(&self) -> Vec<(String, DisplayMetadata)> {
        self.inner
            .read()
            .document
            .services
            .iter()
            .filter_map(|(key, entry)| entry.display_metadata().map(|meta| (key.clone(), meta)))
            .collect()
    }

    /// Copy of one service entry
    #[must_use]
    pub fn service(&self, key: &str) -> Option<ServiceEntry> {
        self.inner.read().document.services.get(key).cloned()
    }

    /// Copy of the whole document
    #[must_use]
    pub fn document(&self) -> DesignDocument {
        self.inner.read().document.clone()
    }

    /// Copy of the document together with its content revision
    #[must_use]
    pub fn snapshot(&self) -> (DesignDocument, u64) {
        let inner = self.inner.read();
        (inner.document.clone(), inner.revision)
    }

    /// Current content revision
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Send a change event; called with the write lock held so the stream
    /// is ordered by revision
    fn broadcast(&self, change: &DocumentChange) {
        // No receivers is fine
        let _ = self.events.send(change.clone());
    }

    /// Run synchronous observers; called after the write lock is released,
    /// so concurrent writers may reach observers out of revision order
    fn notify(&self, change: &DocumentChange) {
        let observers = self.observers.read().clone();
        for observer in &observers {
            observer.document_changed(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use designer_catalog::ComponentMetadata;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(value: Value) -> Settings {
        match value {
            Value::Object(map) => map,
            _ => Settings::new(),
        }
    }

    fn container() -> ComponentSchema {
        ComponentSchema::new("container")
            .with_metadata(ComponentMetadata::default().with_icon("#326CE5", "k8s-white.svg"))
    }

    #[test]
    fn creates_entry_for_component() {
        let store = DocumentStore::default();
        store
            .apply_component_settings(&container(), settings(json!({ "image": "nginx" })))
            .unwrap();

        let json = store.to_json().unwrap();
        assert_eq!(json["services"]["container"]["image"], json!("nginx"));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn last_write_wins_per_key() {
        let store = DocumentStore::default();
        let volume = ComponentSchema::new("volume");

        store
            .apply_component_settings(&volume, settings(json!({ "size": "1Gi" })))
            .unwrap();
        store
            .apply_component_settings(&container(), settings(json!({ "image": "nginx", "replicas": 2 })))
            .unwrap();
        store
            .apply_component_settings(&container(), settings(json!({ "image": "redis" })))
            .unwrap();

        let entry = store.service("container").unwrap();
        assert_eq!(entry.settings, settings(json!({ "image": "redis" })));
        assert_eq!(
            store.service("volume").unwrap().settings,
            settings(json!({ "size": "1Gi" }))
        );
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let store = DocumentStore::default();
        let volume = ComponentSchema::new("volume").with_metadata(ComponentMetadata::invalid());

        let err = store
            .apply_component_settings(&volume, settings(json!({ "size": "1Gi" })))
            .unwrap_err();

        assert!(matches!(err, DocumentError::InvalidComponentEdit(kind) if kind == "volume"));
        assert!(store.service("volume").is_none());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn traits_survive_settings_replacement() {
        let store = DocumentStore::default();
        store
            .apply_component_settings(&container(), settings(json!({ "image": "nginx" })))
            .unwrap();
        store
            .apply_component_settings(
                &container(),
                settings(json!({ "image": "nginx:1.27", "traits": { "evil": true } })),
            )
            .unwrap();

        let entry = store.service("container").unwrap();
        assert!(!entry.settings.contains_key("traits"));
        assert!(!entry.traits.contains_key("evil"));

        let icons = store.services_with_metadata();
        assert_eq!(icons.len(), 1);
        assert_eq!(icons[0].0, "container");
        assert_eq!(icons[0].1.primary_color.as_deref(), Some("#326CE5"));
    }

    #[test]
    fn services_without_metadata_are_not_listed() {
        let store = DocumentStore::default();
        store
            .apply_component_settings(&ComponentSchema::new("plain"), Settings::new())
            .unwrap();
        assert!(store.services_with_metadata().is_empty());
    }

    #[test]
    fn non_object_values_are_rejected() {
        let store = DocumentStore::default();
        let err = store
            .apply_component_value(&container(), json!("nginx"))
            .unwrap_err();
        assert!(matches!(err, DocumentError::SettingsNotAnObject(_)));

        store.apply_component_value(&container(), Value::Null).unwrap();
        assert!(store.service("container").unwrap().settings.is_empty());
    }

    #[test]
    fn yaml_and_json_describe_same_document() {
        let store = DocumentStore::default();
        store
            .apply_component_settings(&container(), settings(json!({ "image": "nginx", "ports": [80, 443] })))
            .unwrap();

        let from_yaml = DesignDocument::from_yaml(&store.to_yaml().unwrap()).unwrap();
        let from_json = DesignDocument::from_json(store.to_json().unwrap()).unwrap();
        assert_eq!(from_yaml, from_json);
        assert_eq!(from_yaml, store.document());
    }

    #[test]
    fn text_edits_keep_identity() {
        let store = DocumentStore::default();
        store.assign_id(Some("design-1".to_string()));
        assert_eq!(store.revision(), 0);

        store
            .replace_from_yaml("services:\n  web:\n    image: httpd\n")
            .unwrap();

        let doc = store.document();
        assert_eq!(doc.id.as_deref(), Some("design-1"));
        assert_eq!(doc.services["web"].settings.get("image"), Some(&json!("httpd")));
        assert!(store.replace_from_yaml("services: [").is_err());
    }

    #[test]
    fn remove_service_reports_presence() {
        let store = DocumentStore::default();
        store.apply_component_settings(&container(), Settings::new()).unwrap();
        assert!(store.remove_service("container"));
        assert!(!store.remove_service("container"));
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn observers_see_every_change() {
        struct Counter(AtomicUsize);
        impl DocumentObserver for Counter {
            fn document_changed(&self, change: &DocumentChange) {
                if change.kind.is_content() {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let store = DocumentStore::default();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        store.register_observer(counter.clone());
        let mut events = store.subscribe();

        store.apply_component_settings(&container(), Settings::new()).unwrap();
        store.assign_id(Some("x".to_string()));
        store.hydrate(DesignDocument::new());

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(
            events.try_recv().unwrap().kind,
            ChangeKind::ServiceUpdated("container".to_string())
        );
        assert_eq!(events.try_recv().unwrap().kind, ChangeKind::IdentityAssigned);
        assert_eq!(events.try_recv().unwrap().kind, ChangeKind::Replaced);
    }

    #[test]
    fn concurrent_writers_to_distinct_keys_all_land() {
        let store = DocumentStore::default();
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..50 {
                        let component = ComponentSchema::new(format!("svc-{worker}"));
                        store
                            .apply_component_settings(&component, settings(json!({ "round": round })))
                            .unwrap();
                    }
                });
            }
        });

        let doc = store.document();
        assert_eq!(doc.services.len(), 8);
        for worker in 0..8 {
            assert_eq!(
                doc.services[&format!("svc-{worker}")].settings.get("round"),
                Some(&json!(49))
            );
        }
        assert_eq!(store.revision(), 400);
    }

    #[test]
    fn change_stream_is_ordered_under_concurrent_writers() {
        let store = DocumentStore::new(512);
        let mut events = store.subscribe();
        std::thread::scope(|scope| {
            for worker in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..100 {
                        let component = ComponentSchema::new(format!("svc-{worker}"));
                        store
                            .apply_component_settings(&component, settings(json!({ "round": round })))
                            .unwrap();
                    }
                });
            }
        });

        let revisions: Vec<u64> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|change| change.revision)
            .collect();
        assert_eq!(revisions, (1..=400).collect::<Vec<_>>());
    }
}
