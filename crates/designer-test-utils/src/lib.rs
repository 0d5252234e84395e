//! Testing utilities for the designer workspace
//!
//! Catalog fixtures, a catalog source whose responses can be held back and
//! released in any order, and a persistence backend with injectable failures.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use designer_catalog::{
    CatalogPort, CatalogSourceError, Category, CategoryDefinition, ComponentMetadata,
    ComponentSchema, Model, StaticCatalog,
};
use designer_document::DesignDocument;
use designer_lifecycle::{DesignId, MemoryDesignStore, PersistenceError, PersistencePort};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

pub const CONTAINER_ICON: &str = "<svg>container</svg>";

pub fn container_component() -> ComponentSchema {
    ComponentSchema::new("container")
        .with_metadata(ComponentMetadata::default().with_icon("#326CE5", CONTAINER_ICON))
        .with_form_schema(serde_json::json!({
            "type": "object",
            "properties": { "image": { "type": "string" }, "replicas": { "type": "integer" } }
        }))
}

pub fn volume_component() -> ComponentSchema {
    ComponentSchema::new("volume").with_metadata(ComponentMetadata::invalid())
}

/// Kubernetes with Deployment and Service, Istio with one model, Empty with none
pub fn kubernetes_catalog() -> StaticCatalog {
    let catalog = StaticCatalog::default()
        .with_model(
            "Kubernetes",
            "Deployment",
            vec![container_component(), volume_component()],
        )
        .with_model("Kubernetes", "Service", vec![ComponentSchema::new("port")])
        .with_model(
            "Istio",
            "VirtualService",
            vec![ComponentSchema::new("route"), ComponentSchema::new("gateway")],
        );
    let mut definition = catalog.definition().clone();
    definition.categories.push(CategoryDefinition {
        name: "Empty".to_string(),
        models: Vec::new(),
    });
    StaticCatalog::new(definition)
}

/// Catalog whose fetches can be held until released
///
/// Ungated keys answer immediately. A held key blocks every fetch for it
/// until [`release_components`](Self::release_components) or
/// [`release_models`](Self::release_models) opens the gate; an open gate
/// stays open.
pub struct GatedCatalog {
    inner: StaticCatalog,
    gates: DashMap<String, watch::Sender<bool>>,
    failures: DashMap<String, String>,
    calls: DashMap<String, usize>,
}

impl GatedCatalog {
    pub fn new(inner: StaticCatalog) -> Self {
        Self {
            inner,
            gates: DashMap::new(),
            failures: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    pub fn hold_models(&self, category: &str) {
        self.hold(models_key(category));
    }

    pub fn release_models(&self, category: &str) {
        self.release(&models_key(category));
    }

    pub fn hold_components(&self, model: &str) {
        self.hold(components_key(model));
    }

    pub fn release_components(&self, model: &str) {
        self.release(&components_key(model));
    }

    pub fn fail_components(&self, model: &str, reason: &str) {
        self.failures
            .insert(components_key(model), reason.to_string());
    }

    pub fn heal_components(&self, model: &str) {
        self.failures.remove(&components_key(model));
    }

    pub fn model_calls(&self, category: &str) -> usize {
        self.count(&models_key(category))
    }

    pub fn component_calls(&self, model: &str) -> usize {
        self.count(&components_key(model))
    }

    fn hold(&self, key: String) {
        let (tx, _) = watch::channel(false);
        self.gates.insert(key, tx);
    }

    fn release(&self, key: &str) {
        if let Some(gate) = self.gates.get(key) {
            gate.send_replace(true);
        }
    }

    fn count(&self, key: &str) -> usize {
        self.calls.get(key).map_or(0, |calls| *calls)
    }

    async fn enter(&self, key: String) -> Result<(), CatalogSourceError> {
        *self.calls.entry(key.clone()).or_insert(0) += 1;
        let gate = self.gates.get(&key).map(|gate| gate.subscribe());
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
        match self.failures.get(&key) {
            Some(reason) => Err(CatalogSourceError::new(reason.value().clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogPort for GatedCatalog {
    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogSourceError> {
        self.enter("categories".to_string()).await?;
        self.inner.fetch_categories().await
    }

    async fn fetch_models_for_category(
        &self,
        category: &str,
    ) -> Result<Vec<Model>, CatalogSourceError> {
        self.enter(models_key(category)).await?;
        self.inner.fetch_models_for_category(category).await
    }

    async fn fetch_components_for_model(
        &self,
        model: &str,
    ) -> Result<Vec<ComponentSchema>, CatalogSourceError> {
        self.enter(components_key(model)).await?;
        self.inner.fetch_components_for_model(model).await
    }
}

fn models_key(category: &str) -> String {
    format!("models:{category}")
}

fn components_key(model: &str) -> String {
    format!("components:{model}")
}

/// Memory store that fails the next `n` calls
#[derive(Default)]
pub struct FlakyPersistence {
    inner: MemoryDesignStore,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &MemoryDesignStore {
        &self.inner
    }

    fn check(&self) -> Result<(), PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(PersistenceError::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistencePort for FlakyPersistence {
    async fn create(&self, document: &DesignDocument) -> Result<DesignId, PersistenceError> {
        self.check()?;
        self.inner.create(document).await
    }

    async fn replace(&self, id: &DesignId, document: &DesignDocument) -> Result<(), PersistenceError> {
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
