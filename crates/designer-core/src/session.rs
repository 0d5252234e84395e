//! Configurator session
//!
//! Owns one catalog index, one selection cascade, one document store and
//! one lifecycle, and routes every caller operation to the right one.

use crate::cascade::{ComponentForm, ComponentSelectionCascade, ModelOptions, SelectionOutcome};
use crate::config::SessionConfig;
use crate::error::{SelectionError, SessionError};
use designer_catalog::{CatalogIndex, CatalogPort, Category};
use designer_document::{DisplayMetadata, DocumentChange, DocumentStore};
use designer_lifecycle::{
    DesignId, DesignLifecycle, LifecycleAction, LifecycleError, LifecycleState, PersistencePort,
};
use serde_json::Value;
use std::sync::Arc;

/// One design being assembled
#[derive(Debug)]
pub struct ConfiguratorSession {
    config: SessionConfig,
    catalog: Arc<CatalogIndex>,
    cascade: ComponentSelectionCascade,
    document: Arc<DocumentStore>,
    lifecycle: DesignLifecycle,
}

impl ConfiguratorSession {
    /// Start a session on a new, unsaved design
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        persistence: Arc<dyn PersistencePort>,
        config: SessionConfig,
    ) -> Self {
        let index = Arc::new(CatalogIndex::new(catalog, config.catalog_settings()));
        let document = Arc::new(DocumentStore::new(config.notification_capacity));
        let lifecycle =
            DesignLifecycle::new(persistence, document.clone(), config.persist_timeout());
        tracing::debug!(?config, "configurator session created");
        Self {
            cascade: ComponentSelectionCascade::new(index.clone()),
            catalog: index,
            document,
            lifecycle,
            config,
        }
    }

    /// Start a session on a persisted design
    ///
    /// # Errors
    /// `Lifecycle` if the design cannot be fetched
    pub async fn open(
        catalog: Arc<dyn CatalogPort>,
        persistence: Arc<dyn PersistencePort>,
        config: SessionConfig,
        id: &DesignId,
    ) -> Result<Self, SessionError> {
        let session = Self::new(catalog, persistence, config);
        session.lifecycle.load(id).await?;
        Ok(session)
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Catalog index
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<CatalogIndex> {
        &self.catalog
    }

    /// Selection cascade
    #[inline]
    #[must_use]
    pub fn cascade(&self) -> &ComponentSelectionCascade {
        &self.cascade
    }

    /// Document store
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Arc<DocumentStore> {
        &self.document
    }

    /// Lifecycle
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> &DesignLifecycle {
        &self.lifecycle
    }

    /// All categories
    ///
    /// # Errors
    /// `Catalog` if the fetch failed
    pub async fn categories(&self) -> Result<Arc<[Category]>, SessionError> {
        Ok(self.catalog.categories().await?)
    }

    /// Select a category
    ///
    /// # Errors
    /// See [`ComponentSelectionCascade::select_category`]
    pub async fn select_category(&self, name: &str) -> Result<SelectionOutcome, SessionError> {
        Ok(self.cascade.select_category(name).await?)
    }

    /// Select a model of the current category
    ///
    /// # Errors
    /// See [`ComponentSelectionCascade::select_model`]
    pub async fn select_model(&self, name: &str) -> Result<SelectionOutcome, SessionError> {
        Ok(self.cascade.select_model(name).await?)
    }

    /// Model selector contents
    #[must_use]
    pub fn model_options(&self) -> ModelOptions {
        self.cascade.model_options()
    }

    /// Component forms of the selected model
    #[must_use]
    pub fn component_forms(&self) -> Vec<ComponentForm> {
        self.cascade.component_forms()
    }

    /// Write a component's form settings into the document
    ///
    /// # Errors
    /// - `UnknownComponent` if `kind` is not a component of the selected model
    /// - `InvalidComponentEdit` if the component's schema is invalid
    /// - `SettingsNotAnObject` if `settings` is not an object or null
    pub fn apply_component_settings(
        &self,
        kind: &str,
        settings: Value,
    ) -> Result<DocumentChange, SessionError> {
        let component = self
            .cascade
            .find_component(kind)
            .ok_or_else(|| SelectionError::UnknownComponent(kind.to_string()))?;
        Ok(self.document.apply_component_value(&component, settings)?)
    }

    /// YAML projection of the document
    ///
    /// # Errors
    /// `Document` if serialization fails
    pub fn to_yaml(&self) -> Result<String, SessionError> {
        Ok(self.document.to_yaml()?)
    }

    /// JSON projection of the document
    ///
    /// # Errors
    /// `Document` if serialization fails
    pub fn to_json(&self) -> Result<Value, SessionError> {
        Ok(self.document.to_json()?)
    }

    /// Services carrying display metadata
    #[must_use]
    pub fn services_with_metadata(&self) -> Vec<(String, DisplayMetadata)> {
        self.document.services_with_metadata()
    }

    /// Persist the design for the first time
    ///
    /// # Errors
    /// `Lifecycle` if not unsaved or the backend failed
    pub async fn save(&self) -> Result<DesignId, SessionError> {
        Ok(self.lifecycle.save().await?)
    }

    /// Overwrite the persisted design
    ///
    /// # Errors
    /// `Lifecycle` if the design has no identity, is deleted, or the backend failed
    pub async fn update(&self) -> Result<(), SessionError> {
        let id = self.owned_id(LifecycleAction::Update)?;
        Ok(self.lifecycle.update(&id).await?)
    }

    /// Delete the persisted design
    ///
    /// # Errors
    /// `Lifecycle` if the design has no identity, is already deleted, or the backend failed
    pub async fn delete(&self) -> Result<(), SessionError> {
        let id = self.owned_id(LifecycleAction::Delete)?;
        Ok(self.lifecycle.delete(&id).await?)
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Persistence identity
    #[must_use]
    pub fn design_id(&self) -> Option<DesignId> {
        self.lifecycle.id()
    }

    /// Lifecycle actions currently offered
    #[must_use]
    pub fn available_actions(&self) -> Vec<LifecycleAction> {
        self.lifecycle.available_actions()
    }

    fn owned_id(&self, action: LifecycleAction) -> Result<DesignId, LifecycleError> {
        let snapshot = self.lifecycle.snapshot();
        snapshot.id.ok_or(LifecycleError::TransitionRejected {
            from: snapshot.state,
            attempted: action,
        })
    }
}
