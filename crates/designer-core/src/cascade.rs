//! Category -> model -> component selection cascade
//!
//! Every committed selection bumps a generation counter. A component fetch
//! records the generation it was issued under and its result is only
//! written back if that generation is still current, so a slow response
//! for an abandoned model can never overwrite a newer selection.

use crate::error::SelectionError;
use designer_catalog::{CatalogError, CatalogIndex, ComponentSchema, Lookup, Model};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Selection state of the cascade
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing selected
    #[default]
    NoCategory,
    /// Category chosen, no model yet
    CategorySelected {
        /// Selected category
        category: String,
    },
    /// Category and model chosen
    ModelSelected {
        /// Selected category
        category: String,
        /// Selected model
        model: String,
    },
}

impl Selection {
    /// Selected category, if any
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::NoCategory => None,
            Self::CategorySelected { category } | Self::ModelSelected { category, .. } => {
                Some(category)
            }
        }
    }

    /// Selected model, if any
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::ModelSelected { model, .. } => Some(model),
            _ => None,
        }
    }
}

/// Result of a selection call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The selection is current and its data was applied
    Applied,
    /// A newer selection was made while this one was loading; its data was discarded
    Superseded,
    /// Empty name, nothing changed
    Ignored,
}

/// Model selector contents for the current category
#[derive(Debug, Clone)]
pub enum ModelOptions {
    /// No category selected
    SelectCategoryFirst,
    /// Models are being fetched
    Loading,
    /// Selectable models
    Options(Arc<[Model]>),
    /// The category has no models
    NoModels,
    /// The model fetch failed
    Failed(Arc<CatalogError>),
}

/// One entry of the component form list
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentForm {
    /// Component schema the form edits
    pub schema: ComponentSchema,
    /// Whether the form is rendered read-only
    pub disabled: bool,
}

/// Observable cascade status
#[derive(Debug, Clone)]
pub struct CascadeSnapshot {
    /// Generation of the current selection
    pub generation: u64,
    /// Current selection
    pub selection: Selection,
    /// Components of the selected model
    pub components: Lookup<ComponentSchema>,
}

impl Default for CascadeSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            selection: Selection::NoCategory,
            components: Lookup::NotRequested,
        }
    }
}

/// Hierarchical selection over a [`CatalogIndex`]
pub struct ComponentSelectionCascade {
    index: Arc<CatalogIndex>,
    state: Mutex<CascadeSnapshot>,
    watch: watch::Sender<CascadeSnapshot>,
}

impl fmt::Debug for ComponentSelectionCascade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ComponentSelectionCascade")
            .field("generation", &state.generation)
            .field("selection", &state.selection)
            .finish_non_exhaustive()
    }
}

impl ComponentSelectionCascade {
    /// Create a cascade with nothing selected
    #[must_use]
    pub fn new(index: Arc<CatalogIndex>) -> Self {
        let (watch, _) = watch::channel(CascadeSnapshot::default());
        Self {
            index,
            state: Mutex::new(CascadeSnapshot::default()),
            watch,
        }
    }

    /// Select a category
    ///
    /// Clears any model selection and its components, then makes sure the
    /// category's models are fetched. The selection stays in place when the
    /// fetch fails; [`model_options`](Self::model_options) reports the failure.
    ///
    /// # Errors
    /// `Catalog` if the model fetch failed and the selection is still current
    pub async fn select_category(&self, name: &str) -> Result<SelectionOutcome, SelectionError> {
        if name.is_empty() {
            return Ok(SelectionOutcome::Ignored);
        }

        let generation = self.commit(
            Selection::CategorySelected {
                category: name.to_string(),
            },
            Lookup::NotRequested,
        );
        tracing::info!(category = %name, generation, "category selected");

        let result = self.index.models(name).await;
        if !self.is_current(generation) {
            tracing::debug!(category = %name, generation, "category selection superseded");
            return Ok(SelectionOutcome::Superseded);
        }
        match result {
            Ok(_) => Ok(SelectionOutcome::Applied),
            Err(err) => Err(SelectionError::Catalog(err)),
        }
    }

    /// Select a model of the current category
    ///
    /// The model must be one of the category's models. Its components are
    /// fetched and applied only if no newer selection happened meanwhile.
    ///
    /// # Errors
    /// - `NoCategory` if no category is selected
    /// - `UnknownModel` if the model is not part of the category
    /// - `Catalog` if a fetch failed and the selection is still current
    pub async fn select_model(&self, name: &str) -> Result<SelectionOutcome, SelectionError> {
        if name.is_empty() {
            return Ok(SelectionOutcome::Ignored);
        }

        let (category, entry_generation) = {
            let state = self.state.lock();
            let category = state
                .selection
                .category()
                .map(str::to_string)
                .ok_or(SelectionError::NoCategory)?;
            (category, state.generation)
        };

        let models = match self.index.models(&category).await {
            Ok(models) => models,
            Err(_) if !self.is_current(entry_generation) => {
                return Ok(SelectionOutcome::Superseded);
            }
            Err(err) => return Err(SelectionError::Catalog(err)),
        };
        if !models.iter().any(|model| model.name == name) {
            return Err(SelectionError::UnknownModel {
                category,
                model: name.to_string(),
            });
        }

        let generation = {
            let mut state = self.state.lock();
            if state.generation != entry_generation {
                tracing::debug!(
                    model = %name,
                    issued = entry_generation,
                    current = state.generation,
                    "selection changed before model selection committed"
                );
                return Ok(SelectionOutcome::Superseded);
            }
            state.generation += 1;
            state.selection = Selection::ModelSelected {
                category: category.clone(),
                model: name.to_string(),
            };
            state.components = Lookup::Pending;
            self.watch.send_replace(state.clone());
            state.generation
        };
        tracing::info!(%category, model = %name, generation, "model selected");

        let result = self.index.components(name).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::warn!(
                model = %name,
                issued = generation,
                current = state.generation,
                "discarded stale component response"
            );
            return Ok(SelectionOutcome::Superseded);
        }
        match result {
            Ok(items) => {
                tracing::debug!(model = %name, count = items.len(), "components applied");
                state.components = Lookup::from_items(items);
                self.watch.send_replace(state.clone());
                Ok(SelectionOutcome::Applied)
            }
            Err(err) => {
                state.components = Lookup::Failed(err.clone());
                self.watch.send_replace(state.clone());
                Err(SelectionError::Catalog(err))
            }
        }
    }

    /// Current selection
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.state.lock().selection.clone()
    }

    /// Generation of the current selection
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Current status
    #[must_use]
    pub fn snapshot(&self) -> CascadeSnapshot {
        self.state.lock().clone()
    }

    /// Watch status changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CascadeSnapshot> {
        self.watch.subscribe()
    }

    /// Components of the selected model
    #[must_use]
    pub fn components(&self) -> Lookup<ComponentSchema> {
        self.state.lock().components.clone()
    }

    /// Component of the selected model by kind
    #[must_use]
    pub fn find_component(&self, kind: &str) -> Option<ComponentSchema> {
        self.state
            .lock()
            .components
            .items()
            .iter()
            .find(|component| component.kind == kind)
            .cloned()
    }

    /// Model selector contents
    #[must_use]
    pub fn model_options(&self) -> ModelOptions {
        let Some(category) = self.selection().category().map(str::to_string) else {
            return ModelOptions::SelectCategoryFirst;
        };
        match self.index.models_state(&category) {
            Lookup::NotRequested | Lookup::Pending => ModelOptions::Loading,
            Lookup::Ready(models) => ModelOptions::Options(models),
            Lookup::Empty => ModelOptions::NoModels,
            Lookup::Failed(err) => ModelOptions::Failed(err),
        }
    }

    /// One form per component of the selected model
    ///
    /// Components with an invalid schema are listed but disabled.
    #[must_use]
    pub fn component_forms(&self) -> Vec<ComponentForm> {
        self.state
            .lock()
            .components
            .items()
            .iter()
            .map(|schema| ComponentForm {
                disabled: schema.has_invalid_schema(),
                schema: schema.clone(),
            })
            .collect()
    }

    fn commit(&self, selection: Selection, components: Lookup<ComponentSchema>) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        state.selection = selection;
        state.components = components;
        self.watch.send_replace(state.clone());
        state.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }
}
