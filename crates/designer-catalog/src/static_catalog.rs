//! In-memory catalog source
//!
//! Serves a catalog tree declared up front, typically loaded from YAML:
//!
//! ```yaml
//! categories:
//!   - name: Kubernetes
//!     models:
//!       - name: Deployment
//!         displayName: Deployment
//!         components:
//!           - kind: container
//!             metadata: { primaryColor: "#326CE5", svgWhite: "k8s.svg" }
//! ```

use crate::error::{CatalogError, CatalogSourceError};
use crate::model::{Category, ComponentSchema, Model};
use crate::port::CatalogPort;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declared catalog tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    /// Categories in display order
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,
}

/// Declared category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Category name
    pub name: String,
    /// Models in display order
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
}

/// Declared model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    /// Model name
    pub name: String,
    /// Display name, defaults to the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Components in render order
    #[serde(default)]
    pub components: Vec<ComponentSchema>,
}

/// Catalog source answering from a [`CatalogDefinition`]
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    definition: CatalogDefinition,
}

impl StaticCatalog {
    /// Create from definition
    #[inline]
    #[must_use]
    pub fn new(definition: CatalogDefinition) -> Self {
        Self { definition }
    }

    /// Parse a YAML catalog definition
    ///
    /// # Errors
    /// `InvalidDefinition` if the text is not a catalog tree
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(text)
            .map(Self::new)
            .map_err(|e| CatalogError::InvalidDefinition(e.to_string()))
    }

    /// Read and parse a YAML catalog file
    ///
    /// # Errors
    /// `InvalidDefinition` if the file cannot be read or parsed
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::InvalidDefinition(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Add a model with its components, creating the category if needed
    #[must_use]
    pub fn with_model(
        mut self,
        category: impl Into<String>,
        model: impl Into<String>,
        components: Vec<ComponentSchema>,
    ) -> Self {
        let category = category.into();
        let model = ModelDefinition {
            name: model.into(),
            display_name: None,
            components,
        };
        match self
            .definition
            .categories
            .iter_mut()
            .find(|c| c.name == category)
        {
            Some(existing) => existing.models.push(model),
            None => self.definition.categories.push(CategoryDefinition {
                name: category,
                models: vec![model],
            }),
        }
        self
    }

    /// Underlying definition
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &CatalogDefinition {
        &self.definition
    }
}

#[async_trait]
impl CatalogPort for StaticCatalog {
    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogSourceError> {
        Ok(self
            .definition
            .categories
            .iter()
            .map(|c| Category::new(c.name.clone()))
            .collect())
    }

    async fn fetch_models_for_category(
        &self,
        category: &str,
    ) -> Result<Vec<Model>, CatalogSourceError> {
        let models = self
            .definition
            .categories
            .iter()
            .filter(|c| c.name == category)
            .flat_map(|c| c.models.iter())
            .map(|m| {
                let model = Model::new(m.name.clone(), category);
                match &m.display_name {
                    Some(display_name) => model.with_display_name(display_name.clone()),
                    None => model,
                }
            })
            .collect();
        Ok(models)
    }

    async fn fetch_components_for_model(
        &self,
        model: &str,
    ) -> Result<Vec<ComponentSchema>, CatalogSourceError> {
        Ok(self
            .definition
            .categories
            .iter()
            .flat_map(|c| c.models.iter())
            .find(|m| m.name == model)
            .map(|m| m.components.clone())
            .unwrap_or_default())
    }
}
