//! Abstract catalog source

use crate::error::CatalogSourceError;
use crate::model::{Category, ComponentSchema, Model};
use async_trait::async_trait;

/// Source of categories, models and component schemas
///
/// Implementations only fetch; memoization, timeouts and load-state tracking
/// live in [`CatalogIndex`](crate::CatalogIndex).
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Fetch all categories
    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogSourceError>;

    /// Fetch the models of a category
    async fn fetch_models_for_category(
        &self,
        category: &str,
    ) -> Result<Vec<Model>, CatalogSourceError>;

    /// Fetch the components of a model, in render order
    async fn fetch_components_for_model(
        &self,
        model: &str,
    ) -> Result<Vec<ComponentSchema>, CatalogSourceError>;
}
