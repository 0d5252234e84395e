//! Error types for configurator sessions

use designer_catalog::CatalogError;
use designer_document::DocumentError;
use designer_lifecycle::LifecycleError;
use std::sync::Arc;

/// Selection cascade errors
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// A model was selected before any category
    #[error("select a category first")]
    NoCategory,

    /// The model does not belong to the selected category
    #[error("model '{model}' is not part of category '{category}'")]
    UnknownModel {
        /// Selected category
        category: String,
        /// Requested model
        model: String,
    },

    /// The component is not part of the selected model
    #[error("component '{0}' is not part of the selected model")]
    UnknownComponent(String),

    /// The catalog lookup backing the selection failed
    #[error("catalog lookup failed: {0}")]
    Catalog(Arc<CatalogError>),
}

/// Umbrella error of a configurator session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Catalog lookup failed
    #[error("catalog error: {0}")]
    Catalog(Arc<CatalogError>),

    /// Selection was refused
    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Document edit or projection failed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Lifecycle call failed or was refused
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<Arc<CatalogError>> for SessionError {
    fn from(err: Arc<CatalogError>) -> Self {
        Self::Catalog(err)
    }
}

impl SessionError {
    /// Whether re-issuing the same call may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Catalog(_) | Self::Selection(SelectionError::Catalog(_)) => true,
            Self::Lifecycle(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Whether the caller broke the session contract
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        match self {
            Self::Lifecycle(err) => err.is_contract_violation(),
            Self::Selection(SelectionError::NoCategory) => true,
            _ => false,
        }
    }
}
