//! Abstract persistence of design documents

use crate::error::PersistenceError;
use crate::state::DesignId;
use async_trait::async_trait;
use designer_document::DesignDocument;

/// Create/replace/remove/fetch of a design by id
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Store as a new design, returning its id
    async fn create(&self, document: &DesignDocument) -> Result<DesignId, PersistenceError>;

    /// Overwrite an existing design
    async fn replace(&self, id: &DesignId, document: &DesignDocument)
        -> Result<(), PersistenceError>;

    /// Remove a design
    async fn remove(&self, id: &DesignId) -> Result<(), PersistenceError>;

    /// Load a design
    async fn fetch(&self, id: &DesignId) -> Result<DesignDocument, PersistenceError>;
}
