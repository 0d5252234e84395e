//! In-memory persistence backend

use crate::error::PersistenceError;
use crate::port::PersistencePort;
use crate::state::DesignId;
use async_trait::async_trait;
use dashmap::DashMap;
use designer_document::DesignDocument;

/// Designs kept in a concurrent map, keyed by generated ULIDs
#[derive(Debug, Default)]
pub struct MemoryDesignStore {
    designs: DashMap<DesignId, DesignDocument>,
}

impl MemoryDesignStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored designs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.designs.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }

    /// Whether a design is stored under `id`
    #[must_use]
    pub fn contains(&self, id: &DesignId) -> bool {
        self.designs.contains_key(id)
    }
}

#[async_trait]
impl PersistencePort for MemoryDesignStore {
    async fn create(&self, document: &DesignDocument) -> Result<DesignId, PersistenceError> {
        let id = DesignId::generate();
        let mut stored = document.clone();
        stored.id = Some(id.to_string());
        self.designs.insert(id.clone(), stored);
        Ok(id)
    }

    async fn replace(&self, id: &DesignId, document: &DesignDocument) -> Result<(), PersistenceError> {
        let mut slot = self
            .designs
            .get_mut(id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        let mut stored = document.clone();
        stored.id = Some(id.to_string());
        *slot = stored;
        Ok(())
    }

    async fn remove(&self, id: &DesignId) -> Result<(), PersistenceError> {
        self.designs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))
    }

    async fn fetch(&self, id: &DesignId) -> Result<DesignDocument, PersistenceError> {
        self.designs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))
    }
}
