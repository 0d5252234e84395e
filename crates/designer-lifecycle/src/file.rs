//! Directory-backed persistence backend
//!
//! One `<id>.yaml` file per design. Each write goes to its own hidden
//! temporary file first and is renamed into place.

use crate::error::PersistenceError;
use crate::port::PersistencePort;
use crate::state::DesignId;
use async_trait::async_trait;
use designer_document::DesignDocument;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// Designs stored as YAML files in a directory
#[derive(Debug, Clone)]
pub struct FileDesignStore {
    root: PathBuf,
}

impl FileDesignStore {
    /// Store rooted at `root`; the directory is created on first write
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids of all stored designs, sorted
    ///
    /// # Errors
    /// If the directory cannot be read
    pub async fn list(&self) -> Result<Vec<DesignId>, PersistenceError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(DesignId::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn path_for(&self, id: &DesignId) -> Result<PathBuf, PersistenceError> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PersistenceError::Backend(format!("invalid design id: {id}")));
        }
        Ok(self.root.join(format!("{id}.yaml")))
    }

    async fn write(&self, id: &DesignId, document: &DesignDocument) -> Result<(), PersistenceError> {
        let path = self.path_for(id)?;
        let mut stored = document.clone();
        stored.id = Some(id.to_string());
        let text = stored.to_yaml()?;

        tokio::fs::create_dir_all(&self.root).await?;
        // Unique per write; never ends in `.yaml` so `list` skips it
        let tmp = self.root.join(format!(".{id}.{}.tmp", Ulid::new()));
        if let Err(err) = Self::write_then_rename(&tmp, &path, text).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        path = %tmp.display(),
                        error = %cleanup,
                        "temporary design file left behind"
                    );
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn write_then_rename(tmp: &Path, path: &Path, text: String) -> std::io::Result<()> {
        tokio::fs::write(tmp, text).await?;
        tokio::fs::rename(tmp, path).await
    }

    fn not_found(id: &DesignId, err: std::io::Error) -> PersistenceError {
        if err.kind() == ErrorKind::NotFound {
            PersistenceError::NotFound(id.clone())
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl PersistencePort for FileDesignStore {
    async fn create(&self, document: &DesignDocument) -> Result<DesignId, PersistenceError> {
        let id = DesignId::generate();
        self.write(&id, document).await?;
        tracing::debug!(%id, root = %self.root.display(), "design file created");
        Ok(id)
    }

    async fn replace(&self, id: &DesignId, document: &DesignDocument) -> Result<(), PersistenceError> {
        let path = self.path_for(id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(PersistenceError::NotFound(id.clone()));
        }
        self.write(id, document).await
    }

    async fn remove(&self, id: &DesignId) -> Result<(), PersistenceError> {
        let path = self.path_for(id)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Self::not_found(id, e))
    }

    async fn fetch(&self, id: &DesignId) -> Result<DesignDocument, PersistenceError> {
        let path = self.path_for(id)?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Self::not_found(id, e))?;
        Ok(DesignDocument::from_yaml(&text)?)
    }
}
