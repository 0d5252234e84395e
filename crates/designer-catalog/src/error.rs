//! Error types for catalog lookups

use std::fmt;

/// Identity of one memoized catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogKey {
    /// The category list
    Categories,
    /// Models of a category
    Models(String),
    /// Components of a model
    Components(String),
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Categories => write!(f, "categories"),
            Self::Models(category) => write!(f, "models of '{category}'"),
            Self::Components(model) => write!(f, "components of '{model}'"),
        }
    }
}

/// Failure reported by a catalog source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CatalogSourceError(pub String);

impl CatalogSourceError {
    /// Create source error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Catalog lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The source failed to produce the lookup
    #[error("fetching {key} failed: {cause}")]
    FetchFailed {
        /// Lookup that failed
        key: CatalogKey,
        /// Source-reported cause
        cause: String,
    },

    /// The source did not answer in time
    #[error("fetching {key} timed out after {after_ms}ms")]
    TimedOut {
        /// Lookup that timed out
        key: CatalogKey,
        /// Timeout that elapsed
        after_ms: u64,
    },

    /// A catalog definition could not be parsed
    #[error("invalid catalog definition: {0}")]
    InvalidDefinition(String),
}

impl CatalogError {
    /// Create fetch failure for key
    pub fn fetch_failed(key: CatalogKey, cause: impl Into<String>) -> Self {
        Self::FetchFailed {
            key,
            cause: cause.into(),
        }
    }

    /// Lookup this error belongs to, if any
    #[must_use]
    pub fn key(&self) -> Option<&CatalogKey> {
        match self {
            Self::FetchFailed { key, .. } | Self::TimedOut { key, .. } => Some(key),
            Self::InvalidDefinition(_) => None,
        }
    }
}
