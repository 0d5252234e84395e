//! Load state of a catalog lookup

use crate::error::CatalogError;
use std::sync::Arc;

/// Observable state of one lookup
///
/// `Empty` and `Failed` are settled states distinct from `Pending`, so a
/// selector can show "none", an error, or a spinner respectively.
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    /// Never requested in this session
    NotRequested,
    /// A fetch is outstanding
    Pending,
    /// Fetch completed with at least one item
    Ready(Arc<[T]>),
    /// Fetch completed with no items
    Empty,
    /// Fetch failed
    Failed(Arc<CatalogError>),
}

impl<T> Lookup<T> {
    /// Settled state for fetched items
    #[must_use]
    pub fn from_items(items: Arc<[T]>) -> Self {
        if items.is_empty() {
            Self::Empty
        } else {
            Self::Ready(items)
        }
    }

    /// Whether a fetch is outstanding
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the lookup reached `Ready`, `Empty` or `Failed`
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Empty | Self::Failed(_))
    }

    /// Loaded items; empty unless `Ready`
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            _ => &[],
        }
    }

    /// Failure, if the lookup failed
    #[must_use]
    pub fn failure(&self) -> Option<&CatalogError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Self::NotRequested
    }
}
