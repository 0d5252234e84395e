//! Memoized catalog index backed by moka
//!
//! Resolves `category -> [model]` and `model -> [component]` through a
//! [`CatalogPort`], keeping:
//! - a coalescing cache (concurrent requests for one key share one fetch)
//! - an observable [`Lookup`] state per key for non-blocking readers
//! - a fetch timeout that surfaces as a failed lookup

use crate::error::{CatalogError, CatalogKey, CatalogSourceError};
use crate::lookup::Lookup;
use crate::model::{Category, ComponentSchema, Model};
use crate::port::CatalogPort;
use dashmap::DashMap;
use moka::future::Cache;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Slot under which the single category list is memoized
const CATEGORIES_SLOT: &str = "";

/// Tuning for a [`CatalogIndex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Upper bound for one fetch
    pub fetch_timeout: Duration,
    /// Max memoized lookups per kind
    pub capacity: u64,
    /// Optional expiry of memoized lookups
    pub ttl: Option<Duration>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            capacity: 1_024,
            ttl: None,
        }
    }
}

/// Approximate memo sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Memoized model lists
    pub model_lists: u64,
    /// Memoized component lists
    pub component_lists: u64,
}

/// One kind of memoized lookup
struct Memo<T> {
    cache: Cache<String, Arc<[T]>>,
    states: DashMap<String, Lookup<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(settings: &CatalogSettings) -> Self {
        let mut builder = Cache::builder().max_capacity(settings.capacity);
        if let Some(ttl) = settings.ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            cache: builder.build(),
            states: DashMap::new(),
        }
    }

    fn state(&self, slot: &str) -> Lookup<T> {
        self.states
            .get(slot)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn load<Fut>(
        &self,
        key: CatalogKey,
        slot: &str,
        timeout: Duration,
        fetch: Fut,
    ) -> Result<Arc<[T]>, Arc<CatalogError>>
    where
        Fut: Future<Output = Result<Vec<T>, CatalogSourceError>> + Send,
    {
        if let Some(items) = self.cache.get(slot).await {
            tracing::debug!(%key, "catalog lookup served from memo");
            return Ok(items);
        }

        self.states.insert(slot.to_string(), Lookup::Pending);

        let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let init_key = key.clone();
        let result = self
            .cache
            .try_get_with(slot.to_string(), async move {
                tracing::debug!(key = %init_key, "fetching catalog lookup");
                match tokio::time::timeout(timeout, fetch).await {
                    Ok(Ok(items)) => Ok(Arc::<[T]>::from(items)),
                    Ok(Err(source)) => Err(CatalogError::fetch_failed(init_key, source.0)),
                    Err(_) => Err(CatalogError::TimedOut {
                        key: init_key,
                        after_ms,
                    }),
                }
            })
            .await;

        match &result {
            Ok(items) => {
                self.states
                    .insert(slot.to_string(), Lookup::from_items(Arc::clone(items)));
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "catalog lookup failed");
                self.states
                    .insert(slot.to_string(), Lookup::Failed(Arc::clone(err)));
            }
        }

        result
    }

    fn clear(&self) {
        self.cache.invalidate_all();
        self.states.clear();
    }
}

/// Session-scoped index over a catalog source
///
/// Failures are never memoized: requesting a failed key again re-issues the
/// fetch.
pub struct CatalogIndex {
    port: Arc<dyn CatalogPort>,
    settings: CatalogSettings,
    categories: Memo<Category>,
    models: Memo<Model>,
    components: Memo<ComponentSchema>,
}

impl fmt::Debug for CatalogIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogIndex")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CatalogIndex {
    /// Create index over a catalog source
    #[must_use]
    pub fn new(port: Arc<dyn CatalogPort>, settings: CatalogSettings) -> Self {
        Self {
            categories: Memo::new(&settings),
            models: Memo::new(&settings),
            components: Memo::new(&settings),
            port,
            settings,
        }
    }

    /// Settings in effect
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Load the category list
    ///
    /// # Errors
    /// The shared fetch failure, if the source failed or timed out
    pub async fn categories(&self) -> Result<Arc<[Category]>, Arc<CatalogError>> {
        self.categories
            .load(
                CatalogKey::Categories,
                CATEGORIES_SLOT,
                self.settings.fetch_timeout,
                self.port.fetch_categories(),
            )
            .await
    }

    /// Current state of the category list
    #[must_use]
    pub fn categories_state(&self) -> Lookup<Category> {
        self.categories.state(CATEGORIES_SLOT)
    }

    /// Load the models of a category
    ///
    /// # Errors
    /// The shared fetch failure, if the source failed or timed out
    pub async fn models(&self, category: &str) -> Result<Arc<[Model]>, Arc<CatalogError>> {
        self.models
            .load(
                CatalogKey::Models(category.to_string()),
                category,
                self.settings.fetch_timeout,
                self.port.fetch_models_for_category(category),
            )
            .await
    }

    /// Current state of a category's model list
    #[must_use]
    pub fn models_state(&self, category: &str) -> Lookup<Model> {
        self.models.state(category)
    }

    /// Load the components of a model, in catalog order
    ///
    /// # Errors
    /// The shared fetch failure, if the source failed or timed out
    pub async fn components(
        &self,
        model: &str,
    ) -> Result<Arc<[ComponentSchema]>, Arc<CatalogError>> {
        self.components
            .load(
                CatalogKey::Components(model.to_string()),
                model,
                self.settings.fetch_timeout,
                self.port.fetch_components_for_model(model),
            )
            .await
    }

    /// Current state of a model's component list
    #[must_use]
    pub fn components_state(&self, model: &str) -> Lookup<ComponentSchema> {
        self.components.state(model)
    }

    /// Drop every memoized lookup and its state
    pub fn invalidate_all(&self) {
        self.categories.clear();
        self.models.clear();
        self.components.clear();
        tracing::info!("catalog index invalidated");
    }

    /// Approximate memo sizes
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            model_lists: self.models.cache.entry_count(),
            component_lists: self.components.cache.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct CountingPort {
        model_calls: AtomicUsize,
        component_calls: AtomicUsize,
        fail: AtomicBool,
        hang: AtomicBool,
        gate: Option<Arc<Notify>>,
        models: Vec<Model>,
    }

    #[async_trait]
    impl CatalogPort for CountingPort {
        async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogSourceError> {
            Ok(vec![Category::new("Kubernetes")])
        }

        async fn fetch_models_for_category(
            &self,
            category: &str,
        ) -> Result<Vec<Model>, CatalogSourceError> {
            self.model_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(CatalogSourceError::new("catalog unavailable"));
            }
            Ok(self
                .models
                .iter()
                .filter(|m| m.category == category)
                .cloned()
                .collect())
        }

        async fn fetch_components_for_model(
            &self,
            _model: &str,
        ) -> Result<Vec<ComponentSchema>, CatalogSourceError> {
            self.component_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                ComponentSchema::new("container"),
                ComponentSchema::new("volume"),
            ])
        }
    }

    fn kubernetes_models() -> Vec<Model> {
        vec![
            Model::new("Deployment", "Kubernetes"),
            Model::new("Service", "Kubernetes"),
        ]
    }

    #[tokio::test]
    async fn models_are_memoized() {
        let port = Arc::new(CountingPort {
            models: kubernetes_models(),
            ..CountingPort::default()
        });
        let index = CatalogIndex::new(port.clone(), CatalogSettings::default());

        let first = index.models("Kubernetes").await.unwrap();
        let second = index.models("Kubernetes").await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(port.model_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(index.models_state("Kubernetes"), Lookup::Ready(_)));
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let gate = Arc::new(Notify::new());
        let port = Arc::new(CountingPort {
            models: kubernetes_models(),
            gate: Some(gate.clone()),
            ..CountingPort::default()
        });
        let index = Arc::new(CatalogIndex::new(port.clone(), CatalogSettings::default()));

        let a = tokio::spawn({
            let index = index.clone();
            async move { index.models("Kubernetes").await }
        });
        let b = tokio::spawn({
            let index = index.clone();
            async move { index.models("Kubernetes").await }
        });

        while !index.models_state("Kubernetes").is_pending() {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        let (a, b) = futures::join!(a, b);
        assert_eq!(a.unwrap().unwrap().len(), 2);
        assert_eq!(b.unwrap().unwrap().len(), 2);
        assert_eq!(port.model_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_is_distinct_from_failed() {
        let port = Arc::new(CountingPort::default());
        let index = CatalogIndex::new(port.clone(), CatalogSettings::default());

        let models = index.models("Nothing").await.unwrap();
        assert!(models.is_empty());
        assert!(matches!(index.models_state("Nothing"), Lookup::Empty));

        port.fail.store(true, Ordering::SeqCst);
        let err = index.models("Broken").await.unwrap_err();
        assert!(matches!(*err, CatalogError::FetchFailed { .. }));
        assert!(index.models_state("Broken").failure().is_some());
    }

    #[tokio::test]
    async fn failures_are_retried() {
        let port = Arc::new(CountingPort {
            models: kubernetes_models(),
            ..CountingPort::default()
        });
        port.fail.store(true, Ordering::SeqCst);
        let index = CatalogIndex::new(port.clone(), CatalogSettings::default());

        assert!(index.models("Kubernetes").await.is_err());

        port.fail.store(false, Ordering::SeqCst);
        let models = index.models("Kubernetes").await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(port.model_calls.load(Ordering::SeqCst), 2);
        assert!(matches!(index.models_state("Kubernetes"), Lookup::Ready(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out_as_failed() {
        let port = Arc::new(CountingPort::default());
        port.hang.store(true, Ordering::SeqCst);
        let settings = CatalogSettings {
            fetch_timeout: Duration::from_millis(250),
            ..CatalogSettings::default()
        };
        let index = CatalogIndex::new(port, settings);

        let err = index.models("Kubernetes").await.unwrap_err();
        assert!(matches!(
            *err,
            CatalogError::TimedOut { after_ms: 250, .. }
        ));
        assert!(index.models_state("Kubernetes").failure().is_some());
    }

    #[tokio::test]
    async fn unrequested_lookup_reports_not_requested() {
        let index = CatalogIndex::new(Arc::new(CountingPort::default()), CatalogSettings::default());
        assert!(matches!(index.components_state("Deployment"), Lookup::NotRequested));
        assert!(matches!(index.categories_state(), Lookup::NotRequested));
    }

    #[tokio::test]
    async fn invalidate_all_forces_refetch() {
        let port = Arc::new(CountingPort::default());
        let index = CatalogIndex::new(port.clone(), CatalogSettings::default());

        let components = index.components("Deployment").await.unwrap();
        assert_eq!(components[0].kind, "container");
        assert_eq!(components[1].kind, "volume");

        index.invalidate_all();
        assert!(matches!(index.components_state("Deployment"), Lookup::NotRequested));

        index.components("Deployment").await.unwrap();
        assert_eq!(port.component_calls.load(Ordering::SeqCst), 2);
    }
}
