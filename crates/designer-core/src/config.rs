//! Session configuration

use crate::error::SessionError;
use designer_catalog::CatalogSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tuning of a configurator session
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// fetch_timeout_ms = 5000
/// catalog_ttl_secs = 600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Catalog fetch timeout in milliseconds
    pub fetch_timeout_ms: u64,
    /// Persistence call timeout in milliseconds
    pub persist_timeout_ms: u64,
    /// Max memoized catalog lookups per kind
    pub catalog_capacity: u64,
    /// Expiry of memoized catalog lookups; session lifetime when unset
    pub catalog_ttl_secs: Option<u64>,
    /// Buffer of the document change broadcast
    pub notification_capacity: usize,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With fetch timeout
    #[inline]
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = duration_ms(timeout);
        self
    }

    /// With persistence timeout
    #[inline]
    #[must_use]
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout_ms = duration_ms(timeout);
        self
    }

    /// With catalog expiry
    #[inline]
    #[must_use]
    pub fn with_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl_secs = Some(ttl.as_secs());
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// `Config` if the text is not valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self, SessionError> {
        toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// `Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Settings for the catalog index
    #[must_use]
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            capacity: self.catalog_capacity,
            ttl: self.catalog_ttl_secs.map(Duration::from_secs),
        }
    }

    /// Persistence call timeout
    #[inline]
    #[must_use]
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            persist_timeout_ms: 30_000,
            catalog_capacity: 1_024,
            catalog_ttl_secs: None,
            notification_capacity: 64,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
