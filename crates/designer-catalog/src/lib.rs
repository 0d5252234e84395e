//! Designer Catalog
//!
//! Lazily loaded catalog of categories, models and component schemas.
//!
//! # Overview
//!
//! - **CatalogPort**: abstract source (network, file, in-memory)
//! - **CatalogIndex**: memoized lookups with at most one fetch in flight per key
//! - **Lookup**: observable load state (`Pending`, `Ready`, `Empty`, `Failed`)
//!
//! # Example
//!
//! ```rust,ignore
//! use designer_catalog::{CatalogIndex, CatalogSettings, StaticCatalog};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = StaticCatalog::load("catalog.yaml").await?;
//! let index = CatalogIndex::new(Arc::new(catalog), CatalogSettings::default());
//!
//! let models = index.models("Kubernetes").await?;
//! let components = index.components(&models[0].name).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod index;
pub mod lookup;
pub mod model;
pub mod port;
pub mod static_catalog;

// Re-exports
pub use error::{CatalogError, CatalogKey, CatalogSourceError};
pub use index::{CatalogIndex, CatalogSettings, CatalogStats};
pub use lookup::Lookup;
pub use model::{Category, ComponentMetadata, ComponentSchema, Model};
pub use port::CatalogPort;
pub use static_catalog::{CatalogDefinition, CategoryDefinition, ModelDefinition, StaticCatalog};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
