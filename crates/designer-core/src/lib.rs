//! Designer Core
//!
//! A configurator session: pick a category and model from a catalog, fill
//! in component forms, and keep the resulting design document persisted.
//!
//! # Overview
//!
//! - **ComponentSelectionCascade**: category -> model -> components, with
//!   stale fetch results discarded
//! - **ConfiguratorSession**: the one object a front-end talks to; owns
//!   the catalog index, cascade, document store and lifecycle
//! - **SessionConfig**: timeouts and cache sizing, loadable from TOML
//!
//! # Example
//!
//! ```rust,ignore
//! use designer_catalog::StaticCatalog;
//! use designer_core::{ConfiguratorSession, SessionConfig};
//! use designer_lifecycle::MemoryDesignStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = ConfiguratorSession::new(
//!     Arc::new(StaticCatalog::load("catalog.yaml").await?),
//!     Arc::new(MemoryDesignStore::new()),
//!     SessionConfig::default(),
//! );
//!
//! session.select_category("Kubernetes").await?;
//! session.select_model("Deployment").await?;
//! session.apply_component_settings("container", json!({ "image": "nginx" }))?;
//! let id = session.save().await?;
//! println!("{id}:\n{}", session.to_yaml()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cascade;
pub mod config;
pub mod error;
pub mod session;

// Re-exports
pub use cascade::{
    CascadeSnapshot, ComponentForm, ComponentSelectionCascade, ModelOptions, Selection,
    SelectionOutcome,
};
pub use config::SessionConfig;
pub use error::{SelectionError, SessionError};
pub use session::ConfiguratorSession;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
