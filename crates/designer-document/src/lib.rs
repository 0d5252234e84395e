//! Designer Document
//!
//! The canonical design document of a configurator session.
//!
//! # Overview
//!
//! - **DesignDocument**: `{ id?, services: { kind: { settings..., traits? } } }`
//! - **DocumentStore**: single owner of the document; keyed, atomic
//!   component merges; YAML and JSON projections of the same structure
//! - **DocumentObserver** / change events: explicit notification instead of
//!   implicit re-rendering
//!
//! # Example
//!
//! ```rust,ignore
//! use designer_catalog::ComponentSchema;
//! use designer_document::DocumentStore;
//! use serde_json::json;
//!
//! let store = DocumentStore::default();
//! store.apply_component_value(&ComponentSchema::new("container"), json!({ "image": "nginx" }))?;
//! println!("{}", store.to_yaml()?);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod store;

// Re-exports
pub use document::{DesignDocument, DisplayMetadata, ServiceEntry, Settings, METADATA_TRAIT};
pub use error::DocumentError;
pub use store::{ChangeKind, DocumentChange, DocumentObserver, DocumentStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
