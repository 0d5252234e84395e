//! Designer Lifecycle
//!
//! Persistence lifecycle of a design document.
//!
//! # Overview
//!
//! - **LifecycleState**: `Unsaved -> Saved <-> Dirty -> Deleted`
//! - **DesignLifecycle**: serialized save/update/delete/load through a
//!   [`PersistencePort`], reconciling the [`DocumentStore`](designer_document::DocumentStore)
//!   identity after each call
//! - **MemoryDesignStore**, **FileDesignStore**: port implementations
//!
//! # Example
//!
//! ```rust,ignore
//! use designer_document::DocumentStore;
//! use designer_lifecycle::{DesignLifecycle, MemoryDesignStore};
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Arc::new(DocumentStore::default());
//! let lifecycle = DesignLifecycle::new(
//!     Arc::new(MemoryDesignStore::new()),
//!     document.clone(),
//!     Duration::from_secs(30),
//! );
//!
//! let id = lifecycle.save().await?;
//! lifecycle.update(&id).await?;
//! lifecycle.delete(&id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod file;
pub mod lifecycle;
pub mod memory;
pub mod port;
pub mod state;

// Re-exports
pub use error::{LifecycleError, PersistenceError};
pub use file::FileDesignStore;
pub use lifecycle::{DesignLifecycle, LifecycleSnapshot};
pub use memory::MemoryDesignStore;
pub use port::PersistencePort;
pub use state::{
    available_actions, target_state, validate_transition, DesignId, LifecycleAction,
    LifecycleState,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
