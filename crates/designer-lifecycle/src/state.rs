//! Lifecycle state machine
//!
//! ```text
//! Unsaved --save/load--> Saved --edit--> Dirty
//!                          ^  \            |
//!                          |   `--update---'
//!                          |
//! Saved|Dirty --delete--> Deleted (terminal)
//! ```

use crate::error::LifecycleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque persistence identity of a design
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignId(pub String);

impl DesignId {
    /// Wrap an id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh sortable id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DesignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistence status of a design document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Never persisted
    #[default]
    Unsaved,
    /// Persisted and unchanged since
    Saved,
    /// Persisted, changed since
    Dirty,
    /// Removed from the store; terminal
    Deleted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unsaved => "unsaved",
            Self::Saved => "saved",
            Self::Dirty => "dirty",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Operation attempted against the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    /// Persist as a new design
    Save,
    /// Replace the persisted design
    Update,
    /// Remove the persisted design
    Delete,
    /// Adopt an already persisted design
    Load,
    /// Observe a document edit
    Edit,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Save => "save",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Load => "load",
            Self::Edit => "edit",
        };
        f.write_str(name)
    }
}

/// State reached by a successful action, if the action is allowed
#[must_use]
pub fn target_state(from: LifecycleState, action: LifecycleAction) -> Option<LifecycleState> {
    use LifecycleAction::{Delete, Edit, Load, Save, Update};
    use LifecycleState::{Deleted, Dirty, Saved, Unsaved};
    match (from, action) {
        (Unsaved, Save | Load) | (Saved | Dirty, Update) => Some(Saved),
        (Saved | Dirty, Delete) => Some(Deleted),
        (Saved | Dirty, Edit) => Some(Dirty),
        _ => None,
    }
}

/// Validate an action against the current state
///
/// # Errors
/// `TransitionRejected` if the action is not allowed from `from`
pub fn validate_transition(
    from: LifecycleState,
    action: LifecycleAction,
) -> Result<LifecycleState, LifecycleError> {
    target_state(from, action).ok_or(LifecycleError::TransitionRejected {
        from,
        attempted: action,
    })
}

/// User-facing actions offered from a state
///
/// Save-as-new while unsaved; update and delete once persisted; nothing
/// after deletion.
#[must_use]
pub fn available_actions(from: LifecycleState) -> Vec<LifecycleAction> {
    [
        LifecycleAction::Save,
        LifecycleAction::Update,
        LifecycleAction::Delete,
    ]
    .into_iter()
    .filter(|action| target_state(from, *action).is_some())
    .collect()
}
