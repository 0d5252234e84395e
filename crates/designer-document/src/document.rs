//! Design document data model
//!
//! On-wire shape:
//!
//! ```yaml
//! id: 01J...          # present once persisted
//! services:
//!   container:
//!     image: nginx    # component settings, flattened
//!     traits:
//!       meshmodel-metadata: { primaryColor: "#326CE5", svgWhite: "..." }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Trait key carrying display metadata of a service
pub const METADATA_TRAIT: &str = "meshmodel-metadata";

/// Reserved settings key holding traits
pub const TRAITS_KEY: &str = "traits";

/// Opaque settings object produced by a component form
pub type Settings = Map<String, Value>;

/// Color and icon metadata used by presentation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMetadata {
    /// Primary brand color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    /// Secondary brand color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    /// White icon path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_white: Option<String>,
    /// Colored icon path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_color: Option<String>,
    /// Other display keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One service of the design
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Component settings
    #[serde(flatten)]
    pub settings: Settings,
    /// Traits, including display metadata
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub traits: Map<String, Value>,
}

impl ServiceEntry {
    /// Entry with the given settings and no traits
    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            traits: Map::new(),
        }
    }

    /// Parsed display metadata, if the metadata trait is present
    #[must_use]
    pub fn display_metadata(&self) -> Option<DisplayMetadata> {
        match self.traits.get(METADATA_TRAIT)? {
            value @ Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// Merge display fields into the metadata trait
    pub(crate) fn merge_display_fields(&mut self, fields: Map<String, Value>) {
        let slot = self
            .traits
            .entry(METADATA_TRAIT.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(existing) = slot {
            existing.extend(fields);
        }
    }
}

/// The design document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Persistence identity, set once saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Optional design name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Services keyed by component kind
    #[serde(default)]
    pub services: IndexMap<String, ServiceEntry>,
}

impl DesignDocument {
    /// Empty, unsaved document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With a service entry
    #[must_use]
    pub fn with_service(mut self, key: impl Into<String>, entry: ServiceEntry) -> Self {
        self.services.insert(key.into(), entry);
        self
    }

    /// Encode as YAML
    ///
    /// # Errors
    /// If serialization fails
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Decode from YAML
    ///
    /// # Errors
    /// If the text is not a design document
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Encode as a JSON object
    ///
    /// # Errors
    /// If serialization fails
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Decode from a JSON value
    ///
    /// # Errors
    /// If the value is not a design document
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
