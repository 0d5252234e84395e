//! Catalog data model
//!
//! Categories group models, models own an ordered list of component schemas.
//! Everything here is supplied by the catalog and treated as immutable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level grouping of models
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// Category name, unique within the catalog
    pub name: String,
}

impl Category {
    /// Create category
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A model belonging to exactly one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Machine name, used as the selection value
    pub name: String,
    /// Human readable name
    pub display_name: String,
    /// Owning category
    pub category: String,
}

impl Model {
    /// Create model whose display name equals its name
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            category: category.into(),
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Metadata attached to a component schema
///
/// Only `hasInvalidSchema` carries meaning for the engine; the color and
/// icon fields are display metadata copied into service traits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    /// The form schema could not be processed; edits must be rejected
    #[serde(default)]
    pub has_invalid_schema: bool,
    /// Primary brand color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    /// Secondary brand color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    /// Path of the white icon variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_white: Option<String>,
    /// Path of the colored icon variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_color: Option<String>,
    /// Any other metadata the catalog ships
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ComponentMetadata {
    /// Metadata marking the schema invalid
    #[inline]
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            has_invalid_schema: true,
            ..Self::default()
        }
    }

    /// With primary color and white icon
    #[must_use]
    pub fn with_icon(mut self, primary_color: impl Into<String>, svg_white: impl Into<String>) -> Self {
        self.primary_color = Some(primary_color.into());
        self.svg_white = Some(svg_white.into());
        self
    }

    /// Whether any color or icon field is present
    #[inline]
    #[must_use]
    pub fn has_display_metadata(&self) -> bool {
        self.primary_color.is_some()
            || self.secondary_color.is_some()
            || self.svg_white.is_some()
            || self.svg_color.is_some()
    }

    /// Display fields as a JSON object, excluding the validity flag
    #[must_use]
    pub fn display_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        let known = [
            ("primaryColor", &self.primary_color),
            ("secondaryColor", &self.secondary_color),
            ("svgWhite", &self.svg_white),
            ("svgColor", &self.svg_color),
        ];
        for (key, value) in known {
            if let Some(value) = value {
                fields.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        for (key, value) in &self.extra {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        fields
    }
}

/// Form-shape descriptor for one configurable unit of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSchema {
    /// Component kind; doubles as the service key in the design document
    pub kind: String,
    /// Catalog metadata
    #[serde(default)]
    pub metadata: ComponentMetadata,
    /// Opaque form schema, consumed by presentation only
    #[serde(default)]
    pub form_schema: Value,
}

impl ComponentSchema {
    /// Create schema with empty metadata and form
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            metadata: ComponentMetadata::default(),
            form_schema: Value::Null,
        }
    }

    /// With metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: ComponentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// With form schema
    #[inline]
    #[must_use]
    pub fn with_form_schema(mut self, form_schema: Value) -> Self {
        self.form_schema = form_schema;
        self
    }

    /// Whether edits of this component must be rejected
    #[inline]
    #[must_use]
    pub fn has_invalid_schema(&self) -> bool {
        self.metadata.has_invalid_schema
    }
}
