//! Error types for the design document

/// Document errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The component's schema is marked invalid; its edits never land
    #[error("component '{0}' has an invalid schema; edits are rejected")]
    InvalidComponentEdit(String),

    /// A form produced something other than a settings object
    #[error("settings for component '{0}' must be an object")]
    SettingsNotAnObject(String),

    /// YAML or JSON encoding/decoding failed
    #[error("projection failed: {0}")]
    Projection(String),
}

impl From<serde_yaml::Error> for DocumentError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Projection(err.to_string())
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Projection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_edit_display() {
        let err = DocumentError::InvalidComponentEdit("volume".to_string());
        assert_eq!(
            err.to_string(),
            "component 'volume' has an invalid schema; edits are rejected"
        );
    }

    #[test]
    fn yaml_errors_become_projection_errors() {
        let yaml_err = serde_yaml::from_str::<u32>("not a number").unwrap_err();
        let err: DocumentError = yaml_err.into();
        assert!(matches!(err, DocumentError::Projection(_)));
    }
}
