//! Error types for Nexus OGM

use thiserror::Error;

/// Result type alias using the OGM error
pub type Result<T> = std::result::Result<T, OgmError>;

/// Errors raised while issuing queries and hydrating their results
#[derive(Error, Debug)]
pub enum OgmError {
    /// I/O errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Requested host type is incompatible with the runtime type of a value
    #[error(
        "Cannot map {source_type} to {target_type}. This can be caused by missing registration of {target_type}."
    )]
    TypeMismatch {
        /// Runtime type of the value being mapped
        source_type: String,
        /// Type the caller asked for
        target_type: String,
    },

    /// Single-object request matched an unexpected number of rows
    #[error("Result not of expected size. Expected {expected} row but found {actual}")]
    CardinalityViolation {
        /// Expected row count
        expected: usize,
        /// Actual row count
        actual: usize,
    },

    /// A row does not have the shape the projection needs
    #[error("Invalid row shape: {0}")]
    RowShape(String),

    /// Malformed wire value
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid class registration
    #[error("Registration error: {0}")]
    Registration(String),

    /// Class is not known to the mapping metadata
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Error surfaced by the query executor
    #[error("Executor error: {0}")]
    Executor(String),
}

impl OgmError {
    /// Create a type mismatch error
    pub fn type_mismatch(source_type: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::TypeMismatch {
            source_type: source_type.into(),
            target_type: target_type.into(),
        }
    }

    /// Create a cardinality error for a single-row expectation
    pub fn cardinality(actual: usize) -> Self {
        Self::CardinalityViolation {
            expected: 1,
            actual,
        }
    }

    /// Create a row shape error
    pub fn row_shape(msg: impl Into<String>) -> Self {
        Self::RowShape(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a registration error
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    /// Create an executor error
    pub fn executor(msg: impl Into<String>) -> Self {
        Self::Executor(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<anyhow::Error> for OgmError {
    fn from(err: anyhow::Error) -> Self {
        Self::Executor(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message_names_both_types() {
        let err = OgmError::type_mismatch("i64", "restaurant::Restaurant");
        assert_eq!(
            err.to_string(),
            "Cannot map i64 to restaurant::Restaurant. This can be caused by missing registration of restaurant::Restaurant."
        );
    }

    #[test]
    fn test_cardinality_message() {
        let err = OgmError::cardinality(3);
        assert_eq!(
            err.to_string(),
            "Result not of expected size. Expected 1 row but found 3"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: OgmError = anyhow::anyhow!("connection refused").into();
        assert!(matches!(err, OgmError::Executor(_)));
    }
}
