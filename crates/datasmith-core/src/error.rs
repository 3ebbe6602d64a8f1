use thiserror::Error;

/// Fatal schema errors raised before generation starts.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema text is neither valid JSON nor valid YAML.
    #[error("schema parse error: {0}")]
    Parse(String),
    /// The decoded document is not a mapping.
    #[error("schema must be an object")]
    NotAnObject,
    /// A dataset-level field cannot be read.
    #[error("invalid schema field '{path}': {message}")]
    InvalidField { path: String, message: String },
}

impl SchemaError {
    pub(crate) fn invalid_field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
