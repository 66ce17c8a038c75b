//! Generator error type.

/// Error produced while resolving a single field.
///
/// Generator errors never abort a record: the field that failed is set to
/// null and the error is logged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorError {
    /// Parameters were rejected when the schema was compiled
    #[error("Invalid parameters for '{kind}': {reason}")]
    InvalidParams { kind: String, reason: String },

    /// The generator type is not known to the registry
    #[error("Unknown generator type: {0}")]
    UnknownType(String),

    /// A state value had an unexpected shape
    #[error("State key '{key}' holds {found}, expected {expected}")]
    State {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A transform could not be applied to its input
    #[error("Transform '{transform}' cannot be applied to {input}")]
    Transform {
        transform: String,
        input: &'static str,
    },

    /// Arithmetic overflow
    #[error("Numeric overflow in {0}")]
    Overflow(String),

    /// Error raised by an externally registered function
    #[error("{0}")]
    External(String),
}

impl GeneratorError {
    /// Shorthand for errors raised by external generators and providers.
    pub fn external(message: impl Into<String>) -> Self {
        GeneratorError::External(message.into())
    }
}
