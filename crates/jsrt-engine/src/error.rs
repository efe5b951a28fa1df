//! Error types for engine operations.

use thiserror::Error;

/// Errors raised by an [`Engine`](crate::Engine) implementation.
///
/// Script and module failures carry the engine-side message so callers can
/// attach it as the cause of a load failure.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A thrown JavaScript exception captured during evaluation or a call.
    #[error("{error_type}: {message}")]
    Script { error_type: String, message: String },

    /// Source text failed to compile.
    #[error("Compile error in '{filename}': {message}")]
    Compile { filename: String, message: String },

    /// A value had the wrong shape for the requested operation.
    #[error("Type error: expected {expected}, got {actual}")]
    Type { expected: String, actual: String },

    /// Input bytes were not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(String),

    /// The engine ran out of memory; maps to the engine's native
    /// allocation failure.
    #[error("Out of memory")]
    OutOfMemory,

    /// Anything else that went wrong inside the engine.
    #[error("Internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create a script error from error type and message.
    pub fn script(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Script {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Create a type error.
    pub fn type_error(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Type {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_display() {
        let err = EngineError::script("TypeError", "x is not a function");
        assert_eq!(err.to_string(), "TypeError: x is not a function");
    }

    #[test]
    fn test_type_error_display() {
        let err = EngineError::type_error("string", "number");
        assert!(err.to_string().contains("expected string"));
    }
}
