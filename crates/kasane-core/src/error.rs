use thiserror::Error;

/// Error taxonomy shared by tensors, backends, and layers.
///
/// Configuration problems are fatal and surface synchronously from
/// `configure`; compute calls only fail on shape mismatches. Numerical
/// edge cases (division by zero, 0^0, negative base to a fractional
/// power) are deliberately *not* errors — they propagate as IEEE NaN/Inf
/// so gradients keep the closed-form semantics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Shape mismatch in operation '{operation}': expected {expected}, got {got}")]
    ShapeMismatch {
        operation: String,
        expected: String,
        got: String,
    },

    #[error("Invalid configuration in operation '{operation}': {reason}")]
    InvalidConfiguration { operation: String, reason: String },

    #[error("Invalid shape in operation '{operation}': {reason}")]
    InvalidShape { operation: String, reason: String },
}

impl TensorError {
    /// Convenience constructor for shape mismatch errors.
    pub fn shape_mismatch(
        operation: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        TensorError::ShapeMismatch {
            operation: operation.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Convenience constructor for configuration errors.
    pub fn invalid_configuration(
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TensorError::InvalidConfiguration {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for invalid shape errors.
    pub fn invalid_shape(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        TensorError::InvalidShape {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;
