use thiserror::Error;

/// Main error type for the bayesloop system
#[derive(Error, Debug)]
pub enum BoError {
    #[error("Parameter space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Loop error: {0}")]
    Loop(#[from] LoopError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Parameter-space errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpaceError {
    #[error("Invalid bounds for parameter {name}: min {min} must be finite and below max {max}")]
    InvalidBounds { name: String, min: f64, max: f64 },

    #[error("Discrete parameter {name} has an empty or non-finite domain")]
    EmptyDomain { name: String },

    #[error("Duplicate parameter name: {name}")]
    DuplicateName { name: String },

    #[error("Parameter space has no parameters")]
    EmptySpace,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Point {point:?} lies outside the parameter space")]
    OutOfDomain { point: Vec<f64> },
}

/// Surrogate-model errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model has no training data")]
    NoData,

    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    #[error("Covariance matrix is not positive definite (jitter reached {jitter:e})")]
    NotPositiveDefinite { jitter: f64 },

    #[error("Non-finite value encountered: {message}")]
    NonFinite { message: String },
}

/// Optimization-loop errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoopError {
    #[error("Result dimension mismatch: expected x={expected_x}, y={expected_y}, got x={actual_x}, y={actual_y}")]
    ResultDimension {
        expected_x: usize,
        expected_y: usize,
        actual_x: usize,
        actual_y: usize,
    },

    #[error("User function returned no outputs for point {point:?}")]
    EmptyFunctionOutput { point: Vec<f64> },

    #[error("Loop state holds no results")]
    NoResults,

    #[error("Objective value is not finite at point {point:?}")]
    NonFiniteObjective { point: Vec<f64> },
}

/// Result type alias for bayesloop operations
pub type BoResult<T> = Result<T, BoError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::BoError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::BoError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::BoError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SpaceError::InvalidBounds {
            name: "x".to_string(),
            min: 1.0,
            max: 0.5,
        };

        assert!(error.to_string().contains("Invalid bounds"));
        assert!(error.to_string().contains("1"));
        assert!(error.to_string().contains("0.5"));
    }

    #[test]
    fn test_error_conversion() {
        let model_error = ModelError::NoData;
        let bo_error: BoError = model_error.into();

        match bo_error {
            BoError::Model(ModelError::NoData) => (),
            _ => panic!("Expected Model error"),
        }
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        assert!(matches!(validation_err, BoError::Validation(ref m) if m == "Invalid value: 42"));
        let _internal_err = internal_error!("Something went wrong");
        let config_err = config_error!("Missing required field: {}", "seed");
        assert!(config_err.to_string().contains("seed"));
    }
}
