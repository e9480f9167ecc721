use thiserror::Error;

/// Main error type for the AD-HTC optimizer
#[derive(Error, Debug)]
pub enum AdhtcError {
    #[error("Optimization error: {0}")]
    Optimization(#[from] OptimizationError),

    #[error("Performance model failure: {message}")]
    PerformanceModel { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdhtcError {
    /// Wrap a failure raised inside a performance model.
    pub fn model(message: impl Into<String>) -> Self {
        Self::PerformanceModel {
            message: message.into(),
        }
    }
}

/// Optimizer-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizationError {
    #[error("Unsupported optimization method: {method}")]
    UnsupportedMethod { method: String },

    #[error("Invalid parameter space at '{name}': {message}")]
    InvalidParameterSpace { name: String, message: String },

    #[error("Invalid optimizer settings: {message}")]
    InvalidSettings { message: String },

    #[error("Optimization cancelled at iteration {iteration}")]
    Cancelled { iteration: usize },
}

/// Result type alias for optimizer operations
pub type AdhtcResult<T> = Result<T, AdhtcError>;

/// Macro for creating invalid-settings errors
#[macro_export]
macro_rules! settings_error {
    ($($arg:tt)*) => {
        $crate::AdhtcError::Optimization($crate::OptimizationError::InvalidSettings {
            message: format!($($arg)*),
        })
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::AdhtcError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::AdhtcError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = OptimizationError::UnsupportedMethod {
            method: "simplex".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("Unsupported optimization method"));
        assert!(message.contains("simplex"));
    }

    #[test]
    fn test_error_conversion() {
        let opt_error = OptimizationError::Cancelled { iteration: 7 };
        let err: AdhtcError = opt_error.into();

        match err {
            AdhtcError::Optimization(OptimizationError::Cancelled { iteration }) => {
                assert_eq!(iteration, 7)
            }
            _ => panic!("Expected Optimization error"),
        }
    }

    #[test]
    fn test_model_failure_message() {
        let err = AdhtcError::model("turbine inlet temperature out of range");
        assert!(err.to_string().starts_with("Performance model failure"));
    }

    #[test]
    fn test_macros() {
        let settings_err = settings_error!("population_size must be >= 1, got {}", 0);
        assert!(matches!(
            settings_err,
            AdhtcError::Optimization(OptimizationError::InvalidSettings { .. })
        ));
        let _internal_err = internal_error!("Something went wrong");
        let _config_err = config_error!("Missing required field: {}", "objectives");
    }
}
