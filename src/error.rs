//! Error types for ciclo

use thiserror::Error;

/// Errors raised while configuring or running training policies
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch { context: &'static str, expected: usize, actual: usize },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Expected {expected} learning rates (one per layer group), got {actual}")]
    LayerGroups { expected: usize, actual: usize },

    #[error("Label {label} out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for ciclo operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("pct_start must be in [0, 1]".to_string());
        assert!(err.to_string().contains("pct_start"));

        let err = Error::LayerGroups { expected: 3, actual: 2 };
        assert!(err.to_string().contains("Expected 3"));

        let err = Error::ShapeMismatch { context: "targets", expected: 4, actual: 5 };
        assert!(err.to_string().contains("targets"));

        let err = Error::LabelOutOfRange { label: 7, n_classes: 3 };
        assert!(err.to_string().contains("Label 7"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
