use std::path::PathBuf;

use thiserror::Error;

/// Main error type for papyrus operations
#[derive(Error, Debug)]
pub enum PapyrusError {
    #[error("Cannot locate config.json (searched upward from {0})")]
    ConfigMissing(PathBuf),

    #[error("Required index artifact missing: {path}")]
    IndexMissing { path: PathBuf },

    #[error("Malformed index data in {path}: {detail}")]
    Malformed { path: PathBuf, detail: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for papyrus operations
pub type Result<T> = std::result::Result<T, PapyrusError>;

impl PapyrusError {
    /// Build a Malformed error for a specific artifact
    pub fn malformed(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        PapyrusError::Malformed {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Check whether this error should abort the whole process rather than
    /// just the current operation
    pub fn is_fatal_for_process(&self) -> bool {
        matches!(self, PapyrusError::ConfigMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PapyrusError::malformed("/idx/barrel_0.bin", "df != num_docs");
        assert_eq!(
            err.to_string(),
            "Malformed index data in /idx/barrel_0.bin: df != num_docs"
        );
    }

    #[test]
    fn test_fatality_classification() {
        assert!(PapyrusError::ConfigMissing(PathBuf::from("/tmp")).is_fatal_for_process());
        assert!(!PapyrusError::IndexMissing {
            path: PathBuf::from("/idx/lexicon.bin")
        }
        .is_fatal_for_process());
    }
}
