//! Error types for the self-diagnostics subsystem.
//!
//! Errors only ever reach the coordinator that (re)configures the log file.
//! The write path has no error return: a failed diagnostic write is dropped
//! on the floor and never surfaces to the instrumented application.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for self-diagnostics setup.
#[derive(Error, Debug)]
pub enum DiagError {
    // =========================================================================
    // Resource Errors (D001-D099)
    // =========================================================================
    /// Failed to create or size the backing log file.
    #[error("D001: Failed to create log file at {path}: {cause}")]
    FileCreate {
        /// The path where creation failed.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// Failed to memory-map the backing log file.
    #[error("D002: Failed to mmap log file at {path}: {cause}")]
    FileMmap {
        /// The path of the log file.
        path: PathBuf,
        /// Reason for the mmap failure.
        cause: String,
    },

    /// Requested capacity is outside the supported range.
    #[error("D003: Invalid log file capacity {requested} bytes (allowed {min}..={max})")]
    InvalidCapacity {
        /// Number of bytes requested.
        requested: u64,
        /// Smallest accepted capacity.
        min: u64,
        /// Largest accepted capacity.
        max: u64,
    },

    // =========================================================================
    // Configuration Errors (D100-D199)
    // =========================================================================
    /// Configuration file is missing or unreadable.
    #[error("D101: Failed to read diagnostics config at {path}: {cause}")]
    ConfigRead {
        /// The configuration path.
        path: PathBuf,
        /// Reason for the read failure.
        cause: String,
    },

    /// Configuration content could not be parsed.
    #[error("D102: Failed to parse diagnostics config at {path}: {cause}")]
    ConfigParse {
        /// The configuration path.
        path: PathBuf,
        /// Parser error message.
        cause: String,
    },

    /// A configuration field holds an unacceptable value.
    #[error("D103: Invalid diagnostics config field '{field}': {cause}")]
    ConfigValue {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        cause: String,
    },
}

impl DiagError {
    /// Get the error code (e.g., "D001").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileCreate { .. } => "D001",
            Self::FileMmap { .. } => "D002",
            Self::InvalidCapacity { .. } => "D003",
            Self::ConfigRead { .. } => "D101",
            Self::ConfigParse { .. } => "D102",
            Self::ConfigValue { .. } => "D103",
        }
    }

    /// Check if this error came from reading or validating configuration.
    ///
    /// Configuration errors leave the previously active configuration in place.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigRead { .. } | Self::ConfigParse { .. } | Self::ConfigValue { .. }
        )
    }

    /// Check if this error came from acquiring the backing file.
    ///
    /// Resource errors leave the writer disabled until the next successful
    /// reconfiguration.
    #[must_use]
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Self::FileCreate { .. } | Self::FileMmap { .. } | Self::InvalidCapacity { .. }
        )
    }
}

/// Result type alias using `DiagError`.
pub type Result<T> = std::result::Result<T, DiagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_correct() {
        let err = DiagError::FileCreate {
            path: PathBuf::from("/tmp/test.log"),
            cause: "denied".to_string(),
        };
        assert_eq!(err.code(), "D001");

        let err = DiagError::ConfigParse {
            path: PathBuf::from("selfdiag.json"),
            cause: "eof".to_string(),
        };
        assert_eq!(err.code(), "D102");
    }

    #[test]
    fn error_display() {
        let err = DiagError::InvalidCapacity {
            requested: 0,
            min: 1024,
            max: 4096,
        };
        let msg = err.to_string();
        assert!(msg.contains("D003"));
        assert!(msg.contains("1024..=4096"));
    }

    #[test]
    fn error_classes() {
        let config = DiagError::ConfigValue {
            field: "fileSizeBytes".to_string(),
            cause: "zero".to_string(),
        };
        assert!(config.is_config_error());
        assert!(!config.is_resource_error());

        let resource = DiagError::FileMmap {
            path: PathBuf::from("/tmp/x.log"),
            cause: "ENOMEM".to_string(),
        };
        assert!(resource.is_resource_error());
        assert!(!resource.is_config_error());
    }
}
