//! Self-diagnostics configuration and the refresher that applies it.
//!
//! The configuration is a small JSON document:
//!
//! ```json
//! {
//!     "logDirectory": "/var/log/my-app",
//!     "fileSizeBytes": 1048576,
//!     "minSeverity": "Warning"
//! }
//! ```
//!
//! A document that is missing, unparsable, or out of range never disables
//! diagnostics; the previously applied configuration stays in effect.

mod refresher;

pub use refresher::{ConfigRefresher, DEFAULT_POLL_INTERVAL, RefreshOutcome};

use crate::error::{DiagError, Result};
use crate::listener::Severity;
use crate::writer::MAX_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Conventional file name of the configuration document.
pub const CONFIG_FILE_NAME: &str = "selfdiag.json";

/// Smallest accepted log file size: 1 KiB.
pub const MIN_FILE_SIZE: u64 = 1024;

/// Largest accepted log file size: 128 MiB.
pub const MAX_FILE_SIZE: u64 = MAX_CAPACITY;

/// The settings that select the log file and what goes into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsConfig {
    /// Directory the log file is created in.
    pub log_directory: PathBuf,
    /// Exact size of the circular log file.
    pub file_size_bytes: u64,
    /// Events below this severity are not recorded.
    pub min_severity: Severity,
}

impl DiagnosticsConfig {
    /// Create a configuration.
    pub fn new(
        log_directory: impl Into<PathBuf>,
        file_size_bytes: u64,
        min_severity: Severity,
    ) -> Self {
        Self {
            log_directory: log_directory.into(),
            file_size_bytes,
            min_severity,
        }
    }

    /// Set the log directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.log_directory = directory.into();
        self
    }

    /// Set the log file size.
    pub fn with_file_size(mut self, file_size_bytes: u64) -> Self {
        self.file_size_bytes = file_size_bytes;
        self
    }

    /// Set the severity threshold.
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Read, parse, and validate the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DiagError::ConfigRead {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        Self::parse(path, &text)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::parse(Path::new("<inline>"), text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| DiagError::ConfigParse {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.log_directory.as_os_str().is_empty() {
            return Err(DiagError::ConfigValue {
                field: "logDirectory".to_string(),
                cause: "must not be empty".to_string(),
            });
        }

        if !(MIN_FILE_SIZE..=MAX_FILE_SIZE).contains(&self.file_size_bytes) {
            return Err(DiagError::ConfigValue {
                field: "fileSizeBytes".to_string(),
                cause: format!(
                    "{} is outside {}..={}",
                    self.file_size_bytes, MIN_FILE_SIZE, MAX_FILE_SIZE
                ),
            });
        }

        Ok(())
    }
}
