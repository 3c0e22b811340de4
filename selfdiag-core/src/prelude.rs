//! Prelude for convenient imports.
//!
//! This module re-exports the most commonly used types.
//!
//! # Example
//!
//! ```ignore
//! use selfdiag_core::prelude::*;
//! ```

// Error handling
pub use crate::error::{DiagError, Result};

// Encoding
pub use crate::encoding::{Timestamp, render_event};

// Circular file
pub use crate::writer::{CircularFileWriter, Claim, SENTINEL};

// Events
pub use crate::listener::{
    DiagnosticEvent, EventListener, EventSource, EventSourceRegistry, Severity,
};

// Configuration
pub use crate::config::{
    CONFIG_FILE_NAME, ConfigRefresher, DEFAULT_POLL_INTERVAL, DiagnosticsConfig, RefreshOutcome,
};
