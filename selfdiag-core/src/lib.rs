//! Self-diagnostics for an instrumentation SDK.
//!
//! This crate records the SDK's own warnings and errors into a fixed-size,
//! memory-mapped circular file that lives outside the telemetry pipeline it
//! instruments. It never allocates per event, never blocks the host
//! application beyond a short compare-and-swap loop, and keeps working while
//! the log file is swapped out underneath concurrent writers.
//!
//! # Key Components
//!
//! - **Encoding**: allocation-free rendering of records into a fixed buffer
//! - **Writer**: memory-mapped circular file with lock-free space claims
//! - **Listener**: event sources, severity gates, and the file listener
//! - **Config**: the JSON configuration and the refresher that applies it
//!
//! # Example
//!
//! ```ignore
//! use selfdiag_core::prelude::*;
//! use std::sync::Arc;
//!
//! let writer = Arc::new(CircularFileWriter::new());
//! let listener = Arc::new(EventListener::new(Arc::clone(&writer), Severity::Warning));
//! EventSourceRegistry::global().attach(&listener);
//! listener.activate();
//!
//! let refresher = ConfigRefresher::new("selfdiag.json", writer, Arc::clone(&listener));
//! refresher.refresh();
//!
//! let source = EventSourceRegistry::global().create_source("Sdk-Transmission");
//! source.emit(Severity::Error, "Failed to send batch", &[Some("503")]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod encoding;
pub mod error;
pub mod listener;
pub mod prelude;
pub mod writer;

// Re-export key types at crate root for convenience
pub use config::{ConfigRefresher, DiagnosticsConfig, RefreshOutcome};
pub use encoding::{Timestamp, render_event};
pub use error::{DiagError, Result};
pub use listener::{DiagnosticEvent, EventListener, EventSource, EventSourceRegistry, Severity};
pub use writer::{CircularFileWriter, Claim};
