//! Diagnostic event delivery.
//!
//! SDK components raise events through an [`EventSource`]. Sources and
//! listeners meet in an [`EventSourceRegistry`]; the [`EventListener`]
//! renders every admitted event into a per-thread scratch buffer and hands
//! the bytes to the circular log file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  severity gate  ┌───────────────┐  render  ┌────────────────────┐
//! │ EventSource │────────────────>│ EventListener │─────────>│ CircularFileWriter │
//! └─────────────┘                 └───────────────┘          └────────────────────┘
//!        ▲                                ▲
//!        └──────── EventSourceRegistry ───┘
//! ```
//!
//! # Initialization
//!
//! ```ignore
//! let listener = Arc::new(EventListener::new(writer, Severity::Warning));
//! registry.attach(&listener);   // existing sources are queued, not subscribed
//! listener.activate();          // queued sources subscribed at the final threshold
//! ```

mod event;
mod file_listener;
mod source;

pub use event::{DiagnosticEvent, Severity};
pub use file_listener::{EventListener, SCRATCH_BUFFER_SIZE};
pub use source::{EventSource, EventSourceRegistry};
