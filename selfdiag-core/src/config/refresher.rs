//! Applies configuration changes to the writer and listener.

use super::DiagnosticsConfig;
use crate::error::DiagError;
use crate::listener::EventListener;
use crate::writer::CircularFileWriter;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default period between configuration reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Result of one configuration read.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The document matches the active configuration.
    Unchanged,
    /// The document differed and was applied.
    Applied,
    /// The document could not be used; the previous configuration is kept.
    Retained(DiagError),
}

/// Owns the log file lifecycle on behalf of a configuration document.
///
/// On every refresh the document is re-read. When a field changed, the log
/// file is recreated (directory or size change) and the listener threshold
/// updated. A bad document leaves everything as it was.
pub struct ConfigRefresher {
    config_path: PathBuf,
    writer: Arc<CircularFileWriter>,
    listener: Arc<EventListener>,
    active: Mutex<Option<DiagnosticsConfig>>,
    poll_interval: Duration,
    running: AtomicBool,
}

impl ConfigRefresher {
    /// Create a refresher for the document at `config_path`.
    pub fn new(
        config_path: impl Into<PathBuf>,
        writer: Arc<CircularFileWriter>,
        listener: Arc<EventListener>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            writer,
            listener,
            active: Mutex::new(None),
            poll_interval: DEFAULT_POLL_INTERVAL,
            running: AtomicBool::new(false),
        }
    }

    /// Set the polling interval used by [`run`](Self::run).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Path of the configuration document.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The configuration currently in effect.
    pub fn active_config(&self) -> Option<DiagnosticsConfig> {
        self.active.lock().clone()
    }

    /// Re-read the document and apply it if it changed.
    pub fn refresh(&self) -> RefreshOutcome {
        match DiagnosticsConfig::load(&self.config_path) {
            Ok(config) => {
                if self.apply(config) {
                    RefreshOutcome::Applied
                } else {
                    RefreshOutcome::Unchanged
                }
            }
            Err(e) => {
                tracing::warn!(
                    code = e.code(),
                    path = %self.config_path.display(),
                    error = %e,
                    "Diagnostics config unusable, keeping previous configuration"
                );
                RefreshOutcome::Retained(e)
            }
        }
    }

    /// Make `config` the active configuration. Returns `false` when nothing
    /// had to change.
    ///
    /// A log file that failed to open is retried even if the configuration
    /// is unchanged.
    pub fn apply(&self, config: DiagnosticsConfig) -> bool {
        let mut active = self.active.lock();
        let file_open = self.writer.is_open();
        if file_open && active.as_ref() == Some(&config) {
            return false;
        }

        let file_changed = !file_open
            || active.as_ref().is_none_or(|current| {
                current.log_directory != config.log_directory
                    || current.file_size_bytes != config.file_size_bytes
            });

        if file_changed {
            self.writer.close();
            // Failures are reported by the writer and leave it disabled.
            let _ = self
                .writer
                .create(&config.log_directory, config.file_size_bytes);
        }
        self.listener.set_min_severity(config.min_severity);

        tracing::info!(
            directory = %config.log_directory.display(),
            file_size_bytes = config.file_size_bytes,
            min_severity = %config.min_severity,
            file_open = self.writer.is_open(),
            "Self-diagnostics configuration applied"
        );

        *active = Some(config);
        true
    }

    /// Check if the polling loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Poll the document until [`stop`](Self::stop) is called.
    ///
    /// Each refresh reads the document and may recreate the log file, so it
    /// runs on the blocking pool rather than on a runtime worker.
    pub async fn run(self: Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            path = %self.config_path.display(),
            "Diagnostics config refresher started"
        );

        while self.running.load(Ordering::SeqCst) {
            let refresher = Arc::clone(&self);
            if let Err(e) = tokio::task::spawn_blocking(move || refresher.refresh()).await {
                tracing::error!(error = %e, "Diagnostics config refresh task failed");
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::info!("Diagnostics config refresher stopped");
    }

    /// Stop the polling loop after its current sleep.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop polling, close the log file and forget the active configuration.
    pub fn shutdown(&self) {
        self.stop();
        let mut active = self.active.lock();
        self.writer.close();
        *active = None;
    }
}
