//! The listener that renders events into the circular log file.

use super::event::{DiagnosticEvent, Severity};
use super::source::EventSource;
use crate::encoding::render_event;
use crate::writer::CircularFileWriter;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

/// Size of the per-thread scratch buffer a record is rendered into.
pub const SCRATCH_BUFFER_SIZE: usize = 1024;

thread_local! {
    static SCRATCH: RefCell<Option<Box<[u8; SCRATCH_BUFFER_SIZE]>>> = const { RefCell::new(None) };
}

#[derive(Default)]
struct Registrations {
    active: bool,
    /// Sources announced before activation.
    pending: Vec<Arc<EventSource>>,
    subscribed: Vec<Weak<EventSource>>,
}

/// Receives diagnostic events and appends them to a [`CircularFileWriter`].
///
/// A listener starts inert: sources announced to it are queued, not
/// subscribed, so no event can arrive while it is still being wired up.
/// [`activate`](Self::activate) subscribes the queued sources at the
/// threshold in effect at that moment and switches to subscribing new
/// sources immediately.
pub struct EventListener {
    writer: Arc<CircularFileWriter>,
    min_severity: AtomicU8,
    source_prefix: Option<String>,
    registrations: Mutex<Registrations>,
}

impl EventListener {
    /// Create an inert listener writing to `writer`.
    pub fn new(writer: Arc<CircularFileWriter>, min_severity: Severity) -> Self {
        Self {
            writer,
            min_severity: AtomicU8::new(min_severity as u8),
            source_prefix: None,
            registrations: Mutex::new(Registrations::default()),
        }
    }

    /// Only subscribe to sources whose name starts with `prefix`.
    pub fn with_source_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.source_prefix = Some(prefix.into());
        self
    }

    /// Current severity threshold.
    pub fn min_severity(&self) -> Severity {
        Severity::from_u8(self.min_severity.load(Ordering::Acquire))
    }

    /// The writer records are appended to.
    pub fn writer(&self) -> &Arc<CircularFileWriter> {
        &self.writer
    }

    /// Whether [`activate`](Self::activate) has run.
    pub fn is_active(&self) -> bool {
        self.registrations.lock().active
    }

    /// Change the threshold and re-gate every subscribed source.
    ///
    /// Sources still queued pick the new threshold up on activation.
    pub fn set_min_severity(self: &Arc<Self>, level: Severity) {
        let mut registrations = self.registrations.lock();
        self.min_severity.store(level as u8, Ordering::Release);

        registrations.subscribed.retain(|s| s.strong_count() > 0);
        for source in registrations.subscribed.iter().filter_map(Weak::upgrade) {
            source.enable(self, level);
        }
    }

    /// Called when a source becomes known to this listener.
    pub fn source_created(self: &Arc<Self>, source: &Arc<EventSource>) {
        if !self.accepts(source.name()) {
            return;
        }

        let mut registrations = self.registrations.lock();
        if registrations.active {
            self.subscribe(&mut registrations, source);
        } else if !registrations
            .pending
            .iter()
            .any(|queued| Arc::ptr_eq(queued, source))
        {
            registrations.pending.push(Arc::clone(source));
        }
    }

    /// Subscribe every queued source and switch to direct subscription.
    pub fn activate(self: &Arc<Self>) {
        let mut registrations = self.registrations.lock();
        if registrations.active {
            return;
        }

        let pending = std::mem::take(&mut registrations.pending);
        for source in &pending {
            self.subscribe(&mut registrations, source);
        }
        registrations.active = true;

        tracing::debug!(
            sources = pending.len(),
            min_severity = %self.min_severity(),
            "Self-diagnostics listener activated"
        );
    }

    /// Unsubscribe from every source. Queued sources are forgotten.
    pub fn detach(self: &Arc<Self>) {
        let mut registrations = self.registrations.lock();
        registrations.pending.clear();
        for source in registrations.subscribed.drain(..).filter_map(|s| s.upgrade()) {
            source.disable(Arc::as_ptr(self));
        }
    }

    /// Render `event` into this thread's scratch buffer and append it to the
    /// log file. A no-op below the threshold or while no file is open.
    pub fn write_event(&self, event: &DiagnosticEvent<'_>) {
        if event.level < self.min_severity() || !self.writer.is_open() {
            return;
        }

        let _ = SCRATCH.try_with(|slot| {
            let Ok(mut scratch) = slot.try_borrow_mut() else {
                return;
            };
            let buffer = scratch.get_or_insert_with(|| Box::new([0u8; SCRATCH_BUFFER_SIZE]));

            let len = render_event(
                &event.timestamp,
                event.message,
                event.parameters,
                &mut buffer[..],
            );
            self.writer.write(&buffer[..len]);
        });
    }

    fn subscribe(self: &Arc<Self>, registrations: &mut Registrations, source: &Arc<EventSource>) {
        source.enable(self, self.min_severity());
        if !registrations
            .subscribed
            .iter()
            .any(|s| std::ptr::eq(s.as_ptr(), Arc::as_ptr(source)))
        {
            registrations.subscribed.push(Arc::downgrade(source));
        }
    }

    fn accepts(&self, source_name: &str) -> bool {
        self.source_prefix
            .as_deref()
            .is_none_or(|prefix| source_name.starts_with(prefix))
    }
}
