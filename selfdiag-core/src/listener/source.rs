//! Event sources and the registry that introduces them to listeners.

use super::event::{DiagnosticEvent, Severity};
use super::file_listener::EventListener;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock, Weak};

struct Subscription {
    listener: Weak<EventListener>,
    min_severity: Severity,
}

impl Subscription {
    fn admits(&self, level: Severity) -> bool {
        level >= self.min_severity && self.listener.strong_count() > 0
    }
}

/// A named producer of diagnostic events.
///
/// Each subscribed listener carries its own severity gate; an event below
/// every gate is dropped here and never reaches a listener.
pub struct EventSource {
    name: String,
    subscribers: RwLock<Vec<Subscription>>,
}

impl EventSource {
    /// Create a source that is not known to any registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether any subscriber would receive an event at `level`.
    pub fn is_enabled(&self, level: Severity) -> bool {
        self.subscribers.read().iter().any(|s| s.admits(level))
    }

    /// Raise an event and deliver it synchronously to every admitting listener.
    pub fn emit(&self, level: Severity, message: &str, parameters: &[Option<&str>]) {
        let subscribers = self.subscribers.read();
        if !subscribers.iter().any(|s| s.admits(level)) {
            return;
        }

        let event = DiagnosticEvent::new(level, message, parameters);
        for subscription in subscribers.iter() {
            if level < subscription.min_severity {
                continue;
            }
            if let Some(listener) = subscription.listener.upgrade() {
                listener.write_event(&event);
            }
        }
    }

    /// Subscribe `listener` at `min_severity`, replacing an earlier gate.
    pub(crate) fn enable(&self, listener: &Arc<EventListener>, min_severity: Severity) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|s| s.listener.strong_count() > 0);

        match subscribers
            .iter_mut()
            .find(|s| std::ptr::eq(s.listener.as_ptr(), Arc::as_ptr(listener)))
        {
            Some(existing) => existing.min_severity = min_severity,
            None => subscribers.push(Subscription {
                listener: Arc::downgrade(listener),
                min_severity,
            }),
        }
    }

    /// Remove the subscription of the listener at `listener`.
    pub(crate) fn disable(&self, listener: *const EventListener) {
        self.subscribers
            .write()
            .retain(|s| !std::ptr::eq(s.listener.as_ptr(), listener));
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

/// Process-wide directory of event sources and listeners.
///
/// Creating a source announces it to every attached listener; attaching a
/// listener replays every source created so far.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: RwLock<Vec<Weak<EventSource>>>,
    listeners: RwLock<Vec<Weak<EventListener>>>,
}

impl EventSourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static EventSourceRegistry {
        static GLOBAL: OnceLock<EventSourceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(EventSourceRegistry::new)
    }

    /// Create a source and announce it to every attached listener.
    pub fn create_source(&self, name: impl Into<String>) -> Arc<EventSource> {
        let source = Arc::new(EventSource::new(name));
        {
            let mut sources = self.sources.write();
            sources.retain(|s| s.strong_count() > 0);
            sources.push(Arc::downgrade(&source));
        }

        for listener in self.live_listeners() {
            listener.source_created(&source);
        }
        source
    }

    /// Attach `listener` and replay every live source to it.
    ///
    /// An inert listener queues the replayed sources until it is activated.
    pub fn attach(&self, listener: &Arc<EventListener>) {
        {
            let mut listeners = self.listeners.write();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.push(Arc::downgrade(listener));
        }

        for source in self.sources() {
            listener.source_created(&source);
        }
    }

    /// Every source that is still alive.
    pub fn sources(&self) -> Vec<Arc<EventSource>> {
        self.sources.read().iter().filter_map(Weak::upgrade).collect()
    }

    fn live_listeners(&self) -> Vec<Arc<EventListener>> {
        self.listeners
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribed_source_is_disabled() {
        let source = EventSource::new("Sdk-Core");
        assert_eq!(source.name(), "Sdk-Core");
        assert!(!source.is_enabled(Severity::Critical));
        source.emit(Severity::Critical, "nobody listens", &[]);
    }

    #[test]
    fn registry_tracks_live_sources() {
        let registry = EventSourceRegistry::new();
        let kept = registry.create_source("kept");
        {
            let _dropped = registry.create_source("dropped");
            assert_eq!(registry.sources().len(), 2);
        }

        let live = registry.sources();
        assert_eq!(live.len(), 1);
        assert!(Arc::ptr_eq(&live[0], &kept));
    }
}
