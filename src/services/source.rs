// Author: Dustin Pilgrim
// License: MIT

use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::core::{config::EventKind, events::Signal};

/// Receiving end of a subscription. Sources push raw signals into it;
/// the timer's dispatcher is one of these.
pub trait SignalSink: Send + Sync {
    fn push(&self, signal: Signal);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Subscribe as an observer only, waiving the right to consume or
    /// cancel the event. Hosts that honor this can deliver without
    /// waiting on the handler.
    pub passive: bool,
}

/// Event subscription surface of the monitored target.
pub trait InputSource: Send + Sync {
    fn subscribe(&self, kind: EventKind, sink: Arc<dyn SignalSink>, options: SubscribeOptions);

    /// Removing a sink that is not subscribed is a no-op; teardown may
    /// run against a source that already forgot us.
    fn unsubscribe(&self, kind: EventKind, sink: &Arc<dyn SignalSink>);

    /// No-op subscription backing the capability check: returns true
    /// when the source read the passive marker off the options.
    fn probe_passive(&self) -> bool {
        false
    }
}

static PASSIVE_SUPPORTED: OnceCell<bool> = OnceCell::new();

/// Whether the host honors passive subscriptions. Probed against the
/// first source that asks, then cached for the life of the process.
pub fn passive_supported(source: &dyn InputSource) -> bool {
    *PASSIVE_SUPPORTED.get_or_init(|| {
        let supported = source.probe_passive();
        tracing::debug!(supported = supported, "probed passive subscription support");
        supported
    })
}

/// In-process source: whatever feeds it with [`LoopbackSource::emit`]
/// reaches every sink subscribed to that signal's kind. Stands in for a
/// real host event surface in embeddings and tests.
pub struct LoopbackSource {
    subs: Mutex<Vec<(EventKind, Arc<dyn SignalSink>)>>,
    passive: bool,
}

impl LoopbackSource {
    pub fn new() -> Self {
        Self {
            subs: Mutex::new(Vec::new()),
            passive: false,
        }
    }

    /// A source that reports passive-subscription support to the probe.
    pub fn with_passive_support() -> Self {
        Self {
            subs: Mutex::new(Vec::new()),
            passive: true,
        }
    }

    /// Deliver a raw signal to every sink subscribed to its kind.
    /// Channel notifications are not routed here; that is the sync
    /// channel's job.
    pub fn emit(&self, signal: Signal) {
        let Some(kind) = signal.kind() else {
            return;
        };

        let subs = self.subs.lock().unwrap_or_else(|e| e.into_inner());
        for (k, sink) in subs.iter() {
            if *k == kind {
                sink.push(signal.clone());
            }
        }
    }

    /// How many sinks are subscribed to `kind`. Diagnostic surface;
    /// teardown symmetry is asserted through it.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let subs = self.subs.lock().unwrap_or_else(|e| e.into_inner());
        subs.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl Default for LoopbackSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for LoopbackSource {
    fn subscribe(&self, kind: EventKind, sink: Arc<dyn SignalSink>, _options: SubscribeOptions) {
        let mut subs = self.subs.lock().unwrap_or_else(|e| e.into_inner());
        subs.push((kind, sink));
    }

    fn unsubscribe(&self, kind: EventKind, sink: &Arc<dyn SignalSink>) {
        let mut subs = self.subs.lock().unwrap_or_else(|e| e.into_inner());
        subs.retain(|(k, s)| !(*k == kind && Arc::ptr_eq(s, sink)));
    }

    fn probe_passive(&self) -> bool {
        self.passive
    }
}
