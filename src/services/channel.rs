// Author: Dustin Pilgrim
// License: MIT

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use crate::core::events::Signal;
use crate::services::source::SignalSink;

/// Shared persistent key-value channel used for cross-context activity
/// sync. Writes are fire-and-forget; watchers receive a
/// [`Signal::SyncChange`] per foreign write, for any key (the timer
/// filters on its own).
pub trait SyncChannel: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    fn watch(&self, sink: Arc<dyn SignalSink>);

    /// Unwatching a sink that is not watching is a no-op.
    fn unwatch(&self, sink: &Arc<dyn SignalSink>);
}

struct ChannelShared {
    entries: Mutex<HashMap<String, String>>,
    // (owning port id, sink); a port never hears its own writes.
    watchers: Mutex<Vec<(u64, Arc<dyn SignalSink>)>>,
    next_port: AtomicU64,
}

/// In-memory channel shared by every execution context in the process.
///
/// Each context takes its own [`MemoryPort`]; writes through one port
/// notify the watchers of every *other* port, mirroring how host
/// storage-change notifications skip the originating context.
pub struct MemoryChannel {
    shared: Arc<ChannelShared>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ChannelShared {
                entries: Mutex::new(HashMap::new()),
                watchers: Mutex::new(Vec::new()),
                next_port: AtomicU64::new(0),
            }),
        }
    }

    pub fn port(&self) -> MemoryPort {
        MemoryPort {
            shared: Arc::clone(&self.shared),
            id: self.shared.next_port.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Watchers across all ports. Diagnostic surface for teardown
    /// symmetry.
    pub fn watcher_count(&self) -> usize {
        let watchers = self.shared.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.len()
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One execution context's handle on a [`MemoryChannel`].
#[derive(Clone)]
pub struct MemoryPort {
    shared: Arc<ChannelShared>,
    id: u64,
}

impl SyncChannel for MemoryPort {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.shared.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        {
            let mut entries = self.shared.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.insert(key.to_string(), value.clone());
        }

        // Channel values are decimal last-active timestamps; anything a
        // foreign writer put there that does not parse is dropped here
        // rather than handed to the dispatcher.
        let Ok(last_active_ms) = value.trim().parse::<u64>() else {
            tracing::warn!(key = %key, value = %value, "discarding unparseable channel value");
            return;
        };

        let watchers = self.shared.watchers.lock().unwrap_or_else(|e| e.into_inner());
        for (port_id, sink) in watchers.iter() {
            if *port_id == self.id {
                continue;
            }
            sink.push(Signal::SyncChange {
                key: key.to_string(),
                last_active_ms,
            });
        }
    }

    fn watch(&self, sink: Arc<dyn SignalSink>) {
        let mut watchers = self.shared.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.push((self.id, sink));
    }

    fn unwatch(&self, sink: &Arc<dyn SignalSink>) {
        let mut watchers = self.shared.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.retain(|(_, s)| !Arc::ptr_eq(s, sink));
    }
}
