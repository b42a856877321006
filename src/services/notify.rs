// Author: Dustin Pilgrim
// License: MIT

use tokio::sync::broadcast;

use crate::core::snapshot::Notice;

/// Custom-notification dispatch on the monitored target. The runtime
/// routes every transition notice through here.
pub trait Notifier: Send + Sync {
    fn dispatch(&self, notice: &Notice);
}

/// Fan-out notifier backed by a tokio broadcast channel. Observers call
/// [`BroadcastNotifier::subscribe`] and receive every notice dispatched
/// after that point; dispatching with no observers is fine.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notice>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn dispatch(&self, notice: &Notice) {
        // Err here just means nobody is listening right now.
        let _ = self.tx.send(notice.clone());
    }
}
