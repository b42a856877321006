// Author: Dustin Pilgrim
// License: MIT

use serde_json::{Value, json};

use crate::core::config::EventKind;

/// A raw event observed on the monitored target, as the host reported it.
///
/// Pointer coordinates are optional because hosts may omit them; a
/// pointer-move carrying no coordinates at all is treated as spurious by
/// the dispatch filter rather than as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    PointerMove {
        x: Option<f64>,
        y: Option<f64>,
    },

    PointerDown {
        x: Option<f64>,
        y: Option<f64>,
    },

    KeyDown,

    Wheel,
    LegacyWheel,
    LegacyScroll,

    /// "Value changed" notification from the shared sync channel. The
    /// channel carries entries for keys this timer may not own; dispatch
    /// filters on the configured key.
    SyncChange {
        key: String,
        last_active_ms: u64,
    },
}

impl Signal {
    /// The subscription kind this signal arrived under, or `None` for
    /// channel notifications (those are watched, not subscribed).
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Signal::PointerMove { .. } => Some(EventKind::PointerMove),
            Signal::PointerDown { .. } => Some(EventKind::PointerDown),
            Signal::KeyDown => Some(EventKind::KeyDown),
            Signal::Wheel => Some(EventKind::Wheel),
            Signal::LegacyWheel => Some(EventKind::LegacyWheel),
            Signal::LegacyScroll => Some(EventKind::LegacyScroll),
            Signal::SyncChange { .. } => None,
        }
    }

    pub fn from_channel(&self) -> bool {
        matches!(self, Signal::SyncChange { .. })
    }

    /// Pointer coordinates carried by this signal. Non-pointer signals
    /// report `(None, None)`, and the dispatcher records exactly that, so
    /// a key press wipes the remembered position the same way the host's
    /// own coordinate-less events do.
    pub fn pointer(&self) -> (Option<f64>, Option<f64>) {
        match self {
            Signal::PointerMove { x, y } | Signal::PointerDown { x, y } => (*x, *y),
            _ => (None, None),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Signal::PointerMove { .. } => "pointer-move",
            Signal::PointerDown { .. } => "pointer-down",
            Signal::KeyDown => "key-down",
            Signal::Wheel => "wheel",
            Signal::LegacyWheel => "legacy-wheel",
            Signal::LegacyScroll => "legacy-scroll",
            Signal::SyncChange { .. } => "sync-change",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Signal::PointerMove { x, y } => json!({
                "kind": self.label(),
                "x": x,
                "y": y,
            }),
            Signal::PointerDown { x, y } => json!({
                "kind": self.label(),
                "x": x,
                "y": y,
            }),
            Signal::SyncChange { key, last_active_ms } => json!({
                "kind": self.label(),
                "key": key,
                "last_active_ms": last_active_ms,
            }),
            _ => json!({ "kind": self.label() }),
        }
    }
}
