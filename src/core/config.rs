// Author: Dustin Pilgrim
// License: MIT

use std::fmt;

use crate::core::error::{ConfigError, Error};

/// Timeout applied when the caller does not pick one.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Kinds of host input events a timer can subscribe to.
///
/// The legacy wheel variants exist because older hosts report scrolling
/// under different event names; subscribing to all of them costs nothing
/// on hosts that only emit the modern one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    PointerDown,
    KeyDown,
    Wheel,
    LegacyWheel,
    LegacyScroll,
}

impl EventKind {
    /// Everything we subscribe to when the caller does not narrow the set.
    pub const DEFAULT_SET: [EventKind; 6] = [
        EventKind::PointerMove,
        EventKind::KeyDown,
        EventKind::Wheel,
        EventKind::LegacyWheel,
        EventKind::LegacyScroll,
        EventKind::PointerDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PointerMove => "pointer-move",
            EventKind::PointerDown => "pointer-down",
            EventKind::KeyDown => "key-down",
            EventKind::Wheel => "wheel",
            EventKind::LegacyWheel => "legacy-wheel",
            EventKind::LegacyScroll => "legacy-scroll",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for one timer instance.
///
/// `monitored` keeps the caller's order; subscribe and unsubscribe walk
/// the same sequence so teardown mirrors construction exactly.
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Label of the monitored target. The physical target is whatever
    /// source/notifier pair the caller injects; the label travels in
    /// notices and log lines.
    pub target: String,

    /// State the timer starts in (and returns to on reset).
    pub initially_idle: bool,

    /// Inactivity duration before the automatic idle transition.
    pub timeout_ms: u64,

    /// Event kinds to subscribe to on the target.
    pub monitored: Vec<EventKind>,

    /// Shared-channel key. When set, accepted activity is mirrored to the
    /// channel and matching foreign entries count as activity here.
    pub sync_key: Option<String>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            target: "document".to_string(),
            initially_idle: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            monitored: EventKind::DEFAULT_SET.to_vec(),
            sync_key: None,
        }
    }
}

impl TimerConfig {
    /// Construction-time validation. A zero timeout or an empty monitored
    /// set would leave the timer permanently inert, so both fail fast
    /// instead of degrading.
    pub fn validate(&self) -> Result<(), Error> {
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig(ConfigError::NonPositiveTimeout));
        }
        if self.monitored.is_empty() {
            return Err(Error::InvalidConfig(ConfigError::NoMonitoredEvents));
        }
        Ok(())
    }
}
