// Author: Dustin Pilgrim
// License: MIT

//! Activity-lapse detection for event-driven hosts.
//!
//! One [`ActivityTimer`] watches one target for input activity (pointer
//! movement, key presses, scrolling) and keeps a binary idle/active
//! state: a configurable stretch with no qualifying activity flips it
//! idle, the next qualifying signal flips it back. Observers hear about
//! transitions as `idle-timer:idle` / `idle-timer:active` notices on the
//! target; the countdown can be paused, resumed and reset, and timers in
//! independent contexts can share activity through a key on a sync
//! channel.
//!
//! The host environment is injected: an event source, a notifier, a
//! clock and (optionally) the sync channel. In-process implementations
//! of each live under [`services`].

pub mod core;
pub mod services;
pub mod utils;

mod timer;

#[cfg(test)]
mod timer_tests;

pub use crate::core::{
    config::{DEFAULT_TIMEOUT_MS, EventKind, TimerConfig},
    error::{ConfigError, Error},
    events::Signal,
    snapshot::{Notice, NoticeKind, TimerSnapshot},
};
pub use crate::services::{
    channel::{MemoryChannel, MemoryPort, SyncChannel},
    clock::{Clock, SystemClock},
    notify::{BroadcastNotifier, Notifier},
    source::{InputSource, LoopbackSource, SignalSink, SubscribeOptions},
};
pub use crate::timer::{ActivityTimer, Host};
