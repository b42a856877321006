// Author: Dustin Pilgrim
// License: MIT

use serde_json::{Value, json};

use crate::core::{config::TimerConfig, events::Signal, state::State};

/// Immutable copy of the timer's public fields, captured at transition
/// time. Observers get this by value; handing out a live reference to
/// internal state would let them watch it mutate under their feet.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    pub target: String,
    pub idle: bool,
    pub timeout_ms: u64,
    pub last_transition_ms: u64,
    pub last_active_ms: u64,
    pub paused_remaining_ms: Option<u64>,
    pub sync_key: Option<String>,
}

impl TimerSnapshot {
    pub fn capture(cfg: &TimerConfig, state: &State) -> Self {
        Self {
            target: cfg.target.clone(),
            idle: state.idle(),
            timeout_ms: cfg.timeout_ms,
            last_transition_ms: state.last_transition_ms(),
            last_active_ms: state.last_active_ms(),
            paused_remaining_ms: state.paused_remaining_ms(),
            sync_key: cfg.sync_key.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "target": &self.target,
            "idle": self.idle,
            "timeout_ms": self.timeout_ms,
            "last_transition_ms": self.last_transition_ms,
            "last_active_ms": self.last_active_ms,
            "paused_remaining_ms": self.paused_remaining_ms,
            "sync_key": &self.sync_key,
        })
    }
}

/// Which side the timer just transitioned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Idle,
    Active,
}

impl NoticeKind {
    /// Event name observers subscribe under on the target.
    pub fn name(&self) -> &'static str {
        match self {
            NoticeKind::Idle => "idle-timer:idle",
            NoticeKind::Active => "idle-timer:active",
        }
    }
}

/// A transition notification as dispatched on the target.
///
/// `event` is the originating signal for reactivation, `None` when the
/// deferred transition elapsed on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub timer: TimerSnapshot,
    pub event: Option<Signal>,
}

impl Notice {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn target(&self) -> &str {
        &self.timer.target
    }

    /// The `{ timer, event }` detail payload in JSON form.
    pub fn detail_json(&self) -> Value {
        json!({
            "timer": self.timer.to_json(),
            "event": self.event.as_ref().map(|s| s.to_json()),
        })
    }
}
