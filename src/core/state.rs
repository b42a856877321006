// Author: Dustin Pilgrim
// License: MIT

/// Mutable half of the state machine.
///
/// The monitor owns every transition; nothing here reads a clock or
/// schedules anything, so tests can drive the whole machine with
/// hand-picked timestamps.
#[derive(Debug, Clone)]
pub struct State {
    // Current side of the binary state. Always reflects the most recent
    // completed transition.
    idle: bool,

    // Timing (ms, supplied by the caller on every operation)
    last_transition_ms: u64,
    last_active_ms: u64,

    // Countdown frozen at pause time. Some(_) exactly while paused.
    paused_remaining_ms: Option<u64>,

    // Last recorded pointer position, for the duplicate-move filter.
    last_pointer_x: Option<f64>,
    last_pointer_y: Option<f64>,
}

impl State {
    pub fn new(initially_idle: bool, now_ms: u64) -> Self {
        Self {
            idle: initially_idle,
            last_transition_ms: now_ms,
            last_active_ms: now_ms,
            paused_remaining_ms: None,
            last_pointer_x: None,
            last_pointer_y: None,
        }
    }

    // ---------------- getters ----------------

    pub fn idle(&self) -> bool {
        self.idle
    }

    pub fn last_transition_ms(&self) -> u64 {
        self.last_transition_ms
    }

    pub fn last_active_ms(&self) -> u64 {
        self.last_active_ms
    }

    pub fn paused(&self) -> bool {
        self.paused_remaining_ms.is_some()
    }

    pub fn paused_remaining_ms(&self) -> Option<u64> {
        self.paused_remaining_ms
    }

    pub fn pointer(&self) -> (Option<f64>, Option<f64>) {
        (self.last_pointer_x, self.last_pointer_y)
    }

    // ---------------- setters ----------------

    pub fn set_idle(&mut self, v: bool) {
        self.idle = v;
    }

    pub fn mark_transition(&mut self, now_ms: u64) {
        self.last_transition_ms = now_ms;
    }

    pub fn mark_active(&mut self, now_ms: u64) {
        self.last_active_ms = now_ms;
    }

    pub fn set_paused_remaining(&mut self, v: Option<u64>) {
        self.paused_remaining_ms = v;
    }

    pub fn set_pointer(&mut self, x: Option<f64>, y: Option<f64>) {
        self.last_pointer_x = x;
        self.last_pointer_y = y;
    }

    // ---------------- cycle control ----------------

    /// Full reset: back to the constructed state with both reference
    /// timestamps at `now_ms`. Assigns the idle flag, never toggles it,
    /// and un-pauses. The remembered pointer position survives; a reset
    /// is not evidence that the pointer moved.
    pub fn reset_cycle(&mut self, initially_idle: bool, now_ms: u64) {
        self.idle = initially_idle;
        self.last_transition_ms = now_ms;
        self.last_active_ms = now_ms;
        self.paused_remaining_ms = None;
    }
}
