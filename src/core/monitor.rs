// Author: Dustin Pilgrim
// License: MIT

use crate::core::{
    config::TimerConfig,
    effect::Effect,
    error::Error,
    events::Signal,
    snapshot::{Notice, NoticeKind, TimerSnapshot},
    state::State,
};
use crate::utils::format_duration_ms;

/// Grace window after a transition during which pointer-move signals are
/// discarded. Some hosts replay a burst of synthetic moves 115-150ms
/// after an idle transition; 200ms absorbs the burst without masking a
/// genuine key press or click, which bypasses this filter entirely.
const POST_TRANSITION_GRACE_MS: u64 = 200;

/// Immutable half of the state machine: configuration plus the
/// transition rules. Every operation takes `now_ms` explicitly and
/// reports its side effects as an [`Effect`] list for the runtime.
#[derive(Debug, Clone)]
pub struct Monitor {
    cfg: TimerConfig,
}

impl Monitor {
    pub fn new(cfg: TimerConfig) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &TimerConfig {
        &self.cfg
    }

    // ---------------- signal dispatch ----------------

    /// Handle one raw incoming signal.
    ///
    /// Filter order: paused timers see nothing, foreign channel keys are
    /// skipped, pointer moves pass the debounce gauntlet. Whatever
    /// survives is qualifying activity: it reactivates an idle timer,
    /// refreshes the activity timestamp, mirrors to the sync channel
    /// (unless the signal itself came from there) and restarts the
    /// countdown.
    pub fn handle_signal(&self, state: &mut State, signal: &Signal, now_ms: u64) -> Vec<Effect> {
        if state.paused() {
            return Vec::new();
        }

        if let Signal::SyncChange { key, .. } = signal {
            if self.cfg.sync_key.as_deref() != Some(key.as_str()) {
                return Vec::new();
            }
        }

        if let Signal::PointerMove { x, y } = signal {
            if self.spurious_pointer_move(state, *x, *y, now_ms) {
                return Vec::new();
            }
        }

        let mut out = Vec::new();

        if state.idle() {
            out.push(self.toggle_state(state, Some(signal), now_ms));
        }

        state.mark_active(now_ms);
        let (x, y) = signal.pointer();
        state.set_pointer(x, y);

        if !signal.from_channel() {
            if let Some(key) = &self.cfg.sync_key {
                out.push(Effect::WriteSync {
                    key: key.clone(),
                    last_active_ms: now_ms,
                });
            }
        }

        out.push(Effect::ScheduleDeadline {
            delay_ms: self.cfg.timeout_ms,
        });

        out
    }

    /// The scheduled deferred transition fired. No re-check of the state:
    /// any qualifying activity in the meantime would have cancelled or
    /// rescheduled the deadline before this could run.
    pub fn deadline_elapsed(&self, state: &mut State, now_ms: u64) -> Vec<Effect> {
        vec![self.toggle_state(state, None, now_ms)]
    }

    // ---------------- reset / pause / resume ----------------

    /// Back to the constructed state, countdown restarted from the full
    /// timeout when the constructed state is active. Emits no notice.
    pub fn reset(&self, state: &mut State, now_ms: u64) -> Vec<Effect> {
        state.reset_cycle(self.cfg.initially_idle, now_ms);

        if state.idle() {
            vec![Effect::CancelDeadline]
        } else {
            vec![Effect::ScheduleDeadline {
                delay_ms: self.cfg.timeout_ms,
            }]
        }
    }

    /// Freeze the countdown. Repeated pauses keep the first cached value;
    /// recomputing on every call would let the remaining time drift.
    pub fn pause(&self, state: &mut State, now_ms: u64) -> Vec<Effect> {
        if state.paused() {
            return Vec::new();
        }

        let remaining = self
            .cfg
            .timeout_ms
            .saturating_sub(self.elapsed_ms(state, now_ms));
        state.set_paused_remaining(Some(remaining));

        vec![Effect::CancelDeadline]
    }

    /// Thaw the countdown. The deadline is scheduled from the cached
    /// remaining duration, not the full timeout, and only when the timer
    /// is on the active side (idle has no further automatic transition).
    pub fn resume(&self, state: &mut State, _now_ms: u64) -> Vec<Effect> {
        let Some(remaining) = state.paused_remaining_ms() else {
            return Vec::new();
        };
        state.set_paused_remaining(None);

        if state.idle() {
            return Vec::new();
        }

        vec![Effect::ScheduleDeadline {
            delay_ms: remaining,
        }]
    }

    // ---------------- queries ----------------

    pub fn remaining_ms(&self, state: &State, now_ms: u64) -> u64 {
        if state.idle() {
            return 0;
        }
        if let Some(remaining) = state.paused_remaining_ms() {
            return remaining;
        }
        self.cfg
            .timeout_ms
            .saturating_sub(now_ms.saturating_sub(state.last_active_ms()))
    }

    pub fn elapsed_ms(&self, state: &State, now_ms: u64) -> u64 {
        now_ms.saturating_sub(state.last_transition_ms())
    }

    pub fn snapshot(&self, state: &State) -> TimerSnapshot {
        TimerSnapshot::capture(&self.cfg, state)
    }

    // ---------------- helpers ----------------

    /// Debounce for pointer-move signals. Rejects:
    /// - no movement (coordinates equal the last recorded pair),
    /// - malformed signals with both coordinates absent,
    /// - anything inside the post-transition grace window.
    fn spurious_pointer_move(
        &self,
        state: &State,
        x: Option<f64>,
        y: Option<f64>,
        now_ms: u64,
    ) -> bool {
        let (last_x, last_y) = state.pointer();
        if x == last_x && y == last_y {
            return true;
        }
        if x.is_none() && y.is_none() {
            return true;
        }
        if now_ms.saturating_sub(state.last_transition_ms()) < POST_TRANSITION_GRACE_MS {
            return true;
        }
        false
    }

    /// The single transition path: flips the state, stamps the
    /// transition time and builds the notice for the target. Both the
    /// automatic elapse and the reactivation route land here.
    fn toggle_state(&self, state: &mut State, origin: Option<&Signal>, now_ms: u64) -> Effect {
        let dwelt_ms = self.elapsed_ms(state, now_ms);

        state.set_idle(!state.idle());
        state.mark_transition(now_ms);

        let kind = if state.idle() {
            NoticeKind::Idle
        } else {
            NoticeKind::Active
        };

        tracing::debug!(
            target_label = %self.cfg.target,
            notice = kind.name(),
            "transition after {}",
            format_duration_ms(dwelt_ms),
        );

        Effect::Emit {
            notice: Notice {
                kind,
                timer: self.snapshot(state),
                event: origin.cloned(),
            },
        }
    }
}
