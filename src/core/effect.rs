// Author: Dustin Pilgrim
// License: MIT

use crate::core::snapshot::Notice;

/// Side effects the runtime applies after the core has handled a signal
/// or a control call. The core never schedules, dispatches, or writes
/// anything itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Cancel the pending deferred transition without rescheduling
    /// (pause, or reset into the idle side).
    CancelDeadline,

    /// Schedule the deferred idle transition `delay_ms` from now.
    ///
    /// The runtime must cancel any previously scheduled deadline first so
    /// that at most one is ever pending.
    ScheduleDeadline {
        delay_ms: u64,
    },

    /// Dispatch a transition notice on the target.
    Emit {
        notice: Notice,
    },

    /// Best-effort write of the last-active timestamp to the shared sync
    /// channel. Dropped silently when no channel capability is present.
    WriteSync {
        key: String,
        last_active_ms: u64,
    },
}
