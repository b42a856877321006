// Author: Dustin Pilgrim
// License: MIT

/// Timestamp source for the runtime. Must be monotonically non-decreasing
/// at millisecond resolution; the core only ever subtracts timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0));
        d.as_millis() as u64
    }
}
