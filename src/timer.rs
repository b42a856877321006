// Author: Dustin Pilgrim
// License: MIT

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

use crate::core::{
    config::TimerConfig,
    effect::Effect,
    error::Error,
    events::Signal,
    monitor::Monitor,
    snapshot::TimerSnapshot,
    state::State,
};
use crate::services::{
    channel::SyncChannel,
    clock::{Clock, SystemClock},
    notify::Notifier,
    source::{InputSource, SignalSink, SubscribeOptions, passive_supported},
};

/// Everything the timer consumes from its surroundings. The source and
/// notifier together are the monitored target; clock and channel have
/// in-process defaults (system wall clock, no sync capability).
pub struct Host {
    source: Arc<dyn InputSource>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    channel: Option<Arc<dyn SyncChannel>>,
}

impl Host {
    pub fn new(source: Arc<dyn InputSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            source,
            notifier,
            clock: Arc::new(SystemClock),
            channel: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn SyncChannel>) -> Self {
        self.channel = Some(channel);
        self
    }
}

enum TimerMsg {
    Signal(Signal),

    /// The deferred transition task finished its sleep. Stale messages
    /// (from a deadline cancelled after the send) carry an old
    /// generation and are dropped.
    Deadline { generation: u64 },

    Pause { reply: oneshot::Sender<()> },
    Resume { reply: oneshot::Sender<()> },
    Reset { reply: oneshot::Sender<()> },

    Remaining { reply: oneshot::Sender<u64> },
    Elapsed { reply: oneshot::Sender<u64> },
    LastActive { reply: oneshot::Sender<u64> },
    IsIdle { reply: oneshot::Sender<bool> },
    Snapshot { reply: oneshot::Sender<TimerSnapshot> },

    Teardown { reply: oneshot::Sender<()> },
}

/// The dispatcher handed to sources and channels: forwards raw signals
/// into the timer's mailbox. Dropped signals on a full mailbox are
/// acceptable; activity bursts carry the same information many times
/// over.
struct MpscSink {
    tx: mpsc::Sender<TimerMsg>,
}

impl SignalSink for MpscSink {
    fn push(&self, signal: Signal) {
        let _ = self.tx.try_send(TimerMsg::Signal(signal));
    }
}

struct PendingDeadline {
    generation: u64,
    abort: AbortHandle,
}

/// Activity-lapse timer bound to one target.
///
/// All state lives in a single task; methods talk to it over a mailbox,
/// so every mutation is serialized the way a cooperative event loop
/// would serialize it. Construction subscribes to the host immediately.
/// Only [`ActivityTimer::teardown`] unsubscribes; dropping the handle
/// stops the task but performs no host cleanup.
pub struct ActivityTimer {
    tx: mpsc::Sender<TimerMsg>,
}

impl ActivityTimer {
    /// Validates the configuration (fail-fast), subscribes the
    /// dispatcher to every monitored event kind (passively when the
    /// probed capability allows) and to the sync channel when a key is
    /// configured, then starts the timer task with a full reset. Must be
    /// called from within a tokio runtime.
    pub fn spawn(cfg: TimerConfig, host: Host) -> Result<Self, Error> {
        let monitor = Monitor::new(cfg)?;

        let (tx, rx) = mpsc::channel::<TimerMsg>(256);
        let sink: Arc<dyn SignalSink> = Arc::new(MpscSink { tx: tx.clone() });

        let options = SubscribeOptions {
            passive: passive_supported(host.source.as_ref()),
        };
        for kind in &monitor.config().monitored {
            host.source.subscribe(*kind, Arc::clone(&sink), options);
        }

        if monitor.config().sync_key.is_some() {
            if let Some(channel) = &host.channel {
                channel.watch(Arc::clone(&sink));
            }
        }

        tracing::debug!(
            target_label = %monitor.config().target,
            timeout_ms = monitor.config().timeout_ms,
            "timer subscribed"
        );

        let task = TimerTask {
            state: State::new(
                monitor.config().initially_idle,
                host.clock.now_ms(),
            ),
            monitor,
            host,
            sink,
            tx: tx.downgrade(),
            pending: None,
            generation: 0,
        };
        tokio::spawn(task.run(rx));

        Ok(Self { tx })
    }

    // ---------------- control ----------------

    pub async fn pause(&self) {
        let _ = self.ask(|reply| TimerMsg::Pause { reply }).await;
    }

    pub async fn resume(&self) {
        let _ = self.ask(|reply| TimerMsg::Resume { reply }).await;
    }

    pub async fn reset(&self) {
        let _ = self.ask(|reply| TimerMsg::Reset { reply }).await;
    }

    /// Cancels the pending deferred transition and unsubscribes from the
    /// host, then stops the timer task. Consuming the handle makes a
    /// second teardown unrepresentable; the underlying unsubscribes are
    /// no-ops on an already-forgotten sink anyway.
    pub async fn teardown(self) {
        let _ = self.ask(|reply| TimerMsg::Teardown { reply }).await;
    }

    // ---------------- queries ----------------

    /// Milliseconds until the idle transition: 0 when idle, the frozen
    /// countdown when paused, the live countdown otherwise.
    pub async fn remaining_time(&self) -> u64 {
        self.ask(|reply| TimerMsg::Remaining { reply })
            .await
            .unwrap_or(0)
    }

    /// Milliseconds since the last transition.
    pub async fn elapsed_time(&self) -> u64 {
        self.ask(|reply| TimerMsg::Elapsed { reply })
            .await
            .unwrap_or(0)
    }

    /// Timestamp of the last accepted activity signal.
    pub async fn last_active_time(&self) -> u64 {
        self.ask(|reply| TimerMsg::LastActive { reply })
            .await
            .unwrap_or(0)
    }

    pub async fn is_idle(&self) -> bool {
        self.ask(|reply| TimerMsg::IsIdle { reply })
            .await
            .unwrap_or(false)
    }

    pub async fn snapshot(&self) -> Option<TimerSnapshot> {
        self.ask(|reply| TimerMsg::Snapshot { reply }).await
    }

    async fn ask<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> TimerMsg) -> Option<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(make(reply_tx)).await.is_err() {
            return None;
        }
        reply_rx.await.ok()
    }
}

struct TimerTask {
    monitor: Monitor,
    state: State,
    host: Host,
    sink: Arc<dyn SignalSink>,
    // Weak so the task's own deadline plumbing cannot keep the mailbox
    // open once every handle and subscription is gone.
    tx: mpsc::WeakSender<TimerMsg>,
    pending: Option<PendingDeadline>,
    generation: u64,
}

impl TimerTask {
    async fn run(mut self, mut rx: mpsc::Receiver<TimerMsg>) {
        // Construction ends in a full reset; this arms the first
        // countdown when the configured initial state is active.
        let now_ms = self.host.clock.now_ms();
        let effects = self.monitor.reset(&mut self.state, now_ms);
        self.apply(effects);

        loop {
            let Some(msg) = rx.recv().await else {
                tracing::debug!(
                    target_label = %self.monitor.config().target,
                    "timer handle dropped without teardown; stopping"
                );
                self.cancel_pending();
                break;
            };

            match msg {
                TimerMsg::Signal(signal) => {
                    let now_ms = self.host.clock.now_ms();
                    let effects = self.monitor.handle_signal(&mut self.state, &signal, now_ms);
                    self.apply(effects);
                }

                TimerMsg::Deadline { generation } => {
                    let stale = self
                        .pending
                        .as_ref()
                        .is_none_or(|p| p.generation != generation);
                    if stale {
                        continue;
                    }
                    self.pending = None;

                    let now_ms = self.host.clock.now_ms();
                    let effects = self.monitor.deadline_elapsed(&mut self.state, now_ms);
                    self.apply(effects);
                }

                TimerMsg::Pause { reply } => {
                    let now_ms = self.host.clock.now_ms();
                    let effects = self.monitor.pause(&mut self.state, now_ms);
                    self.apply(effects);
                    let _ = reply.send(());
                }

                TimerMsg::Resume { reply } => {
                    let now_ms = self.host.clock.now_ms();
                    let effects = self.monitor.resume(&mut self.state, now_ms);
                    self.apply(effects);
                    let _ = reply.send(());
                }

                TimerMsg::Reset { reply } => {
                    let now_ms = self.host.clock.now_ms();
                    let effects = self.monitor.reset(&mut self.state, now_ms);
                    self.apply(effects);
                    let _ = reply.send(());
                }

                TimerMsg::Remaining { reply } => {
                    let now_ms = self.host.clock.now_ms();
                    let _ = reply.send(self.monitor.remaining_ms(&self.state, now_ms));
                }

                TimerMsg::Elapsed { reply } => {
                    let now_ms = self.host.clock.now_ms();
                    let _ = reply.send(self.monitor.elapsed_ms(&self.state, now_ms));
                }

                TimerMsg::LastActive { reply } => {
                    let _ = reply.send(self.state.last_active_ms());
                }

                TimerMsg::IsIdle { reply } => {
                    let _ = reply.send(self.state.idle());
                }

                TimerMsg::Snapshot { reply } => {
                    let _ = reply.send(self.monitor.snapshot(&self.state));
                }

                TimerMsg::Teardown { reply } => {
                    self.teardown_host();
                    let _ = reply.send(());
                    break;
                }
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelDeadline => self.cancel_pending(),

                Effect::ScheduleDeadline { delay_ms } => self.schedule(delay_ms),

                Effect::Emit { notice } => {
                    self.host.notifier.dispatch(&notice);
                }

                Effect::WriteSync { key, last_active_ms } => {
                    // Absence of the channel capability is tolerated
                    // silently; in-context state never depends on the
                    // write landing.
                    if let Some(channel) = &self.host.channel {
                        channel.set(&key, last_active_ms.to_string());
                    }
                }
            }
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort.abort();
        }
    }

    /// Arm the deferred transition. Cancelling first keeps the "at most
    /// one pending" guarantee; the generation stamp catches the narrow
    /// window where a cancelled task already mailed its message.
    fn schedule(&mut self, delay_ms: u64) {
        self.cancel_pending();

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(TimerMsg::Deadline { generation }).await;
            }
        });

        self.pending = Some(PendingDeadline {
            generation,
            abort: handle.abort_handle(),
        });
    }

    fn teardown_host(&mut self) {
        self.cancel_pending();

        for kind in &self.monitor.config().monitored {
            self.host.source.unsubscribe(*kind, &self.sink);
        }

        if self.monitor.config().sync_key.is_some() {
            if let Some(channel) = &self.host.channel {
                channel.unwatch(&self.sink);
            }
        }

        tracing::debug!(
            target_label = %self.monitor.config().target,
            "timer torn down"
        );
    }
}
