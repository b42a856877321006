// Author: Dustin Pilgrim
// License: MIT

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::core::config::{EventKind, TimerConfig};
use crate::core::events::Signal;
use crate::core::snapshot::{Notice, NoticeKind};
use crate::services::channel::{MemoryChannel, SyncChannel};
use crate::services::clock::Clock;
use crate::services::notify::BroadcastNotifier;
use crate::services::source::LoopbackSource;
use crate::timer::{ActivityTimer, Host};

/// Clock pinned to tokio's (paused) test time, so virtual sleeps and the
/// timestamps the timer records line up exactly.
struct VirtualClock {
    origin: Instant,
}

impl VirtualClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

struct Fixture {
    source: Arc<LoopbackSource>,
    rx: broadcast::Receiver<Notice>,
    timer: ActivityTimer,
}

fn fixture(timeout_ms: u64) -> Fixture {
    fixture_cfg(TimerConfig {
        timeout_ms,
        ..TimerConfig::default()
    })
}

fn fixture_cfg(cfg: TimerConfig) -> Fixture {
    let source = Arc::new(LoopbackSource::new());
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let rx = notifier.subscribe();

    let host = Host::new(source.clone(), notifier).with_clock(Arc::new(VirtualClock::new()));
    let timer = ActivityTimer::spawn(cfg, host).unwrap();

    Fixture { source, rx, timer }
}

fn mv(x: f64, y: f64) -> Signal {
    Signal::PointerMove {
        x: Some(x),
        y: Some(y),
    }
}

#[tokio::test(start_paused = true)]
async fn goes_idle_after_the_configured_timeout() {
    let mut fx = fixture(2000);
    assert!(!fx.timer.is_idle().await);

    time::sleep(Duration::from_millis(2100)).await;

    assert!(fx.timer.is_idle().await);
    assert_eq!(fx.timer.remaining_time().await, 0);

    let notice = fx.rx.try_recv().expect("one idle notice");
    assert_eq!(notice.kind, NoticeKind::Idle);
    assert!(notice.event.is_none());
    assert!(fx.rx.try_recv().is_err(), "exactly one notice expected");
}

#[tokio::test(start_paused = true)]
async fn activity_postpones_the_idle_transition() {
    let fx = fixture(2000);

    time::sleep(Duration::from_millis(500)).await;
    fx.source.emit(Signal::KeyDown);
    assert!(!fx.timer.is_idle().await);
    assert_eq!(fx.timer.last_active_time().await, 500);

    // Original deadline at 2000 was replaced by one at 2500.
    time::sleep(Duration::from_millis(1900)).await;
    assert!(!fx.timer.is_idle().await);

    time::sleep(Duration::from_millis(200)).await;
    assert!(fx.timer.is_idle().await);
    assert_eq!(fx.timer.elapsed_time().await, 100);
}

#[tokio::test(start_paused = true)]
async fn reactivation_dispatches_an_active_notice() {
    let mut fx = fixture(1000);

    time::sleep(Duration::from_millis(1100)).await;
    fx.source.emit(Signal::KeyDown);
    assert!(!fx.timer.is_idle().await);

    let idle = fx.rx.try_recv().expect("idle notice");
    assert_eq!(idle.kind, NoticeKind::Idle);
    assert_eq!(idle.timer.last_transition_ms, 1000);

    let active = fx.rx.try_recv().expect("active notice");
    assert_eq!(active.kind, NoticeKind::Active);
    assert_eq!(active.event, Some(Signal::KeyDown));
    assert_eq!(active.timer.last_transition_ms, 1100);
}

#[tokio::test(start_paused = true)]
async fn pause_then_resume_finishes_the_frozen_countdown() {
    let fx = fixture(2000);

    time::sleep(Duration::from_millis(300)).await;
    fx.timer.pause().await;
    assert_eq!(fx.timer.remaining_time().await, 1700);

    // A long pause changes nothing.
    time::sleep(Duration::from_millis(9700)).await;
    assert!(!fx.timer.is_idle().await);
    assert_eq!(fx.timer.remaining_time().await, 1700);

    // Resume at 10_000: idle lands 1700ms later, at 11_700.
    fx.timer.resume().await;
    time::sleep(Duration::from_millis(1699)).await;
    assert!(!fx.timer.is_idle().await);

    time::sleep(Duration::from_millis(2)).await;
    assert!(fx.timer.is_idle().await);

    let snap = fx.timer.snapshot().await.expect("snapshot");
    assert_eq!(snap.last_transition_ms, 11_700);
}

#[tokio::test(start_paused = true)]
async fn reset_while_idle_restarts_the_countdown() {
    let fx = fixture(1000);

    time::sleep(Duration::from_millis(1500)).await;
    assert!(fx.timer.is_idle().await);

    fx.timer.reset().await;
    assert!(!fx.timer.is_idle().await);
    assert_eq!(fx.timer.remaining_time().await, 1000);

    time::sleep(Duration::from_millis(1100)).await;
    assert!(fx.timer.is_idle().await);
}

#[tokio::test(start_paused = true)]
async fn duplicate_pointer_moves_do_not_extend_the_deadline() {
    let fx = fixture(1000);

    time::sleep(Duration::from_millis(300)).await;
    fx.source.emit(mv(5.0, 5.0));
    assert_eq!(fx.timer.last_active_time().await, 300);

    time::sleep(Duration::from_millis(300)).await;
    fx.source.emit(mv(5.0, 5.0));
    assert_eq!(fx.timer.last_active_time().await, 300);

    // Deadline stayed at 1300.
    time::sleep(Duration::from_millis(750)).await;
    assert!(fx.timer.is_idle().await);
}

#[tokio::test(start_paused = true)]
async fn initially_idle_timer_waits_silently_for_activity() {
    let mut fx = fixture_cfg(TimerConfig {
        timeout_ms: 1000,
        initially_idle: true,
        ..TimerConfig::default()
    });

    assert!(fx.timer.is_idle().await);
    time::sleep(Duration::from_millis(3000)).await;
    assert!(fx.timer.is_idle().await);
    assert!(fx.rx.try_recv().is_err(), "no notice without a transition");

    fx.source.emit(Signal::KeyDown);
    assert!(!fx.timer.is_idle().await);
    assert_eq!(fx.rx.try_recv().expect("active notice").kind, NoticeKind::Active);
}

#[tokio::test(start_paused = true)]
async fn activity_syncs_between_contexts_through_the_channel() {
    let channel = MemoryChannel::new();
    let clock_a = Arc::new(VirtualClock::new());
    let clock_b = Arc::new(VirtualClock::new());

    let cfg = TimerConfig {
        timeout_ms: 1000,
        sync_key: Some("shared-session".to_string()),
        ..TimerConfig::default()
    };

    let source_a = Arc::new(LoopbackSource::new());
    let timer_a = ActivityTimer::spawn(
        cfg.clone(),
        Host::new(source_a.clone(), Arc::new(BroadcastNotifier::new(16)))
            .with_clock(clock_a)
            .with_channel(Arc::new(channel.port())),
    )
    .unwrap();

    let source_b = Arc::new(LoopbackSource::new());
    let timer_b = ActivityTimer::spawn(
        cfg,
        Host::new(source_b.clone(), Arc::new(BroadcastNotifier::new(16)))
            .with_clock(clock_b)
            .with_channel(Arc::new(channel.port())),
    )
    .unwrap();

    // Local activity in context A, just before B would go idle.
    time::sleep(Duration::from_millis(800)).await;
    source_a.emit(Signal::KeyDown);
    assert!(!timer_a.is_idle().await);
    assert!(!timer_b.is_idle().await);
    assert_eq!(timer_b.last_active_time().await, 800);

    // B's original deadline at 1000 was pushed out to 1800 by the sync.
    time::sleep(Duration::from_millis(300)).await;
    assert!(!timer_b.is_idle().await);

    time::sleep(Duration::from_millis(800)).await;
    assert!(timer_b.is_idle().await);

    // The write landed in the shared store.
    let observer = channel.port();
    assert_eq!(observer.get("shared-session"), Some("800".to_string()));
}

#[tokio::test(start_paused = true)]
async fn unparseable_channel_values_are_dropped() {
    let channel = MemoryChannel::new();

    let cfg = TimerConfig {
        timeout_ms: 1000,
        sync_key: Some("shared-session".to_string()),
        ..TimerConfig::default()
    };

    let source = Arc::new(LoopbackSource::new());
    let timer = ActivityTimer::spawn(
        cfg,
        Host::new(source.clone(), Arc::new(BroadcastNotifier::new(16)))
            .with_clock(Arc::new(VirtualClock::new()))
            .with_channel(Arc::new(channel.port())),
    )
    .unwrap();

    time::sleep(Duration::from_millis(500)).await;
    let foreign = channel.port();
    foreign.set("shared-session", "not-a-timestamp".to_string());

    assert_eq!(timer.last_active_time().await, 0);
    time::sleep(Duration::from_millis(600)).await;
    assert!(timer.is_idle().await);
}

#[tokio::test(start_paused = true)]
async fn teardown_unsubscribes_everything() {
    let channel = MemoryChannel::new();

    let cfg = TimerConfig {
        timeout_ms: 1000,
        sync_key: Some("shared-session".to_string()),
        ..TimerConfig::default()
    };
    let monitored = cfg.monitored.clone();

    let source = Arc::new(LoopbackSource::new());
    let timer = ActivityTimer::spawn(
        cfg,
        Host::new(source.clone(), Arc::new(BroadcastNotifier::new(16)))
            .with_clock(Arc::new(VirtualClock::new()))
            .with_channel(Arc::new(channel.port())),
    )
    .unwrap();

    for kind in &monitored {
        assert_eq!(source.subscriber_count(*kind), 1);
    }
    assert_eq!(channel.watcher_count(), 1);

    timer.teardown().await;

    for kind in &monitored {
        assert_eq!(source.subscriber_count(*kind), 0);
    }
    assert_eq!(channel.watcher_count(), 0);
    assert_eq!(source.subscriber_count(EventKind::KeyDown), 0);
}
