//! Cancellable local timers layered on top of the state store.
//!
//! [`TimerScheduler`] owns four independent categories: the pre-game
//! countdown, the forced single-candidate guess, the join timeout, and
//! the post-game auto-return. Each category is a [`Slot`] holding at most
//! one spawned task and a monotonically increasing epoch. Starting a
//! category aborts the previous task and bumps the epoch, so at most one
//! instance per category is ever pending.
//!
//! Fired [`TimerEvent`]s carry the epoch they were armed with. A task can
//! fire after a cancellation was requested but before the abort landed;
//! the session loop drops any event whose epoch no longer matches via
//! [`TimerScheduler::is_live`], so a stale firing is a no-op.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A timer firing, delivered to the session loop's event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second of pre-game countdown elapsed; `remaining` is the new
    /// display value.
    CountdownTick { remaining: u32, epoch: u64 },
    /// The pre-game countdown reached zero.
    CountdownFinished { epoch: u64 },
    /// The forced-guess delay elapsed; the current player must now pick
    /// the single remaining number.
    ForcedGuessDue { epoch: u64 },
    /// No join confirmation arrived within the join timeout.
    JoinTimeoutExpired { epoch: u64 },
    /// The finished screen lingered long enough; return to the lobby.
    AutoReturnDue { epoch: u64 },
}

/// One timer category: at most one running task, plus the epoch that
/// distinguishes live firings from stale ones.
#[derive(Debug, Default)]
struct Slot {
    handle: Option<JoinHandle<()>>,
    epoch: u64,
}

impl Slot {
    /// Abort any running task and invalidate in-flight firings, then
    /// return the epoch a new task must stamp its events with.
    fn rearm(&mut self) -> u64 {
        self.cancel();
        self.epoch
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.epoch += 1;
    }

    fn is_live(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }
}

/// Owner of the four cancellable timer categories.
///
/// Created alongside the session loop; events arrive on the receiver
/// returned from [`TimerScheduler::new`].
#[derive(Debug)]
pub struct TimerScheduler {
    events: mpsc::UnboundedSender<TimerEvent>,
    countdown: Slot,
    forced_guess: Slot,
    join_timeout: Slot,
    auto_return: Slot,
}

impl TimerScheduler {
    /// Create a scheduler and the receiver its events are delivered on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                countdown: Slot::default(),
                forced_guess: Slot::default(),
                join_timeout: Slot::default(),
                auto_return: Slot::default(),
            },
            rx,
        )
    }

    /// Start (or restart) the pre-game countdown.
    ///
    /// Emits a [`TimerEvent::CountdownTick`] every `interval` until the
    /// count reaches zero, then one [`TimerEvent::CountdownFinished`].
    pub fn start_countdown(&mut self, start: u32, interval: Duration) {
        let epoch = self.countdown.rearm();
        let events = self.events.clone();
        self.countdown.handle = Some(tokio::spawn(async move {
            let mut remaining = start;
            loop {
                tokio::time::sleep(interval).await;
                remaining = remaining.saturating_sub(1);
                let event = if remaining > 0 {
                    TimerEvent::CountdownTick { remaining, epoch }
                } else {
                    TimerEvent::CountdownFinished { epoch }
                };
                if events.send(event).is_err() || remaining == 0 {
                    break;
                }
            }
        }));
    }

    /// Arm the one-shot forced-guess timer.
    pub fn start_forced_guess(&mut self, delay: Duration) {
        let epoch = self.forced_guess.rearm();
        self.forced_guess.handle =
            Some(self.one_shot(delay, TimerEvent::ForcedGuessDue { epoch }));
    }

    /// Arm the one-shot join timeout. Only one may be outstanding per
    /// join attempt; re-arming supersedes the previous one.
    pub fn start_join_timeout(&mut self, delay: Duration) {
        let epoch = self.join_timeout.rearm();
        self.join_timeout.handle =
            Some(self.one_shot(delay, TimerEvent::JoinTimeoutExpired { epoch }));
    }

    /// Arm the one-shot auto-return timer for the finished screen.
    pub fn start_auto_return(&mut self, delay: Duration) {
        let epoch = self.auto_return.rearm();
        self.auto_return.handle =
            Some(self.one_shot(delay, TimerEvent::AutoReturnDue { epoch }));
    }

    pub fn cancel_countdown(&mut self) {
        self.countdown.cancel();
    }

    pub fn cancel_forced_guess(&mut self) {
        self.forced_guess.cancel();
    }

    pub fn cancel_join_timeout(&mut self) {
        self.join_timeout.cancel();
    }

    pub fn cancel_auto_return(&mut self) {
        self.auto_return.cancel();
    }

    /// Cancel every category. Invoked on room reset (quit, kick) so no
    /// timer can fire against a stale room.
    pub fn cancel_all(&mut self) {
        self.countdown.cancel();
        self.forced_guess.cancel();
        self.join_timeout.cancel();
        self.auto_return.cancel();
    }

    /// Whether `event` belongs to the current arming of its category.
    ///
    /// Stale events — fired after a cancel or re-arm was requested —
    /// must be dropped by the caller.
    pub fn is_live(&self, event: &TimerEvent) -> bool {
        match event {
            TimerEvent::CountdownTick { epoch, .. }
            | TimerEvent::CountdownFinished { epoch } => self.countdown.is_live(*epoch),
            TimerEvent::ForcedGuessDue { epoch } => self.forced_guess.is_live(*epoch),
            TimerEvent::JoinTimeoutExpired { epoch } => self.join_timeout.is_live(*epoch),
            TimerEvent::AutoReturnDue { epoch } => self.auto_return.is_live(*epoch),
        }
    }

    fn one_shot(&self, delay: Duration, event: TimerEvent) -> JoinHandle<()> {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(dropped) = events.send(event) {
                debug!("timer event receiver dropped, discarding {:?}", dropped.0);
            }
        })
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
