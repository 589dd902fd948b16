//! Per-room countdowns and delayed continuations backed by Tokio tasks.

use std::time::Duration;

use dashmap::DashMap;
use tokio::{
    task::AbortHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::state::game::RoomId;

const TICK: Duration = Duration::from_secs(1);

#[derive(Default)]
struct RoomTimers {
    countdown: Option<AbortHandle>,
    delayed: Option<AbortHandle>,
}

/// Owns at most one countdown and one delayed continuation per room.
///
/// Arming either slot aborts whatever was previously armed in it, so a room
/// can never leak a second running timer. Must be used from within a Tokio
/// runtime.
#[derive(Default)]
pub struct TimerEngine {
    rooms: DashMap<RoomId, RoomTimers>,
}

impl TimerEngine {
    /// Create an engine with no armed timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a one-second resolution countdown for `room_id`.
    ///
    /// `on_tick` receives the seconds left (derived from a fixed deadline and
    /// clamped at zero) on every tick. `on_expire` runs exactly once, right
    /// after the tick that observes zero, then the countdown stops.
    pub fn arm<T, E>(&self, room_id: RoomId, seconds: u32, on_tick: T, on_expire: E)
    where
        T: Fn(u32) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + Duration::from_secs(u64::from(seconds));
        let first_tick = Instant::now() + TICK;

        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(first_tick, TICK);
            // A stalled runtime collapses the missed ticks into one.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let remaining = seconds_until(deadline);
                on_tick(remaining);
                if remaining == 0 {
                    on_expire();
                    break;
                }
            }
        });

        let previous = self
            .rooms
            .entry(room_id)
            .or_default()
            .countdown
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            debug!(room_id = %room_id, "replacing armed countdown");
            previous.abort();
        }
    }

    /// Run `continuation` once after `delay`, replacing any pending one.
    pub fn schedule<F>(&self, room_id: RoomId, delay: Duration, continuation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            continuation();
        });

        let previous = self
            .rooms
            .entry(room_id)
            .or_default()
            .delayed
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Stop the countdown for `room_id`, if any.
    pub fn cancel(&self, room_id: RoomId) {
        if let Some(mut timers) = self.rooms.get_mut(&room_id) {
            if let Some(handle) = timers.countdown.take() {
                handle.abort();
            }
        }
    }

    /// Stop both the countdown and the pending continuation and forget the room.
    pub fn cancel_all(&self, room_id: RoomId) {
        if let Some((_, timers)) = self.rooms.remove(&room_id) {
            for handle in [timers.countdown, timers.delayed].into_iter().flatten() {
                handle.abort();
            }
        }
    }

    /// Whether a countdown is currently running for `room_id`.
    pub fn is_armed(&self, room_id: RoomId) -> bool {
        self.rooms
            .get(&room_id)
            .and_then(|timers| {
                timers
                    .countdown
                    .as_ref()
                    .map(|handle| !handle.is_finished())
            })
            .unwrap_or(false)
    }
}

/// Whole seconds left until `deadline`, rounded up and saturating at zero.
fn seconds_until(deadline: Instant) -> u32 {
    let left = deadline.saturating_duration_since(Instant::now());
    let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use uuid::Uuid;

    use super::*;

    struct Recorder {
        ticks: Arc<Mutex<Vec<u32>>>,
        expiries: Arc<AtomicU32>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                ticks: Arc::new(Mutex::new(Vec::new())),
                expiries: Arc::new(AtomicU32::new(0)),
            }
        }

        fn arm(&self, engine: &TimerEngine, room_id: RoomId, seconds: u32) {
            let ticks = Arc::clone(&self.ticks);
            let expiries = Arc::clone(&self.expiries);
            engine.arm(
                room_id,
                seconds,
                move |remaining| ticks.lock().unwrap().push(remaining),
                move || {
                    expiries.fetch_add(1, Ordering::SeqCst);
                },
            );
        }

        fn ticks(&self) -> Vec<u32> {
            self.ticks.lock().unwrap().clone()
        }

        fn expiries(&self) -> u32 {
            self.expiries.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_down_and_expires_once() {
        let engine = TimerEngine::new();
        let room = Uuid::new_v4();
        let recorder = Recorder::new();

        recorder.arm(&engine, room, 3);
        time::sleep(Duration::from_millis(10_500)).await;

        assert_eq!(recorder.ticks(), vec![2, 1, 0]);
        assert_eq!(recorder.expiries(), 1);
        assert!(!engine.is_armed(room));
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_countdown() {
        let engine = TimerEngine::new();
        let room = Uuid::new_v4();
        let first = Recorder::new();
        let second = Recorder::new();

        first.arm(&engine, room, 5);
        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(first.ticks(), vec![4, 3]);

        second.arm(&engine, room, 3);
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(first.ticks(), vec![4, 3]);
        assert_eq!(first.expiries(), 0);
        assert_eq!(second.ticks(), vec![2, 1, 0]);
        assert_eq!(second.expiries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_countdown_and_is_safe_without_one() {
        let engine = TimerEngine::new();
        let room = Uuid::new_v4();
        let recorder = Recorder::new();

        engine.cancel(room);

        recorder.arm(&engine, room, 4);
        time::sleep(Duration::from_millis(1_500)).await;
        assert!(engine.is_armed(room));
        engine.cancel(room);
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(recorder.ticks(), vec![3]);
        assert_eq!(recorder.expiries(), 0);
        assert!(!engine.is_armed(room));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_clock_still_expires_exactly_once() {
        let engine = TimerEngine::new();
        let room = Uuid::new_v4();
        let recorder = Recorder::new();

        recorder.arm(&engine, room, 5);
        time::advance(Duration::from_secs(30)).await;
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(recorder.expiries(), 1);
        assert_eq!(recorder.ticks().last(), Some(&0));
    }

    #[tokio::test(start_paused = true)]
    async fn rooms_are_independent() {
        let engine = TimerEngine::new();
        let (room_a, room_b) = (Uuid::new_v4(), Uuid::new_v4());
        let (first, second) = (Recorder::new(), Recorder::new());

        first.arm(&engine, room_a, 2);
        second.arm(&engine, room_b, 2);
        engine.cancel(room_a);
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(first.expiries(), 0);
        assert_eq!(second.expiries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_drops_pending_continuation() {
        let engine = TimerEngine::new();
        let room = Uuid::new_v4();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&fired);
        engine.schedule(room, Duration::from_secs(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        engine.cancel_all(room);
        engine.cancel_all(room);
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduling_again_replaces_pending_continuation() {
        let engine = TimerEngine::new();
        let room = Uuid::new_v4();
        let fired = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let fired = Arc::clone(&fired);
            engine.schedule(room, Duration::from_secs(2), move || {
                fired.lock().unwrap().push(label);
            });
        }
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(*fired.lock().unwrap(), vec!["second"]);
    }
}
