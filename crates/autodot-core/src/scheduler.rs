//! Tap scheduler: one fixed-rate timer per active point.

use crate::{jitter, InjectionGate, PressRequest, TapPoint};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Whole-schedule state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle,
    Running,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Cancellable handle for one point's timer thread.
struct TimerHandle {
    cancel_tx: Sender<()>,
    thread: JoinHandle<()>,
}

struct SchedInner {
    state: SchedulerState,
    points: Vec<TapPoint>,
    timers: HashMap<String, TimerHandle>,
}

/// Owns the live set of tap points and their per-point timers.
///
/// All methods take `&self`; the scheduler is meant to be shared behind an
/// `Arc` between the control loop and whoever queries state. Stop and
/// configure cancel-and-join: no timer from a replaced set can fire after
/// the call returns.
pub struct TapScheduler {
    gate: Arc<InjectionGate>,
    inner: Mutex<SchedInner>,
}

impl TapScheduler {
    pub fn new(gate: Arc<InjectionGate>) -> Self {
        Self {
            gate,
            inner: Mutex::new(SchedInner {
                state: SchedulerState::Idle,
                points: Vec::new(),
                timers: HashMap::new(),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.lock().unwrap().state
    }

    /// Number of currently active timers (running, schedulable points).
    pub fn active_timers(&self) -> usize {
        self.inner.lock().unwrap().timers.len()
    }

    /// Replace the held point set.
    ///
    /// While running this is an atomic swap: every old timer is cancelled
    /// and joined before the new set is activated.
    pub fn configure(&self, points: Vec<TapPoint>) {
        let mut inner = self.inner.lock().unwrap();
        drain_timers(&mut inner.timers);
        inner.points = dedup_points(points);
        info!(count = inner.points.len(), "point set replaced");
        if inner.state == SchedulerState::Running {
            self.spawn_timers(&mut inner);
        }
    }

    /// Activate every schedulable point: first firing after its
    /// `start_delay_ms`, then fixed-rate every `interval_ms`.
    ///
    /// Starting while already running tears the old timers down first, so
    /// a point is never driven by two timers at once.
    pub fn start(&self) {
        let mut inner = self.inner.lock().unwrap();
        drain_timers(&mut inner.timers);
        inner.state = SchedulerState::Running;
        self.spawn_timers(&mut inner);
        info!(active = inner.timers.len(), "scheduler running");
    }

    /// Cancel every timer and go idle. No timer fires after this returns.
    /// Calling on an already idle scheduler is a no-op.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        drain_timers(&mut inner.timers);
        if inner.state != SchedulerState::Idle {
            inner.state = SchedulerState::Idle;
            info!("scheduler stopped");
        }
    }

    fn spawn_timers(&self, inner: &mut SchedInner) {
        for point in &inner.points {
            if !point.schedulable() {
                debug!(
                    id = %point.id,
                    interval_ms = point.interval_ms,
                    "skipping point with non-positive interval"
                );
                continue;
            }
            let (cancel_tx, cancel_rx) = bounded(1);
            let gate = Arc::clone(&self.gate);
            // The thread owns its own copy of the point: every tick reads
            // this snapshot, never live state a UI edit could be mutating.
            let snapshot = point.clone();
            let thread = thread::spawn(move || run_point_timer(snapshot, gate, cancel_rx));
            inner
                .timers
                .insert(point.id.clone(), TimerHandle { cancel_tx, thread });
        }
    }
}

fn drain_timers(timers: &mut HashMap<String, TimerHandle>) {
    for (id, handle) in timers.drain() {
        let _ = handle.cancel_tx.send(());
        if handle.thread.join().is_err() {
            warn!(id = %id, "timer thread panicked");
        }
    }
}

/// Drop duplicate ids (first occurrence wins) and sanitize fields.
fn dedup_points(points: Vec<TapPoint>) -> Vec<TapPoint> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(points.len());
    for point in points {
        let point = point.sanitized();
        if seen.insert(point.id.clone()) {
            out.push(point);
        } else {
            warn!(id = %point.id, "duplicate point id dropped");
        }
    }
    out
}

/// Fixed-rate loop for one point. Deadlines derive from the activation
/// instant, so neither a slow gesture nor a dropped tick shifts the
/// schedule.
fn run_point_timer(point: TapPoint, gate: Arc<InjectionGate>, cancel_rx: Receiver<()>) {
    let origin = Instant::now() + Duration::from_millis(point.start_delay_ms);
    let period = Duration::from_millis(point.interval_ms);
    let mut tick: u32 = 0;

    loop {
        let deadline = origin + period * tick;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            // The cancel channel doubles as the wait: a message (or the
            // sender disconnecting) wakes us immediately.
            match cancel_rx.recv_timeout(deadline - now) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        match cancel_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => {}
        }

        let (x, y) = jitter::sample((point.x, point.y), point.jitter_radius);
        let press = PressRequest {
            x,
            y,
            hold_ms: point.hold_ms,
        };
        // A busy gate drops this tick; the next period is the retry.
        let accepted = gate.submit(press);
        debug!(id = %point.id, x, y, accepted, "tick");

        tick += 1;
    }
}
