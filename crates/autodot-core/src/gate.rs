//! Injection gate: at most one synthetic gesture in flight.

use crate::PressRequest;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Boundary that turns an accepted press into a platform gesture.
///
/// `dispatch` must not block the caller. Completion is reported later, on
/// whatever thread the platform uses, through the [`CompletionHandle`].
pub trait GestureDispatcher: Send + Sync {
    fn dispatch(&self, press: PressRequest, done: CompletionHandle);
}

/// Extra time past `hold_ms` before a submission that never called back is
/// considered stuck and the gate may be reclaimed.
const RECLAIM_SLACK: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct GateState {
    busy: bool,
    /// Bumped on every accepted submission. A completion handle from an
    /// older submission must not clear a newer submission's busy flag.
    generation: u64,
    /// When the in-flight submission may be reclaimed if no callback came.
    deadline: Instant,
}

/// Serializes competing press requests onto a dispatch surface that only
/// honors one in-flight gesture.
///
/// A submission while busy is dropped, not queued: a missed tick is
/// retried at the point's next natural period, and queuing would produce
/// catch-up bursts that defeat the jitter.
pub struct InjectionGate {
    state: Arc<Mutex<GateState>>,
    dispatcher: Arc<dyn GestureDispatcher>,
    slack: Duration,
}

impl InjectionGate {
    pub fn new(dispatcher: Arc<dyn GestureDispatcher>) -> Self {
        Self::with_slack(dispatcher, RECLAIM_SLACK)
    }

    /// `slack` bounds how long a submission whose callback never arrives
    /// can keep the gate busy past its `hold_ms`.
    pub fn with_slack(dispatcher: Arc<dyn GestureDispatcher>, slack: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                busy: false,
                generation: 0,
                deadline: Instant::now(),
            })),
            dispatcher,
            slack,
        }
    }

    /// Try to submit a press. Returns `false` without dispatching when a
    /// prior gesture is still in flight; the caller drops the tick.
    pub fn submit(&self, press: PressRequest) -> bool {
        let done = {
            let mut state = self.state.lock().unwrap();
            if state.busy {
                if Instant::now() < state.deadline {
                    debug!(?press, "gate busy, dropping tick");
                    return false;
                }
                // No callback within hold + slack: the dispatch surface
                // went silent. Reclaim so the scheduler is not muted
                // forever.
                warn!(
                    generation = state.generation,
                    "reclaiming gate after missing completion"
                );
            }
            state.busy = true;
            state.generation += 1;
            state.deadline =
                Instant::now() + Duration::from_millis(press.hold_ms) + self.slack;
            CompletionHandle {
                state: Arc::clone(&self.state),
                generation: state.generation,
            }
        };
        // Dispatch outside the lock: the dispatcher may complete
        // synchronously, and completion takes the same lock.
        self.dispatcher.dispatch(press, done);
        true
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().unwrap().busy
    }
}

/// Clears the gate once the dispatched gesture finished or was cancelled.
///
/// Exactly one of [`completed`](Self::completed) /
/// [`cancelled`](Self::cancelled) should be called per accepted
/// submission. A late call from a reclaimed submission is ignored.
pub struct CompletionHandle {
    state: Arc<Mutex<GateState>>,
    generation: u64,
}

impl CompletionHandle {
    pub fn completed(self) {
        self.clear("completed");
    }

    pub fn cancelled(self) {
        self.clear("cancelled");
    }

    fn clear(self, outcome: &str) {
        let mut state = self.state.lock().unwrap();
        if state.generation == self.generation {
            state.busy = false;
            debug!(generation = self.generation, outcome, "gate cleared");
        } else {
            debug!(
                generation = self.generation,
                current = state.generation,
                outcome,
                "stale completion ignored"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn press(hold_ms: u64) -> PressRequest {
        PressRequest {
            x: 10.0,
            y: 20.0,
            hold_ms,
        }
    }

    /// Holds on to completion handles so tests decide when to complete.
    #[derive(Default)]
    struct ManualDispatcher {
        pending: StdMutex<Vec<CompletionHandle>>,
    }

    impl ManualDispatcher {
        fn take(&self) -> CompletionHandle {
            self.pending.lock().unwrap().pop().expect("no pending press")
        }
    }

    impl GestureDispatcher for ManualDispatcher {
        fn dispatch(&self, _press: PressRequest, done: CompletionHandle) {
            self.pending.lock().unwrap().push(done);
        }
    }

    /// Accepts presses and never calls back.
    struct SilentDispatcher;

    impl GestureDispatcher for SilentDispatcher {
        fn dispatch(&self, _press: PressRequest, done: CompletionHandle) {
            drop(done);
        }
    }

    #[test]
    fn test_second_submit_rejected_until_complete() {
        let dispatcher = Arc::new(ManualDispatcher::default());
        let gate = InjectionGate::new(dispatcher.clone());

        assert!(gate.submit(press(1000)));
        assert!(!gate.submit(press(1000)));
        assert!(gate.is_busy());

        dispatcher.take().completed();
        assert!(!gate.is_busy());
        assert!(gate.submit(press(1000)));
    }

    #[test]
    fn test_cancelled_clears_gate() {
        let dispatcher = Arc::new(ManualDispatcher::default());
        let gate = InjectionGate::new(dispatcher.clone());

        assert!(gate.submit(press(50)));
        dispatcher.take().cancelled();
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_silent_dispatcher_is_reclaimed_after_deadline() {
        // hold = 0 and slack = 0: the submission is reclaimable at once.
        let gate = InjectionGate::with_slack(Arc::new(SilentDispatcher), Duration::ZERO);

        assert!(gate.submit(press(0)));
        assert!(gate.is_busy());
        // The dispatcher never called back, but the deadline has passed,
        // so the next submission takes the gate over.
        assert!(gate.submit(press(0)));
    }

    #[test]
    fn test_reclaim_respects_hold_time() {
        let dispatcher = Arc::new(ManualDispatcher::default());
        let gate = InjectionGate::with_slack(dispatcher.clone(), Duration::ZERO);

        // A long hold keeps the deadline in the future.
        assert!(gate.submit(press(5_000)));
        assert!(!gate.submit(press(0)));
        dispatcher.take().completed();
        assert!(gate.submit(press(0)));
    }

    #[test]
    fn test_stale_completion_does_not_clear_newer_submission() {
        let dispatcher = Arc::new(ManualDispatcher::default());
        let gate = InjectionGate::with_slack(dispatcher.clone(), Duration::ZERO);

        assert!(gate.submit(press(0)));
        let stale = dispatcher.take();

        // Deadline passed; a new submission reclaims the gate.
        assert!(gate.submit(press(5_000)));
        let current = dispatcher.take();

        // The reclaimed submission's callback finally arrives: ignored.
        stale.completed();
        assert!(gate.is_busy());

        current.completed();
        assert!(!gate.is_busy());
    }
}
