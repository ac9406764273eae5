//! Control-channel service: command loop that owns the scheduler.

use crate::{GestureDispatcher, InjectionGate, SchedulerState, TapPoint, TapScheduler};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Control messages accepted from the UI layer or an external transport.
///
/// Delivery may be duplicated or arrive out of order relative to UI
/// actions; every command is safe to replay (configure swaps atomically,
/// stop is idempotent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControlCommand {
    SetPoints(Vec<TapPoint>),
    Start,
    Stop,
}

/// Events emitted for observers (status line, logs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServiceEvent {
    StateChanged { state: SchedulerState },
    Configured { points: usize, schedulable: usize },
}

/// Handle to the service thread.
///
/// Constructed once at startup and passed to whoever needs to control the
/// scheduler; there is deliberately no global way to reach the live
/// instance.
pub struct ServiceHandle {
    cmd_tx: Sender<ControlCommand>,
    event_rx: Receiver<ServiceEvent>,
    scheduler: Arc<TapScheduler>,
    thread: Option<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Send a control command to the service.
    pub fn send(&self, cmd: ControlCommand) {
        if let Err(e) = self.cmd_tx.send(cmd) {
            warn!("failed to send command to scheduler service: {}", e);
        }
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Option<ServiceEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Number of currently active per-point timers.
    pub fn active_timers(&self) -> usize {
        self.scheduler.active_timers()
    }

    /// Stop the scheduler and wait for the service thread to finish.
    pub fn shutdown(self) {
        let ServiceHandle {
            cmd_tx,
            scheduler,
            thread,
            ..
        } = self;
        scheduler.stop();
        // Closing the command channel ends the loop.
        drop(cmd_tx);
        if let Some(handle) = thread {
            let _ = handle.join();
        }
    }
}

/// Owns the scheduler and applies control commands in a dedicated thread.
pub struct SchedulerService {
    scheduler: Arc<TapScheduler>,
    cmd_rx: Receiver<ControlCommand>,
    event_tx: Sender<ServiceEvent>,
}

impl SchedulerService {
    /// Build the gate + scheduler around `dispatcher` and spawn the
    /// command loop. Returns the handle to control it.
    pub fn spawn(dispatcher: Arc<dyn GestureDispatcher>) -> ServiceHandle {
        let (cmd_tx, cmd_rx) = bounded(32);
        let (event_tx, event_rx) = bounded(256);
        let gate = Arc::new(InjectionGate::new(dispatcher));
        let scheduler = Arc::new(TapScheduler::new(gate));

        let service = SchedulerService {
            scheduler: Arc::clone(&scheduler),
            cmd_rx,
            event_tx,
        };
        let thread = thread::spawn(move || service.run_loop());

        ServiceHandle {
            cmd_tx,
            event_rx,
            scheduler,
            thread: Some(thread),
        }
    }

    fn run_loop(self) {
        info!("scheduler service started");

        while let Ok(cmd) = self.cmd_rx.recv() {
            debug!(?cmd, "handling control command");
            match cmd {
                ControlCommand::SetPoints(points) => {
                    let total = points.len();
                    let schedulable = points.iter().filter(|p| p.schedulable()).count();
                    self.scheduler.configure(points);
                    self.emit(ServiceEvent::Configured {
                        points: total,
                        schedulable,
                    });
                }
                ControlCommand::Start => {
                    self.scheduler.start();
                    self.emit(ServiceEvent::StateChanged {
                        state: SchedulerState::Running,
                    });
                }
                ControlCommand::Stop => {
                    self.scheduler.stop();
                    self.emit(ServiceEvent::StateChanged {
                        state: SchedulerState::Idle,
                    });
                }
            }
        }

        // Channel closed: make sure no timers outlive the service.
        self.scheduler.stop();
        info!("scheduler service exiting");
    }

    fn emit(&self, event: ServiceEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("failed to emit service event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompletionHandle, PressRequest};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingDispatcher {
        presses: Mutex<Vec<PressRequest>>,
    }

    impl GestureDispatcher for CountingDispatcher {
        fn dispatch(&self, press: PressRequest, done: CompletionHandle) {
            self.presses.lock().unwrap().push(press);
            done.completed();
        }
    }

    fn dot(id: &str, interval_ms: u64) -> TapPoint {
        TapPoint {
            id: id.into(),
            interval_ms,
            hold_ms: 0,
            jitter_radius: 0.0,
            start_delay_ms: 0,
            x: 5.0,
            y: 5.0,
        }
    }

    /// Wait for the service thread to drain its queue.
    fn settle() {
        thread::sleep(Duration::from_millis(50));
    }

    #[test]
    fn test_command_round_trip() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let handle = SchedulerService::spawn(dispatcher.clone());

        handle.send(ControlCommand::SetPoints(vec![dot("a", 30)]));
        handle.send(ControlCommand::Start);
        settle();
        assert_eq!(handle.state(), SchedulerState::Running);
        assert_eq!(handle.active_timers(), 1);

        handle.send(ControlCommand::Stop);
        settle();
        assert_eq!(handle.state(), SchedulerState::Idle);
        assert!(!dispatcher.presses.lock().unwrap().is_empty());

        handle.shutdown();
    }

    #[test]
    fn test_duplicate_stop_is_harmless() {
        let handle = SchedulerService::spawn(Arc::new(CountingDispatcher::default()));
        handle.send(ControlCommand::Stop);
        handle.send(ControlCommand::Stop);
        settle();
        assert_eq!(handle.state(), SchedulerState::Idle);
        handle.shutdown();
    }

    #[test]
    fn test_events_are_emitted() {
        let handle = SchedulerService::spawn(Arc::new(CountingDispatcher::default()));
        handle.send(ControlCommand::SetPoints(vec![dot("a", 0), dot("b", 40)]));
        settle();

        match handle.try_recv() {
            Some(ServiceEvent::Configured {
                points,
                schedulable,
            }) => {
                assert_eq!(points, 2);
                assert_eq!(schedulable, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        handle.shutdown();
    }

    #[test]
    fn test_shutdown_stops_timers() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let handle = SchedulerService::spawn(dispatcher.clone());
        handle.send(ControlCommand::SetPoints(vec![dot("a", 20)]));
        handle.send(ControlCommand::Start);
        settle();
        handle.shutdown();

        let fired = dispatcher.presses.lock().unwrap().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(dispatcher.presses.lock().unwrap().len(), fired);
    }
}
