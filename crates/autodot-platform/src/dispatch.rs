//! Gesture dispatch implementations.

use autodot_core::{CompletionHandle, GestureDispatcher, PressRequest};
use crossbeam_channel::{bounded, Sender, TrySendError};
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{PlatformError, PlatformResult};

/// Minimal no-op dispatcher for early UI development / testing.
/// Completes every press immediately.
pub struct NoopDispatcher;

impl GestureDispatcher for NoopDispatcher {
    fn dispatch(&self, press: PressRequest, done: CompletionHandle) {
        debug!(?press, "NoopDispatcher: would press");
        done.completed();
    }
}

/// Real gesture dispatcher using the `enigo` crate.
///
/// `dispatch` hands the press to a worker thread and returns immediately;
/// the worker moves the pointer, holds the left button for `hold_ms`,
/// releases, then reports completion. The injection gate guarantees at
/// most one press in flight, so a single worker never falls behind.
pub struct EnigoDispatcher {
    press_tx: Sender<(PressRequest, CompletionHandle)>,
}

impl EnigoDispatcher {
    /// Create the dispatcher and its worker thread.
    pub fn new() -> PlatformResult<Self> {
        let settings = Settings::default();
        let mut enigo = Enigo::new(&settings).map_err(|e| {
            PlatformError::InjectionFailed(format!("failed to create Enigo: {e}"))
        })?;

        let (press_tx, press_rx) = bounded::<(PressRequest, CompletionHandle)>(1);
        thread::spawn(move || {
            // Exits when the dispatcher (and its sender) is dropped.
            while let Ok((press, done)) = press_rx.recv() {
                match perform_press(&mut enigo, &press) {
                    Ok(()) => done.completed(),
                    Err(e) => {
                        warn!(error = %e, "press injection failed");
                        done.cancelled();
                    }
                }
            }
        });

        Ok(Self { press_tx })
    }
}

impl GestureDispatcher for EnigoDispatcher {
    fn dispatch(&self, press: PressRequest, done: CompletionHandle) {
        // The gate never allows two presses in flight, so the worker slot
        // should always be free; if it somehow is not, cancel instead of
        // blocking the timer thread.
        if let Err(e) = self.press_tx.try_send((press, done)) {
            let (_, done) = match e {
                TrySendError::Full(inner) | TrySendError::Disconnected(inner) => inner,
            };
            warn!("dispatch worker unavailable, cancelling press");
            done.cancelled();
        }
    }
}

fn perform_press(enigo: &mut Enigo, press: &PressRequest) -> PlatformResult<()> {
    debug!(x = press.x, y = press.y, hold_ms = press.hold_ms, "injecting press");
    enigo
        .move_mouse(press.x.round() as i32, press.y.round() as i32, Coordinate::Abs)
        .map_err(|e| PlatformError::InjectionFailed(e.to_string()))?;
    enigo
        .button(Button::Left, Direction::Press)
        .map_err(|e| PlatformError::InjectionFailed(e.to_string()))?;
    if press.hold_ms > 0 {
        thread::sleep(Duration::from_millis(press.hold_ms));
    }
    enigo
        .button(Button::Left, Direction::Release)
        .map_err(|e| PlatformError::InjectionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodot_core::InjectionGate;
    use std::sync::Arc;

    #[test]
    fn test_noop_dispatcher_completes_synchronously() {
        let gate = InjectionGate::new(Arc::new(NoopDispatcher));
        let press = PressRequest {
            x: 1.0,
            y: 2.0,
            hold_ms: 0,
        };
        assert!(gate.submit(press));
        // Completed inline, so the gate is free again right away.
        assert!(!gate.is_busy());
        assert!(gate.submit(press));
    }
}
