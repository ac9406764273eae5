//! autodot-core: tap-point domain model + scheduling engine.
//!
//! Design goal: keep this crate UI-agnostic and platform-agnostic.
//! Platform specific I/O (gesture dispatch) lives in `autodot-platform`.

mod gate;
pub mod jitter;
mod scheduler;
mod service;
mod storage;

pub use gate::{CompletionHandle, GestureDispatcher, InjectionGate};
pub use scheduler::{SchedulerState, TapScheduler};
pub use service::{ControlCommand, SchedulerService, ServiceEvent, ServiceHandle};
pub use storage::{
    get_app_data_dir, ProfileSet, ProfileStore, StorageError, StorageResult,
};

use serde::{Deserialize, Serialize};

/// One schedulable tap target ("dot"): a screen position plus its own
/// cadence and jitter tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapPoint {
    /// Stable identifier, unique within a profile.
    pub id: String,
    /// Time between consecutive firings (ms). Zero means the point is
    /// stored but never scheduled.
    pub interval_ms: u64,
    /// How long the synthetic press is held down (ms).
    pub hold_ms: u64,
    /// Radius of the uniform-disk jitter applied to each firing (px).
    /// Zero fires at the exact coordinates every time.
    pub jitter_radius: f64,
    /// One-time delay before the first firing after activation (ms).
    pub start_delay_ms: u64,
    pub x: f64,
    pub y: f64,
}

impl TapPoint {
    /// Clamp fields that can arrive out of range from an external caller.
    /// The millisecond fields are unsigned already; only the jitter radius
    /// can go negative (or non-finite) in hand-edited data.
    pub fn sanitized(mut self) -> Self {
        if !self.jitter_radius.is_finite() || self.jitter_radius < 0.0 {
            self.jitter_radius = 0.0;
        }
        self
    }

    /// Whether this point can be activated at all.
    pub fn schedulable(&self) -> bool {
        self.interval_ms > 0
    }
}

/// A single synthetic press, ready for the dispatch surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressRequest {
    pub x: f64,
    pub y: f64,
    pub hold_ms: u64,
}
