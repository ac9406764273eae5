//! Application state for Tauri backend.

use autodot_core::{ProfileStore, ServiceHandle};

/// Global application state, managed by Tauri and handed to commands.
pub struct AppState {
    pub service: ServiceHandle,
    pub store: ProfileStore,
}
