#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod state;

use autodot_core::{
    ControlCommand, GestureDispatcher, ProfileSet, ProfileStore, SchedulerService,
    SchedulerState, ServiceEvent, TapPoint,
};
use autodot_platform::{EnigoDispatcher, NoopDispatcher};
use state::AppState;
use std::sync::Arc;
use tauri::State;
use tracing::warn;

#[derive(serde::Serialize)]
struct Status {
    state: SchedulerState,
    active_timers: usize,
}

#[tauri::command]
fn get_status(app: State<AppState>) -> Status {
    Status {
        state: app.service.state(),
        active_timers: app.service.active_timers(),
    }
}

#[tauri::command]
fn drain_events(app: State<AppState>) -> Vec<ServiceEvent> {
    let mut events = Vec::new();
    while let Some(event) = app.service.try_recv() {
        events.push(event);
    }
    events
}

#[tauri::command]
fn set_points(points: Vec<TapPoint>, app: State<AppState>) {
    app.service.send(ControlCommand::SetPoints(points));
}

#[tauri::command]
fn start_tapping(app: State<AppState>) {
    app.service.send(ControlCommand::Start);
}

#[tauri::command]
fn stop_tapping(app: State<AppState>) {
    app.service.send(ControlCommand::Stop);
}

#[tauri::command]
fn load_profiles(app: State<AppState>) -> ProfileSet {
    app.store.load()
}

#[tauri::command]
fn save_profiles(set: ProfileSet, app: State<AppState>) -> Result<(), String> {
    app.store.save(&set).map_err(|e| e.to_string())
}

#[tauri::command]
fn get_active_profile(app: State<AppState>) -> Option<String> {
    app.store.active_profile_name()
}

#[tauri::command]
fn set_active_profile(name: String, app: State<AppState>) -> Result<(), String> {
    app.store.set_active_profile_name(&name).map_err(|e| e.to_string())
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autodot_tauri=info,tauri=info".into()),
        )
        .try_init();
}

fn main() {
    init_logging();

    let dispatcher: Arc<dyn GestureDispatcher> = match EnigoDispatcher::new() {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            warn!(error = %e, "input injection unavailable, using no-op dispatcher");
            Arc::new(NoopDispatcher)
        }
    };
    let service = SchedulerService::spawn(dispatcher);
    let store = ProfileStore::open_default();

    // Seed the scheduler with the active profile so a restart comes back
    // armed with the last configuration, idle until the user starts it.
    let set = store.load();
    if let Some(points) = set.active_points() {
        service.send(ControlCommand::SetPoints(points.to_vec()));
    }

    tauri::Builder::default()
        .manage(AppState { service, store })
        .invoke_handler(tauri::generate_handler![
            get_status,
            drain_events,
            set_points,
            start_tapping,
            stop_tapping,
            load_profiles,
            save_profiles,
            get_active_profile,
            set_active_profile,
        ])
        .run(tauri::generate_context!())
        .expect("error while running autodot");
}
