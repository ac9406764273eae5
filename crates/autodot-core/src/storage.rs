//! Profile persistence: one JSON blob mapping profile name -> tap points,
//! plus the "which profile is active" pointer.

use crate::TapPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Everything the store persists: named profiles plus the active pointer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSet {
    pub profiles: BTreeMap<String, Vec<TapPoint>>,
    /// Name of the profile the scheduler should run; `None` until chosen.
    #[serde(default)]
    pub active: Option<String>,
}

impl ProfileSet {
    /// Points of the active profile, when one is set and still exists.
    pub fn active_points(&self) -> Option<&[TapPoint]> {
        let name = self.active.as_deref()?;
        self.profiles.get(name).map(|points| points.as_slice())
    }
}

/// Get the app data directory for autodot.
pub fn get_app_data_dir() -> PathBuf {
    let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("autodot")
}

/// Durable profile store backed by a single JSON file.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Store under the platform data directory.
    pub fn open_default() -> Self {
        Self {
            path: get_app_data_dir().join("profiles.json"),
        }
    }

    /// Store at an explicit path (tests, portable installs).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the profile set.
    ///
    /// Unreadable or corrupt data resets to an empty set instead of
    /// surfacing a parse error: a broken blob must never take the caller
    /// down.
    pub fn load(&self) -> ProfileSet {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no profile file yet");
                return ProfileSet::default();
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to read profiles, resetting to empty");
                return ProfileSet::default();
            }
        };
        match serde_json::from_str(&json) {
            Ok(set) => {
                debug!(path = ?self.path, "loaded profiles");
                set
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "corrupt profile data, resetting to empty");
                ProfileSet::default()
            }
        }
    }

    /// Save the whole profile set.
    pub fn save(&self, set: &ProfileSet) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(set)?;
        fs::write(&self.path, json)?;
        info!(path = ?self.path, profiles = set.profiles.len(), "saved profiles");
        Ok(())
    }

    pub fn active_profile_name(&self) -> Option<String> {
        self.load().active
    }

    pub fn set_active_profile_name(&self, name: &str) -> StorageResult<()> {
        let mut set = self.load();
        set.active = Some(name.to_string());
        self.save(&set)
    }
}
