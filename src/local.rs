use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default)]
    is_manager: bool,
    #[serde(default)]
    user_email: Option<String>,
}

/// The two persisted markers behind the manager bypass login: an unverified
/// manager flag and the email it was granted to. Nothing else is stored
/// locally; all task data lives in the remote store.
pub struct BypassStore {
    path: PathBuf,
}

impl BypassStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Stored bypass email, if the manager flag is set. A corrupt or missing
    /// file reads as no bypass.
    pub fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let state: LocalState = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("ignoring corrupt local state file: {}", e);
                return None;
            }
        };
        if state.is_manager { state.user_email } else { None }
    }

    pub fn save(&self, email: &str) -> Result<(), AppError> {
        let state = LocalState {
            is_manager: true,
            user_email: Some(email.to_string()),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips_email() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BypassStore::new(dir.path().join("state.json"));

        assert_eq!(store.load(), None);
        store.save("boss@example.com").expect("save");
        assert_eq!(store.load(), Some("boss@example.com".to_string()));
    }

    #[test]
    fn clear_removes_markers_and_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BypassStore::new(dir.path().join("state.json"));

        store.save("boss@example.com").expect("save");
        store.clear().expect("clear");
        assert_eq!(store.load(), None);
        store.clear().expect("clear twice");
    }

    #[test]
    fn corrupt_file_reads_as_no_bypass() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").expect("write");

        let store = BypassStore::new(path);
        assert_eq!(store.load(), None);
    }
}
