//! Atomic save/load of one JSON file per user. Write-temp-then-rename keeps a
//! crash from ever leaving a partial file in place; a read failure of any
//! kind (missing file, bad JSON, mismatched user id) is treated as "no stored
//! BN" rather than a partial restore.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::observation::Observation;
use crate::services::bn_graph::NodeStructureDto;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BnMetadata {
    pub num_observations: usize,
    pub is_initialized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStructureDto {
    pub nodes: HashMap<String, NodeStructureDto>,
    pub evidence: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BnStateDto {
    pub user_id: i64,
    pub network_structure: NetworkStructureDto,
    pub observations: Vec<Observation>,
    pub metadata: BnMetadata,
}

/// Persists per-user BN state under `<base_dir>/bn_state/user_<id>.json`.
/// `base_dir` is handed in by the host (see SPEC_FULL.md §4.4); this type
/// does not resolve a platform data directory itself.
pub struct BnPersistence {
    base_dir: PathBuf,
}

impl BnPersistence {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        BnPersistence {
            base_dir: base_dir.into(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.base_dir.join("bn_state")
    }

    pub fn file_path(&self, user_id: i64) -> PathBuf {
        self.state_dir().join(format!("user_{user_id}.json"))
    }

    pub fn exists(&self, user_id: i64) -> bool {
        self.file_path(user_id).is_file()
    }

    pub fn save(&self, state: &BnStateDto) -> AppResult<PathBuf> {
        let dir = self.state_dir();
        std::fs::create_dir_all(&dir)?;
        let file_path = self.file_path(state.user_id);

        let json = serde_json::to_vec_pretty(state)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".bn_tmp_")
            .suffix(".json")
            .tempfile_in(&dir)
            .map_err(|err| AppError::persistence(format!("failed to create temp file: {err}")))?;

        use std::io::Write;
        tmp.write_all(&json)
            .map_err(|err| AppError::persistence(format!("failed to write temp file: {err}")))?;
        tmp.flush()
            .map_err(|err| AppError::persistence(format!("failed to flush temp file: {err}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|err| AppError::persistence(format!("failed to fsync temp file: {err}")))?;

        tmp.persist(&file_path)
            .map_err(|err| AppError::persistence(format!("failed to rename temp file: {err}")))?;

        Ok(file_path)
    }

    /// Missing file, unreadable JSON, or a `user_id` mismatch all resolve to
    /// `Ok(None)` — "absent", never a partial restore.
    pub fn load(&self, user_id: i64) -> AppResult<Option<BnStateDto>> {
        let file_path = self.file_path(user_id);
        if !file_path.is_file() {
            return Ok(None);
        }

        let contents = match std::fs::read_to_string(&file_path) {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };

        let state: BnStateDto = match serde_json::from_str(&contents) {
            Ok(s) => s,
            Err(_) => return Ok(None),
        };

        if state.user_id != user_id {
            return Ok(None);
        }

        Ok(Some(state))
    }

    pub fn delete(&self, user_id: i64) -> AppResult<bool> {
        let file_path = self.file_path(user_id);
        if !file_path.is_file() {
            return Ok(false);
        }
        std::fs::remove_file(&file_path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state(user_id: i64) -> BnStateDto {
        BnStateDto {
            user_id,
            network_structure: NetworkStructureDto {
                nodes: HashMap::new(),
                evidence: HashMap::new(),
            },
            observations: Vec::new(),
            metadata: BnMetadata {
                num_observations: 0,
                is_initialized: true,
            },
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BnPersistence::new(dir.path());
        let state = sample_state(42);
        store.save(&state).unwrap();

        let loaded = store.load(42).unwrap().expect("state should exist");
        assert_eq!(loaded.user_id, 42);
        assert!(loaded.metadata.is_initialized);
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = BnPersistence::new(dir.path());
        assert!(store.load(1).unwrap().is_none());
    }

    #[test]
    fn load_corrupted_file_returns_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = BnPersistence::new(dir.path());
        std::fs::create_dir_all(dir.path().join("bn_state")).unwrap();
        std::fs::write(store.file_path(7), b"{ not valid json").unwrap();
        assert!(store.load(7).unwrap().is_none());
    }

    #[test]
    fn no_temp_file_survives_a_successful_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = BnPersistence::new(dir.path());
        store.save(&sample_state(1)).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("bn_state"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".bn_tmp_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn delete_removes_file_and_reports_prior_existence() {
        let dir = tempfile::tempdir().unwrap();
        let store = BnPersistence::new(dir.path());
        store.save(&sample_state(3)).unwrap();
        assert!(store.delete(3).unwrap());
        assert!(!store.delete(3).unwrap());
    }
}
