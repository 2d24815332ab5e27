//! State file handling
//!
//! The CLI plays the host: the key-value store and the node live in one JSON
//! file that is loaded before a command and saved after it succeeds. A
//! command that fails leaves the file untouched, so each invocation behaves
//! as one transaction.

use super::config::write_file;
use super::CliError;
use charter::host::memory::MemoryStore;
use charter::host::software::SoftwareNode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Everything the engine reads or writes between invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub store: MemoryStore,
    #[serde(default)]
    pub node: SoftwareNode,
}

impl State {
    /// Load the state file; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            debug!(path = %path.display(), "no state file, starting empty");
            return Ok(Self::default());
        }
        let bytes = fs::read(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        write_file(path, bytes)?;
        debug!(path = %path.display(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter::host::{put_json, tables, MemberInfo};
    use tempfile::TempDir;

    #[test]
    fn test_missing_state_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let state = State::load(&temp_dir.path().join("state.json")).unwrap();
        assert_eq!(state, State::default());
    }

    #[test]
    fn test_state_survives_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        let mut state = State::default();
        put_json(&mut state.store, tables::MEMBERS_INFO, "m0", &MemberInfo::active(true)).unwrap();
        state.node.ledger_generation = 3;
        state.save(&path).unwrap();

        assert_eq!(State::load(&path).unwrap(), state);
    }

    #[test]
    fn test_corrupt_state_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(State::load(&path), Err(CliError::Json { .. })));
    }
}
