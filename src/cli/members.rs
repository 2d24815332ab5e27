//! Member bootstrap.
//!
//! Membership itself is managed by the host, not by proposals. This command
//! seeds the members table of the state file so proposals can be submitted
//! and voted on locally.

use super::state::State;
use super::CliError;
use charter::host::{get_json, put_json, tables, MemberInfo, MemberStatus};
use clap::ValueEnum;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Accepted,
    Active,
    Retired,
}

impl From<StatusArg> for MemberStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Accepted => MemberStatus::Accepted,
            StatusArg::Active => MemberStatus::Active,
            StatusArg::Retired => MemberStatus::Retired,
        }
    }
}

/// Add `member_id`, or update its status and operator flag. Other fields of
/// an existing member's data are kept.
pub fn add_member(member_id: &str, operator: bool, status: StatusArg, state_path: &Path) -> Result<(), CliError> {
    let mut state = State::load(state_path)?;

    let existing: Option<MemberInfo> = get_json(&state.store, tables::MEMBERS_INFO, member_id)?;
    let mut member_data = match existing {
        Some(MemberInfo {
            member_data: Value::Object(data),
            ..
        }) => data,
        _ => serde_json::Map::new(),
    };
    member_data.insert("is_operator".to_string(), json!(operator));

    let info = MemberInfo {
        status: status.into(),
        member_data: Value::Object(member_data),
    };
    put_json(&mut state.store, tables::MEMBERS_INFO, member_id, &info)?;
    state.save(state_path)?;

    info!(member_id, operator, status = ?info.status, "member recorded");
    println!("Member {member_id} recorded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter::host::KvStore;
    use tempfile::TempDir;

    #[test]
    fn test_add_member() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("state.json");

        add_member("m0", true, StatusArg::Active, &state_path).unwrap();

        let state = State::load(&state_path).unwrap();
        let info: MemberInfo = get_json(&state.store, tables::MEMBERS_INFO, "m0").unwrap().unwrap();
        assert!(info.is_active());
        assert!(info.is_operator());
    }

    #[test]
    fn test_update_keeps_member_data() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("state.json");

        let mut state = State::default();
        state
            .store
            .put(
                tables::MEMBERS_INFO,
                "m0",
                br#"{"status":"Active","member_data":{"is_operator":true,"name":"alice"}}"#.to_vec(),
            )
            .unwrap();
        state.save(&state_path).unwrap();

        add_member("m0", false, StatusArg::Retired, &state_path).unwrap();

        let state = State::load(&state_path).unwrap();
        let info: MemberInfo = get_json(&state.store, tables::MEMBERS_INFO, "m0").unwrap().unwrap();
        assert_eq!(info.status, MemberStatus::Retired);
        assert!(!info.is_operator());
        assert_eq!(info.member_data["name"], "alice");
    }
}
