//! Proposal lifecycle commands against the state file.

use super::state::State;
use super::{print_json, read_text, CliError};
use charter::Governance;
use serde_json::json;
use std::path::Path;

pub fn propose(proposal: &Path, proposer: &str, state_path: &Path) -> Result<(), CliError> {
    let json = read_text(proposal)?;
    let mut state = State::load(state_path)?;

    let summary = Governance::new(&mut state.store, &mut state.node).propose(&json, proposer)?;
    state.save(state_path)?;
    print_json(&summary)
}

pub fn vote(proposal_id: &str, member: &str, accept: bool, state_path: &Path) -> Result<(), CliError> {
    let mut state = State::load(state_path)?;

    let summary = Governance::new(&mut state.store, &mut state.node).vote(proposal_id, member, accept)?;
    state.save(state_path)?;
    print_json(&summary)
}

pub fn withdraw(proposal_id: &str, member: &str, state_path: &Path) -> Result<(), CliError> {
    let mut state = State::load(state_path)?;

    let summary = Governance::new(&mut state.store, &mut state.node).withdraw(proposal_id, member)?;
    state.save(state_path)?;
    print_json(&summary)
}

/// Print the proposal body next to its info.
pub fn show(proposal_id: &str, state_path: &Path) -> Result<(), CliError> {
    let mut state = State::load(state_path)?;
    let governance = Governance::new(&mut state.store, &mut state.node);

    let info = governance.get(proposal_id)?;
    let proposal = governance.load_proposal(proposal_id)?;
    print_json(&json!({
        "proposal_id": proposal_id,
        "proposal": proposal,
        "info": info,
    }))
}
