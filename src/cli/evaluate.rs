//! The three constitution entry points, one shot each.

use super::state::State;
use super::{print_json, read_text, CliError};
use charter::proposal::Vote;
use charter::Constitution;
use std::path::Path;
use tracing::info;

/// Validate a proposal file. Fails when the proposal is invalid so the exit
/// status reflects the result.
pub fn validate(proposal: &Path) -> Result<(), CliError> {
    let json = read_text(proposal)?;

    // validation never reads stored state
    let mut state = State::default();
    let result = Constitution::new(&mut state.store, &mut state.node).validate(&json);
    print_json(&result)?;

    if result.valid {
        Ok(())
    } else {
        Err(CliError::InvalidProposal(result.description))
    }
}

/// Print the verdict for `proposal` given the ballots in `votes`.
pub fn resolve(proposal: &Path, proposer: &str, votes: Option<&Path>, state_path: &Path) -> Result<(), CliError> {
    let json = read_text(proposal)?;
    let votes = match votes {
        Some(path) => read_votes(path)?,
        None => Vec::new(),
    };

    let mut state = State::load(state_path)?;
    let verdict = Constitution::new(&mut state.store, &mut state.node).resolve(&json, proposer, &votes);
    println!("{verdict}");
    Ok(())
}

/// Apply a proposal to the state file. Nothing is saved if any action fails.
pub fn apply(proposal: &Path, state_path: &Path) -> Result<(), CliError> {
    let json = read_text(proposal)?;
    let mut state = State::load(state_path)?;

    Constitution::new(&mut state.store, &mut state.node).apply(&json)?;
    state.save(state_path)?;

    info!(proposal = %proposal.display(), "proposal applied");
    println!("Applied");
    Ok(())
}

fn read_votes(path: &Path) -> Result<Vec<Vote>, CliError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}
