//! Execution of accepted proposals.
//!
//! Actions run in proposal order. The first failure stops execution; effects
//! of earlier actions stay written, since rollback belongs to the host's
//! transaction.

use crate::actions::{ActionKind, ApplyError};
use crate::host::{KvStore, NodeHost};
use crate::proposal::Proposal;
use tracing::{debug, warn};

/// Apply every action of an accepted `proposal`.
pub fn apply<S, N>(proposal: &Proposal, store: &mut S, node: &mut N) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
    N: NodeHost + ?Sized,
{
    for (position, action) in proposal.actions.iter().enumerate() {
        let kind: ActionKind = action.name.parse()?;
        debug!(action = %kind, position, "applying action");
        kind.apply(action.args_or_null(), store, node).map_err(|e| {
            warn!(action = %kind, position, error = %e, "action failed to apply");
            e
        })?;
    }
    Ok(())
}
