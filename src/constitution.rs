//! The three entry points a governance host calls.
//!
//! [`Constitution`] borrows the host's store and node for the duration of
//! one lifecycle event and takes proposals as raw JSON, the way they arrive
//! from members.

use crate::actions::ApplyError;
use crate::applier;
use crate::host::{KvStore, NodeHost};
use crate::proposal::{Proposal, Vote};
use crate::resolver::{self, Verdict};
use crate::validator::{self, ValidationResult};
use tracing::warn;

/// Governance rules bound to a store and a node.
pub struct Constitution<'a, S: ?Sized, N: ?Sized> {
    store: &'a mut S,
    node: &'a mut N,
}

impl<'a, S, N> Constitution<'a, S, N>
where
    S: KvStore + ?Sized,
    N: NodeHost + ?Sized,
{
    pub fn new(store: &'a mut S, node: &'a mut N) -> Self {
        Self { store, node }
    }

    /// Validate a submitted proposal. A body that does not parse is reported
    /// as invalid rather than raised.
    pub fn validate(&self, proposal_json: &str) -> ValidationResult {
        match Proposal::from_json(proposal_json) {
            Ok(proposal) => validator::validate(&proposal, &*self.node),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }

    /// Decide a proposal from the votes cast so far. A body that does not
    /// parse stays Open.
    pub fn resolve(&self, proposal_json: &str, proposer_id: &str, votes: &[Vote]) -> Verdict {
        match Proposal::from_json(proposal_json) {
            Ok(proposal) => resolver::resolve(&proposal, proposer_id, votes, &*self.store),
            Err(e) => {
                warn!(proposer_id, error = %e, "unparseable proposal left open");
                Verdict::Open
            }
        }
    }

    /// Apply an accepted proposal.
    pub fn apply(&mut self, proposal_json: &str) -> Result<(), ApplyError> {
        let proposal = Proposal::from_json(proposal_json)?;
        applier::apply(&proposal, &mut *self.store, &mut *self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryStore;
    use crate::host::mock::{MockNode, NodeCall};
    use crate::host::{put_json, tables, MemberInfo};

    #[test]
    fn test_validate_json() {
        let mut store = MemoryStore::new();
        let mut node = MockNode::new();
        let constitution = Constitution::new(&mut store, &mut node);

        let ok = constitution.validate(r#"{"actions": [{"name": "always_accept_noop"}]}"#);
        assert!(ok.valid);

        let bad = constitution.validate(r#"{"actions": [{"name": "nope", "args": {}}]}"#);
        assert!(!bad.valid);
        assert_eq!(bad.description, "nope: no such action");
    }

    #[test]
    fn test_validate_malformed_body() {
        let mut store = MemoryStore::new();
        let mut node = MockNode::new();
        let result = Constitution::new(&mut store, &mut node).validate("{");
        assert!(!result.valid);
        assert!(result.description.starts_with("malformed proposal"));
    }

    #[test]
    fn test_resolve_json() {
        let mut store = MemoryStore::new();
        put_json(&mut store, tables::MEMBERS_INFO, "m0", &MemberInfo::active(false)).unwrap();
        let mut node = MockNode::new();
        let constitution = Constitution::new(&mut store, &mut node);

        let proposal = r#"{"actions": [{"name": "rekey_ledger"}]}"#;
        assert_eq!(constitution.resolve(proposal, "m0", &[]), Verdict::Open);
        assert_eq!(constitution.resolve(proposal, "m0", &[Vote::accept("m0")]), Verdict::Accepted);
        assert_eq!(constitution.resolve("not json", "m0", &[Vote::accept("m0")]), Verdict::Open);
    }

    #[test]
    fn test_apply_json() {
        let mut store = MemoryStore::new();
        let mut node = MockNode::new();
        let mut constitution = Constitution::new(&mut store, &mut node);

        constitution
            .apply(r#"{"actions": [{"name": "transition_service_to_open"}]}"#)
            .unwrap();
        assert!(matches!(constitution.apply("[]"), Err(ApplyError::Proposal(_))));
        assert_eq!(node.calls(), &[NodeCall::TransitionServiceToOpen]);
    }
}
