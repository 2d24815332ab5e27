//! Vote resolution.
//!
//! Single-action proposals are first run through an ordered list of guarded
//! rules; the first rule that returns a verdict wins. Everything else, and
//! every proposal with more than one action, is decided by member majority.
//!
//! Resolution never fails: unreadable member data counts as "not an
//! operator" and an unreadable member table leaves the proposal Open.

use crate::actions::ActionKind;
use crate::host::{get_json, tables, KvStore, MemberInfo};
use crate::proposal::{Proposal, Vote};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// State of a proposal after counting votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Open,
    Accepted,
    Rejected,
}

impl Verdict {
    /// Accepted and Rejected are final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Verdict::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Open => "Open",
            Verdict::Accepted => "Accepted",
            Verdict::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs visible to every rule.
struct Ballots<'a, S: ?Sized> {
    proposer_id: &'a str,
    votes: &'a [Vote],
    store: &'a S,
}

impl<S: KvStore + ?Sized> Ballots<'_, S> {
    fn is_operator(&self, member_id: &str) -> bool {
        match get_json::<MemberInfo, _>(self.store, tables::MEMBERS_INFO, member_id) {
            Ok(info) => info.is_some_and(|i| i.is_operator()),
            Err(e) => {
                warn!(member_id, error = %e, "unreadable member info, treating as non-operator");
                false
            }
        }
    }

    /// Exactly `count` votes, all in direction `accept`.
    fn unanimous(&self, count: usize, accept: bool) -> bool {
        self.votes.len() == count && self.votes.iter().all(|v| v.vote == accept)
    }
}

type Rule<S> = fn(ActionKind, &Ballots<'_, S>) -> Option<Verdict>;

/// Fixed-outcome fixtures.
fn noop_rule<S: KvStore + ?Sized>(kind: ActionKind, _: &Ballots<'_, S>) -> Option<Verdict> {
    match kind {
        ActionKind::AlwaysAcceptNoop => Some(Verdict::Accepted),
        ActionKind::AlwaysRejectNoop => Some(Verdict::Rejected),
        _ => None,
    }
}

/// Fixtures decided by an exact vote count. They stay Open until the count
/// matches and never fall back to majority.
fn vote_count_rule<S: KvStore + ?Sized>(kind: ActionKind, ballots: &Ballots<'_, S>) -> Option<Verdict> {
    let (count, accept, verdict) = match kind {
        ActionKind::AlwaysAcceptWithOneVote => (1, true, Verdict::Accepted),
        ActionKind::AlwaysRejectWithOneVote => (1, false, Verdict::Rejected),
        ActionKind::AlwaysAcceptWithTwoVotes => (2, true, Verdict::Accepted),
        ActionKind::AlwaysRejectWithTwoVotes => (2, false, Verdict::Rejected),
        _ => return None,
    };
    if ballots.unanimous(count, accept) {
        Some(verdict)
    } else {
        Some(Verdict::Open)
    }
}

/// Any ballot from an operator accepts, whatever its direction.
fn voted_by_operator_rule<S: KvStore + ?Sized>(kind: ActionKind, ballots: &Ballots<'_, S>) -> Option<Verdict> {
    if kind != ActionKind::AlwaysAcceptIfVotedByOperator {
        return None;
    }
    ballots
        .votes
        .iter()
        .any(|v| ballots.is_operator(&v.member_id))
        .then_some(Verdict::Accepted)
}

/// Operators may remove users on their own.
fn proposed_by_operator_rule<S: KvStore + ?Sized>(kind: ActionKind, ballots: &Ballots<'_, S>) -> Option<Verdict> {
    if !matches!(
        kind,
        ActionKind::AlwaysAcceptIfProposedByOperator | ActionKind::RemoveUser
    ) {
        return None;
    }
    ballots
        .is_operator(ballots.proposer_id)
        .then_some(Verdict::Accepted)
}

fn single_action_rules<S: KvStore + ?Sized>() -> [Rule<S>; 4] {
    [
        noop_rule::<S>,
        vote_count_rule::<S>,
        voted_by_operator_rule::<S>,
        proposed_by_operator_rule::<S>,
    ]
}

/// Number of members whose status is Active, `None` if the table cannot be
/// read.
pub fn active_member_count<S: KvStore + ?Sized>(store: &S) -> Option<usize> {
    let mut count = 0;
    let result = store.for_each(tables::MEMBERS_INFO, &mut |member_id, bytes| {
        match serde_json::from_slice::<MemberInfo>(bytes) {
            Ok(info) if info.is_active() => count += 1,
            Ok(_) => {}
            Err(e) => warn!(member_id, error = %e, "unreadable member info, not counted"),
        }
    });
    match result {
        Ok(()) => Some(count),
        Err(e) => {
            warn!(error = %e, "failed to read members table");
            None
        }
    }
}

/// Accepted when accept votes outnumber half of the active members.
fn majority<S: KvStore + ?Sized>(ballots: &Ballots<'_, S>) -> Verdict {
    let Some(active) = active_member_count(ballots.store) else {
        return Verdict::Open;
    };
    let accepts = ballots.votes.iter().filter(|v| v.vote).count();
    if accepts > active / 2 {
        Verdict::Accepted
    } else {
        Verdict::Open
    }
}

/// Decide `proposal` given the votes cast so far.
pub fn resolve<S>(proposal: &Proposal, proposer_id: &str, votes: &[Vote], store: &S) -> Verdict
where
    S: KvStore + ?Sized,
{
    let ballots = Ballots {
        proposer_id,
        votes,
        store,
    };

    let single = proposal
        .single_action()
        .and_then(|action| action.name.parse::<ActionKind>().ok());
    if let Some(kind) = single {
        for rule in single_action_rules::<S>() {
            if let Some(verdict) = rule(kind, &ballots) {
                return verdict;
            }
        }
    }

    majority(&ballots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryStore;
    use crate::host::{put_json, MemberStatus};
    use crate::proposal::ProposedAction;
    use serde_json::{json, Value};

    fn single(name: &str) -> Proposal {
        Proposal::new(vec![ProposedAction::new(name, Value::Null)])
    }

    fn store_with_members(active: usize, operators: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for i in 0..active {
            let id = format!("m{i}");
            let is_operator = operators.contains(&id.as_str());
            put_json(&mut store, tables::MEMBERS_INFO, &id, &MemberInfo::active(is_operator)).unwrap();
        }
        store
    }

    fn accepts(n: usize) -> Vec<Vote> {
        (0..n).map(|i| Vote::accept(format!("m{i}"))).collect()
    }

    #[test]
    fn test_noop_fixtures_ignore_votes() {
        let store = store_with_members(3, &[]);
        assert_eq!(resolve(&single("always_accept_noop"), "m0", &[], &store), Verdict::Accepted);
        assert_eq!(
            resolve(&single("always_accept_noop"), "m0", &[Vote::reject("m1")], &store),
            Verdict::Accepted
        );
        assert_eq!(
            resolve(&single("always_reject_noop"), "m0", &accepts(3), &store),
            Verdict::Rejected
        );
    }

    #[test]
    fn test_one_vote_fixtures_need_exactly_one_vote() {
        let store = store_with_members(3, &[]);
        let accept = single("always_accept_with_one_vote");
        assert_eq!(resolve(&accept, "m0", &[], &store), Verdict::Open);
        assert_eq!(resolve(&accept, "m0", &accepts(1), &store), Verdict::Accepted);
        assert_eq!(resolve(&accept, "m0", &accepts(2), &store), Verdict::Open);
        assert_eq!(resolve(&accept, "m0", &[Vote::reject("m0")], &store), Verdict::Open);

        let reject = single("always_reject_with_one_vote");
        assert_eq!(resolve(&reject, "m0", &[Vote::reject("m0")], &store), Verdict::Rejected);
        assert_eq!(resolve(&reject, "m0", &accepts(1), &store), Verdict::Open);
    }

    #[test]
    fn test_two_vote_fixtures() {
        let store = store_with_members(3, &[]);
        let accept = single("always_accept_with_two_votes");
        assert_eq!(resolve(&accept, "m0", &accepts(1), &store), Verdict::Open);
        assert_eq!(resolve(&accept, "m0", &accepts(2), &store), Verdict::Accepted);
        assert_eq!(
            resolve(&accept, "m0", &[Vote::accept("m0"), Vote::reject("m1")], &store),
            Verdict::Open
        );

        let reject = single("always_reject_with_two_votes");
        assert_eq!(
            resolve(&reject, "m0", &[Vote::reject("m0"), Vote::reject("m1")], &store),
            Verdict::Rejected
        );
        assert_eq!(resolve(&reject, "m0", &[Vote::reject("m0")], &store), Verdict::Open);
    }

    #[test]
    fn test_voted_by_operator_any_direction() {
        let store = store_with_members(5, &["m3"]);
        let p = single("always_accept_if_voted_by_operator");
        assert_eq!(resolve(&p, "m0", &[Vote::accept("m0")], &store), Verdict::Open);
        assert_eq!(
            resolve(&p, "m0", &[Vote::accept("m0"), Vote::reject("m3")], &store),
            Verdict::Accepted
        );
    }

    #[test]
    fn test_voted_by_operator_falls_through_to_majority() {
        let store = store_with_members(3, &[]);
        let p = single("always_accept_if_voted_by_operator");
        assert_eq!(resolve(&p, "m0", &accepts(2), &store), Verdict::Accepted);
    }

    #[test]
    fn test_proposed_by_operator() {
        let store = store_with_members(5, &["m0"]);
        for name in ["always_accept_if_proposed_by_operator", "remove_user"] {
            assert_eq!(resolve(&single(name), "m0", &[], &store), Verdict::Accepted);
            assert_eq!(resolve(&single(name), "m1", &[], &store), Verdict::Open);
            assert_eq!(resolve(&single(name), "m1", &accepts(3), &store), Verdict::Accepted);
        }
    }

    #[test]
    fn test_unknown_proposer_is_not_operator() {
        let store = store_with_members(5, &[]);
        assert_eq!(resolve(&single("remove_user"), "stranger", &[], &store), Verdict::Open);
    }

    #[test]
    fn test_majority_of_five() {
        let store = store_with_members(5, &[]);
        let p = single("set_recovery_threshold");
        assert_eq!(resolve(&p, "m0", &accepts(2), &store), Verdict::Open);
        assert_eq!(resolve(&p, "m0", &accepts(3), &store), Verdict::Accepted);
    }

    #[test]
    fn test_majority_ignores_inactive_members() {
        let mut store = store_with_members(3, &[]);
        for id in ["r0", "r1", "r2"] {
            let info = MemberInfo {
                status: MemberStatus::Retired,
                member_data: json!({}),
            };
            put_json(&mut store, tables::MEMBERS_INFO, id, &info).unwrap();
        }
        assert_eq!(active_member_count(&store), Some(3));
        assert_eq!(
            resolve(&single("rekey_ledger"), "m0", &accepts(2), &store),
            Verdict::Accepted
        );
    }

    #[test]
    fn test_no_majority_reject() {
        let store = store_with_members(3, &[]);
        let votes: Vec<Vote> = (0..3).map(|i| Vote::reject(format!("m{i}"))).collect();
        assert_eq!(resolve(&single("rekey_ledger"), "m0", &votes, &store), Verdict::Open);
    }

    #[test]
    fn test_multi_action_proposals_skip_fixtures() {
        let store = store_with_members(5, &[]);
        let p = Proposal::new(vec![
            ProposedAction::new("always_accept_noop", Value::Null),
            ProposedAction::new("rekey_ledger", Value::Null),
        ]);
        assert_eq!(resolve(&p, "m0", &[], &store), Verdict::Open);
        assert_eq!(resolve(&p, "m0", &accepts(3), &store), Verdict::Accepted);

        let p = Proposal::new(vec![
            ProposedAction::new("always_reject_noop", Value::Null),
            ProposedAction::new("always_reject_noop", Value::Null),
        ]);
        assert_eq!(resolve(&p, "m0", &[], &store), Verdict::Open);
    }

    #[test]
    fn test_corrupt_member_info_is_not_operator() {
        let mut store = store_with_members(1, &[]);
        store.put(tables::MEMBERS_INFO, "bad", b"{".to_vec()).unwrap();
        assert_eq!(active_member_count(&store), Some(1));
        assert_eq!(resolve(&single("remove_user"), "bad", &[], &store), Verdict::Open);
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Accepted.to_string(), "Accepted");
        assert_eq!(serde_json::to_string(&Verdict::Open).unwrap(), "\"Open\"");
        assert!(!Verdict::Open.is_terminal());
        assert!(Verdict::Rejected.is_terminal());
    }
}
