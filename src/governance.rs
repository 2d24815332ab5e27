//! Proposal lifecycle.
//!
//! Proposals and their ballots live in the store next to everything else
//! the constitution governs:
//!
//! - [`tables::PROPOSALS`]: proposal id → proposal body as submitted
//! - [`tables::PROPOSALS_INFO`]: proposal id → [`ProposalInfo`]
//!
//! Every event that can change the outcome (submission, a ballot) resolves
//! the proposal again. An Accepted proposal is applied in the same step, so
//! apply runs exactly once; a failure during apply marks it Failed. Terminal
//! proposals are never resolved again.

use crate::actions::ApplyError;
use crate::applier;
use crate::host::{get_json, put_json, tables, KvStore, MemberInfo, NodeHost, StoreError};
use crate::proposal::{Proposal, ProposalError, Vote};
use crate::resolver::{self, Verdict};
use crate::validator;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Governance result type.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error(transparent)]
    Proposal(#[from] ProposalError),

    #[error("proposal failed to validate: {0}")]
    ProposalFailedToValidate(String),

    #[error("proposal {0} already exists")]
    ProposalIdCollision(String),

    #[error("proposal {0} does not exist")]
    ProposalNotFound(String),

    #[error("proposal {proposal_id} is {state}, not open")]
    ProposalNotOpen {
        proposal_id: String,
        state: ProposalState,
    },

    #[error("member {member_id} has already voted on proposal {proposal_id}")]
    AlreadyVoted {
        proposal_id: String,
        member_id: String,
    },

    #[error("member {0} is not an active member")]
    MemberNotActive(String),

    #[error("proposal {proposal_id} can only be withdrawn by its proposer")]
    NotProposer { proposal_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where a proposal is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Open,
    Accepted,
    Rejected,
    Withdrawn,
    /// Accepted, but apply raised.
    Failed,
}

impl ProposalState {
    pub fn is_open(self) -> bool {
        self == ProposalState::Open
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalState::Open => "Open",
            ProposalState::Accepted => "Accepted",
            ProposalState::Rejected => "Rejected",
            ProposalState::Withdrawn => "Withdrawn",
            ProposalState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Entry of [`tables::PROPOSALS_INFO`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalInfo {
    pub proposer_id: String,
    pub state: ProposalState,
    /// Ballots keyed by member id.
    #[serde(default)]
    pub ballots: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ProposalInfo {
    fn open(proposer_id: &str) -> Self {
        Self {
            proposer_id: proposer_id.to_string(),
            state: ProposalState::Open,
            ballots: BTreeMap::new(),
            failure_reason: None,
        }
    }

    /// Ballots in member id order.
    pub fn votes(&self) -> Vec<Vote> {
        self.ballots
            .iter()
            .map(|(member_id, &vote)| Vote {
                member_id: member_id.clone(),
                vote,
            })
            .collect()
    }
}

/// Short view of a proposal returned by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalSummary {
    pub proposal_id: String,
    pub proposer_id: String,
    pub state: ProposalState,
    pub ballot_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ProposalSummary {
    fn new(proposal_id: &str, info: &ProposalInfo) -> Self {
        Self {
            proposal_id: proposal_id.to_string(),
            proposer_id: info.proposer_id.clone(),
            state: info.state,
            ballot_count: info.ballots.len(),
            failure_reason: info.failure_reason.clone(),
        }
    }
}

/// Id of a proposal: hex SHA-256 over the proposer id followed by the body.
pub fn proposal_id(proposer_id: &str, proposal_json: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(proposer_id.as_bytes());
    hasher.update(proposal_json);
    hex::encode(hasher.finalize())
}

/// Lifecycle driver bound to a store and a node.
pub struct Governance<'a, S: ?Sized, N: ?Sized> {
    store: &'a mut S,
    node: &'a mut N,
}

impl<'a, S, N> Governance<'a, S, N>
where
    S: KvStore + ?Sized,
    N: NodeHost + ?Sized,
{
    pub fn new(store: &'a mut S, node: &'a mut N) -> Self {
        Self { store, node }
    }

    /// Submit a proposal on behalf of an active member.
    pub fn propose(&mut self, proposal_json: &str, proposer_id: &str) -> GovernanceResult<ProposalSummary> {
        self.require_active(proposer_id)?;

        let proposal = Proposal::from_json(proposal_json)?;
        let validation = validator::validate(&proposal, &*self.node);
        if !validation.valid {
            return Err(GovernanceError::ProposalFailedToValidate(validation.description));
        }

        let id = proposal_id(proposer_id, proposal_json.as_bytes());
        if self.store.has(tables::PROPOSALS, &id)? {
            return Err(GovernanceError::ProposalIdCollision(id));
        }

        self.store
            .put(tables::PROPOSALS, &id, proposal_json.as_bytes().to_vec())?;
        info!(proposal_id = %id, proposer_id, actions = proposal.actions.len(), "proposal submitted");

        let info = self.settle(&id, &proposal, ProposalInfo::open(proposer_id))?;
        Ok(ProposalSummary::new(&id, &info))
    }

    /// Record a member's ballot and resolve again.
    pub fn vote(&mut self, proposal_id: &str, member_id: &str, accept: bool) -> GovernanceResult<ProposalSummary> {
        self.require_active(member_id)?;

        let mut info = self.open_info(proposal_id)?;
        if info.ballots.contains_key(member_id) {
            return Err(GovernanceError::AlreadyVoted {
                proposal_id: proposal_id.to_string(),
                member_id: member_id.to_string(),
            });
        }
        info.ballots.insert(member_id.to_string(), accept);
        info!(proposal_id, member_id, accept, "ballot cast");

        let proposal = self.load_proposal(proposal_id)?;
        let info = self.settle(proposal_id, &proposal, info)?;
        Ok(ProposalSummary::new(proposal_id, &info))
    }

    /// Withdraw an open proposal. Only its proposer may do this.
    pub fn withdraw(&mut self, proposal_id: &str, member_id: &str) -> GovernanceResult<ProposalSummary> {
        let mut info = self.open_info(proposal_id)?;
        if info.proposer_id != member_id {
            return Err(GovernanceError::NotProposer {
                proposal_id: proposal_id.to_string(),
            });
        }

        info.state = ProposalState::Withdrawn;
        put_json(&mut *self.store, tables::PROPOSALS_INFO, proposal_id, &info)?;
        info!(proposal_id, "proposal withdrawn");
        Ok(ProposalSummary::new(proposal_id, &info))
    }

    /// Current info of a proposal.
    pub fn get(&self, proposal_id: &str) -> GovernanceResult<ProposalInfo> {
        get_json(&*self.store, tables::PROPOSALS_INFO, proposal_id)?
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))
    }

    /// Proposal body as submitted.
    pub fn load_proposal(&self, proposal_id: &str) -> GovernanceResult<Proposal> {
        let bytes = self
            .store
            .get(tables::PROPOSALS, proposal_id)?
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
        Ok(Proposal::from_slice(&bytes)?)
    }

    fn require_active(&self, member_id: &str) -> GovernanceResult<()> {
        let info: Option<MemberInfo> = get_json(&*self.store, tables::MEMBERS_INFO, member_id)?;
        match info {
            Some(info) if info.is_active() => Ok(()),
            _ => Err(GovernanceError::MemberNotActive(member_id.to_string())),
        }
    }

    fn open_info(&self, proposal_id: &str) -> GovernanceResult<ProposalInfo> {
        let info = self.get(proposal_id)?;
        if !info.state.is_open() {
            return Err(GovernanceError::ProposalNotOpen {
                proposal_id: proposal_id.to_string(),
                state: info.state,
            });
        }
        Ok(info)
    }

    /// Resolve, apply if accepted, and persist the outcome.
    fn settle(&mut self, proposal_id: &str, proposal: &Proposal, mut info: ProposalInfo) -> GovernanceResult<ProposalInfo> {
        let votes = info.votes();
        let verdict = resolver::resolve(proposal, &info.proposer_id, &votes, &*self.store);

        match verdict {
            Verdict::Open => {}
            Verdict::Rejected => info.state = ProposalState::Rejected,
            Verdict::Accepted => match applier::apply(proposal, &mut *self.store, &mut *self.node) {
                Ok(()) => info.state = ProposalState::Accepted,
                Err(e) => info = failed(proposal_id, info, &e),
            },
        }
        if !info.state.is_open() {
            info!(proposal_id, state = %info.state, "proposal resolved");
        }

        put_json(&mut *self.store, tables::PROPOSALS_INFO, proposal_id, &info)?;
        Ok(info)
    }
}

fn failed(proposal_id: &str, mut info: ProposalInfo, error: &ApplyError) -> ProposalInfo {
    warn!(proposal_id, error = %error, "accepted proposal failed to apply");
    info.state = ProposalState::Failed;
    info.failure_reason = Some(error.to_string());
    info
}
