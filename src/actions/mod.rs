//! Action registry.
//!
//! The catalogue of actions a proposal may contain is closed: every action is
//! a variant of [`ActionKind`], and each variant knows how to validate its
//! JSON arguments and how to apply them. Adding an action means adding a
//! variant, and the compiler points at every dispatch that must handle it.
//!
//! Validators never touch the store. Appliers assume their validator already
//! accepted the arguments; they only decode them.

pub mod args;
mod jwt;
mod members;
mod tls;

use crate::host::{HostError, KvStore, NodeHost, StoreError};
use crate::proposal::ProposalError;
use crate::schema::SchemaError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Action name is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}: no such action")]
pub struct UnknownAction(pub String);

/// Failure while applying an accepted action.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Arguments do not decode into the action's argument type.
    #[error("{action}: malformed arguments: {source}")]
    MalformedArgs {
        action: ActionKind,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    UnknownAction(#[from] UnknownAction),

    /// Proposal body could not be parsed.
    #[error(transparent)]
    Proposal(#[from] ProposalError),

    #[error("Member {0} does not exist")]
    MemberNotFound(String),

    /// Should not happen: user info without a registered certificate.
    #[error("User info for {0} already exists")]
    UserInfoExists(String),

    #[error("No CA cert bundle found with name '{0}'")]
    CaCertBundleNotFound(String),

    #[error("issuer {0} not found")]
    IssuerNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Every action the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    SetMemberData,
    RekeyLedger,
    TransitionServiceToOpen,
    SetUser,
    SetRecoveryThreshold,
    AlwaysAcceptNoop,
    AlwaysRejectNoop,
    AlwaysAcceptWithOneVote,
    AlwaysRejectWithOneVote,
    AlwaysAcceptIfVotedByOperator,
    AlwaysAcceptIfProposedByOperator,
    AlwaysAcceptWithTwoVotes,
    AlwaysRejectWithTwoVotes,
    RemoveUser,
    ValidPem,
    SetCaCertBundle,
    RemoveCaCertBundle,
    SetJwtIssuer,
    SetJwtPublicSigningKeys,
    RemoveJwtIssuer,
}

impl ActionKind {
    pub const ALL: [ActionKind; 20] = [
        ActionKind::SetMemberData,
        ActionKind::RekeyLedger,
        ActionKind::TransitionServiceToOpen,
        ActionKind::SetUser,
        ActionKind::SetRecoveryThreshold,
        ActionKind::AlwaysAcceptNoop,
        ActionKind::AlwaysRejectNoop,
        ActionKind::AlwaysAcceptWithOneVote,
        ActionKind::AlwaysRejectWithOneVote,
        ActionKind::AlwaysAcceptIfVotedByOperator,
        ActionKind::AlwaysAcceptIfProposedByOperator,
        ActionKind::AlwaysAcceptWithTwoVotes,
        ActionKind::AlwaysRejectWithTwoVotes,
        ActionKind::RemoveUser,
        ActionKind::ValidPem,
        ActionKind::SetCaCertBundle,
        ActionKind::RemoveCaCertBundle,
        ActionKind::SetJwtIssuer,
        ActionKind::SetJwtPublicSigningKeys,
        ActionKind::RemoveJwtIssuer,
    ];

    /// Name used in proposals.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetMemberData => "set_member_data",
            Self::RekeyLedger => "rekey_ledger",
            Self::TransitionServiceToOpen => "transition_service_to_open",
            Self::SetUser => "set_user",
            Self::SetRecoveryThreshold => "set_recovery_threshold",
            Self::AlwaysAcceptNoop => "always_accept_noop",
            Self::AlwaysRejectNoop => "always_reject_noop",
            Self::AlwaysAcceptWithOneVote => "always_accept_with_one_vote",
            Self::AlwaysRejectWithOneVote => "always_reject_with_one_vote",
            Self::AlwaysAcceptIfVotedByOperator => "always_accept_if_voted_by_operator",
            Self::AlwaysAcceptIfProposedByOperator => "always_accept_if_proposed_by_operator",
            Self::AlwaysAcceptWithTwoVotes => "always_accept_with_two_votes",
            Self::AlwaysRejectWithTwoVotes => "always_reject_with_two_votes",
            Self::RemoveUser => "remove_user",
            Self::ValidPem => "valid_pem",
            Self::SetCaCertBundle => "set_ca_cert_bundle",
            Self::RemoveCaCertBundle => "remove_ca_cert_bundle",
            Self::SetJwtIssuer => "set_jwt_issuer",
            Self::SetJwtPublicSigningKeys => "set_jwt_public_signing_keys",
            Self::RemoveJwtIssuer => "remove_jwt_issuer",
        }
    }

    /// Check `args` without side effects. `None` means the proposal carried
    /// no `args` for this action.
    pub fn validate<N>(self, args: Option<&Value>, node: &N) -> Result<(), SchemaError>
    where
        N: NodeHost + ?Sized,
    {
        match self {
            Self::SetMemberData => members::validate_set_member_data(args),
            Self::SetRecoveryThreshold => members::validate_set_recovery_threshold(args),
            Self::RemoveUser => members::validate_remove_user(args),
            Self::ValidPem => tls::validate_valid_pem(args, node),
            Self::SetCaCertBundle => tls::validate_set_ca_cert_bundle(args, node),
            Self::RemoveCaCertBundle => tls::validate_remove_ca_cert_bundle(args),
            Self::SetJwtIssuer => jwt::validate_set_jwt_issuer(args, node),
            Self::SetJwtPublicSigningKeys => jwt::validate_set_jwt_public_signing_keys(args, node),
            Self::RemoveJwtIssuer => jwt::validate_remove_jwt_issuer(args),
            Self::SetUser => Ok(()),
            Self::RekeyLedger
            | Self::TransitionServiceToOpen
            | Self::AlwaysAcceptNoop
            | Self::AlwaysRejectNoop
            | Self::AlwaysAcceptWithOneVote
            | Self::AlwaysRejectWithOneVote
            | Self::AlwaysAcceptIfVotedByOperator
            | Self::AlwaysAcceptIfProposedByOperator
            | Self::AlwaysAcceptWithTwoVotes
            | Self::AlwaysRejectWithTwoVotes => Ok(()),
        }
    }

    /// Commit the effects of this action.
    pub fn apply<S, N>(self, args: &Value, store: &mut S, node: &mut N) -> Result<(), ApplyError>
    where
        S: KvStore + ?Sized,
        N: NodeHost + ?Sized,
    {
        match self {
            Self::SetMemberData => members::apply_set_member_data(decode(self, args)?, store),
            Self::RekeyLedger => Ok(node.rekey_ledger()?),
            Self::TransitionServiceToOpen => Ok(node.transition_service_to_open()?),
            Self::SetUser => members::apply_set_user(decode(self, args)?, store, &*node),
            Self::RemoveUser => members::apply_remove_user(decode(self, args)?, store),
            Self::SetCaCertBundle => tls::apply_set_ca_cert_bundle(decode(self, args)?, store),
            Self::RemoveCaCertBundle => tls::apply_remove_ca_cert_bundle(decode(self, args)?, store),
            Self::SetJwtIssuer => jwt::apply_set_jwt_issuer(decode(self, args)?, args, store, node),
            Self::SetJwtPublicSigningKeys => {
                jwt::apply_set_jwt_public_signing_keys(decode(self, args)?, store, node)
            }
            Self::RemoveJwtIssuer => jwt::apply_remove_jwt_issuer(decode(self, args)?, store, node),
            Self::SetRecoveryThreshold
            | Self::ValidPem
            | Self::AlwaysAcceptNoop
            | Self::AlwaysRejectNoop
            | Self::AlwaysAcceptWithOneVote
            | Self::AlwaysRejectWithOneVote
            | Self::AlwaysAcceptIfVotedByOperator
            | Self::AlwaysAcceptIfProposedByOperator
            | Self::AlwaysAcceptWithTwoVotes
            | Self::AlwaysRejectWithTwoVotes => Ok(()),
        }
    }
}

fn decode<T: DeserializeOwned>(action: ActionKind, args: &Value) -> Result<T, ApplyError> {
    T::deserialize(args).map_err(|source| ApplyError::MalformedArgs { action, source })
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| UnknownAction(name.to_string()))
    }
}
