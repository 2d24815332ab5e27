//! Proposals and votes as they arrive from members.
//!
//! A proposal is `{"actions": [{"name": ..., "args": ...}, ...]}`. Names are
//! kept as strings here: unknown names are a validation error reported per
//! action, not a parse error for the whole proposal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProposalError {
    /// Body is not a `{"actions": [...]}` document.
    #[error("malformed proposal: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One entry of a proposal's action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub name: String,
    /// `None` when the entry has no `args` key at all.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it stays distinct
/// from a missing key.
fn present<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl ProposedAction {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args: Some(args),
        }
    }

    /// Arguments for apply; a missing `args` key reads as `null`.
    pub fn args_or_null(&self) -> &Value {
        self.args.as_ref().unwrap_or(&Value::Null)
    }
}

/// Ordered list of actions submitted together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub actions: Vec<ProposedAction>,
}

impl Proposal {
    pub fn new(actions: Vec<ProposedAction>) -> Self {
        Self { actions }
    }

    pub fn from_json(input: &str) -> Result<Self, ProposalError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_slice(input: &[u8]) -> Result<Self, ProposalError> {
        Ok(serde_json::from_slice(input)?)
    }

    pub fn to_json(&self) -> String {
        // Value-only structure: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// The action, if the proposal has exactly one.
    pub fn single_action(&self) -> Option<&ProposedAction> {
        match self.actions.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// A member's ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub member_id: String,
    pub vote: bool,
}

impl Vote {
    pub fn accept(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            vote: true,
        }
    }

    pub fn reject(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            vote: false,
        }
    }
}
