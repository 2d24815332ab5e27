//! Proposal validation.
//!
//! Every action is checked independently and every failure is reported;
//! validation never stops at the first bad action and never raises.

use crate::actions::ActionKind;
use crate::host::NodeHost;
use crate::proposal::Proposal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of validating a proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Failures joined by `", "`, empty when valid.
    pub description: String,
    #[serde(skip)]
    errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            description: errors.join(", "),
            errors,
        }
    }

    /// Single failure that is not tied to an action.
    pub fn invalid(description: impl Into<String>) -> Self {
        Self::from_errors(vec![description.into()])
    }

    /// Individual failures, in proposal order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Check every action of `proposal` against the registry.
pub fn validate<N>(proposal: &Proposal, node: &N) -> ValidationResult
where
    N: NodeHost + ?Sized,
{
    let mut errors = Vec::new();

    for (position, action) in proposal.actions.iter().enumerate() {
        let kind = match action.name.parse::<ActionKind>() {
            Ok(kind) => kind,
            Err(unknown) => {
                errors.push(unknown.to_string());
                continue;
            }
        };
        if let Err(e) = kind.validate(action.args.as_ref(), node) {
            debug!(action = %kind, position, error = %e, "action failed validation");
            errors.push(format!("{kind} at position {position} failed validation: {e}"));
        }
    }

    ValidationResult::from_errors(errors)
}
