//! Charter - Consortium Governance Constitution
//!
//! Decides what members of a consortium may change about a shared service
//! and how much agreement each change needs.
//!
//! A proposal is an ordered list of named actions. Its lifecycle has three
//! steps, each a pure function over state handed in by the host:
//! - [`validator::validate`] checks every action's arguments on submission
//! - [`resolver::resolve`] turns the current ballots into Open, Accepted or
//!   Rejected
//! - [`applier::apply`] commits the effects of an accepted proposal
//!
//! The host's key-value store and node operations are reached only through
//! the [`host::KvStore`] and [`host::NodeHost`] traits. [`constitution`]
//! bundles the three steps behind JSON entry points and [`governance`] keeps
//! proposals and ballots in the store.

pub mod actions;
pub mod applier;
pub mod constitution;
pub mod governance;
pub mod host;
pub mod proposal;
pub mod resolver;
pub mod schema;
pub mod validator;

pub use constitution::Constitution;
pub use governance::{Governance, ProposalState};
pub use proposal::{Proposal, ProposedAction, Vote};
pub use resolver::Verdict;
pub use validator::ValidationResult;
