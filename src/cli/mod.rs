//! Operator CLI: argument parsing, error type and command dispatch.

use charter::actions::ApplyError;
use charter::governance::GovernanceError;
use charter::host::StoreError;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub mod config;
pub mod evaluate;
pub mod init;
pub mod lifecycle;
pub mod members;
pub mod state;
pub mod version;

use config::CharterConfig;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to parse config file '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config file '{}' already exists (use --force to overwrite)", .0.display())]
    ConfigExists(PathBuf),

    #[error("invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode output: {0}")]
    Output(#[source] serde_json::Error),

    #[error("proposal is invalid: {0}")]
    InvalidProposal(String),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Parser)]
#[command(name = "charter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the charter governance constitution", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/charter/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to state file (overrides [state] path from the config)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a proposal without submitting it
    Validate {
        /// Proposal JSON file
        #[arg(long)]
        proposal: PathBuf,
    },

    /// Compute the verdict of a proposal for a set of votes
    Resolve {
        /// Proposal JSON file
        #[arg(long)]
        proposal: PathBuf,

        /// Member id of the proposer
        #[arg(long)]
        proposer: String,

        /// JSON file with a list of {"member_id", "vote"} ballots
        #[arg(long)]
        votes: Option<PathBuf>,
    },

    /// Apply a proposal to the state file
    Apply {
        /// Proposal JSON file
        #[arg(long)]
        proposal: PathBuf,
    },

    /// Submit a proposal on behalf of a member
    Propose {
        /// Proposal JSON file
        #[arg(long)]
        proposal: PathBuf,

        /// Member id of the proposer
        #[arg(long)]
        proposer: String,
    },

    /// Cast a ballot on an open proposal
    Vote {
        #[arg(long)]
        proposal_id: String,

        /// Member id of the voter
        #[arg(long)]
        member: String,

        /// Vote to accept
        #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
        accept: bool,

        /// Vote to reject
        #[arg(long)]
        reject: bool,
    },

    /// Withdraw an open proposal (proposer only)
    Withdraw {
        #[arg(long)]
        proposal_id: String,

        /// Member id of the proposer
        #[arg(long)]
        member: String,
    },

    /// Show a proposal and its ballots
    Show {
        #[arg(long)]
        proposal_id: String,
    },

    /// Add or update a member in the state file
    AddMember {
        #[arg(long)]
        member_id: String,

        /// Mark the member as an operator
        #[arg(long)]
        operator: bool,

        #[arg(long, value_enum, default_value = "active")]
        status: members::StatusArg,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub fn execute(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    match &cli.command {
        Commands::Init { force } => return init::execute(&config_path, *force),
        Commands::Version => {
            version::execute();
            return Ok(());
        }
        _ => {}
    }

    let config = CharterConfig::load_or_default(&config_path)?;
    init_logging(&config.logging.level);
    let state_path = cli.state.unwrap_or(config.state.path);

    match cli.command {
        Commands::Validate { proposal } => evaluate::validate(&proposal),
        Commands::Resolve {
            proposal,
            proposer,
            votes,
        } => evaluate::resolve(&proposal, &proposer, votes.as_deref(), &state_path),
        Commands::Apply { proposal } => evaluate::apply(&proposal, &state_path),
        Commands::Propose { proposal, proposer } => lifecycle::propose(&proposal, &proposer, &state_path),
        Commands::Vote {
            proposal_id,
            member,
            accept,
            ..
        } => lifecycle::vote(&proposal_id, &member, accept, &state_path),
        Commands::Withdraw {
            proposal_id,
            member,
        } => lifecycle::withdraw(&proposal_id, &member, &state_path),
        Commands::Show { proposal_id } => lifecycle::show(&proposal_id, &state_path),
        Commands::AddMember {
            member_id,
            operator,
            status,
        } => members::add_member(&member_id, operator, status, &state_path),
        Commands::Init { .. } | Commands::Version => Ok(()),
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Read a UTF-8 input file.
pub(crate) fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(CliError::Output)?;
    println!("{text}");
    Ok(())
}
