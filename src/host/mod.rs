//! Capability interfaces for the host the engine runs inside.
//!
//! The engine owns no state of its own. Everything it reads or writes goes
//! through a [`KvStore`] handle, and every cryptographic or node-level
//! operation goes through a [`NodeHost`]. Both are passed explicitly into each
//! call so the core can be driven by [`memory::MemoryStore`] and
//! [`mock::MockNode`] in tests.

pub mod memory;
pub mod mock;
pub mod software;

use crate::actions::args::{IssuerRecord, Jwks};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Well-known table names.
pub mod tables {
    pub const MEMBERS_INFO: &str = "public:gov.members.info";
    pub const USERS_CERTS: &str = "public:gov.users.certs";
    pub const USERS_INFO: &str = "public:gov.users.info";
    pub const CA_CERT_BUNDLES: &str = "public:gov.tls.ca_cert_bundles";
    pub const JWT_ISSUERS: &str = "public:gov.jwt.issuers";
    pub const PROPOSALS: &str = "public:gov.proposals";
    pub const PROPOSALS_INFO: &str = "public:gov.proposals_info";
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stored bytes are not the JSON shape the caller expected.
    #[error("failed to decode {table}[{key}]: {source}")]
    Decode {
        table: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded as JSON.
    #[error("failed to encode value for {table}[{key}]: {source}")]
    Encode {
        table: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend failure.
    #[error("store error: {0}")]
    Backend(String),
}

/// Key-value store made of named tables with string keys and byte values.
///
/// Implementations run inside the host's transaction; the engine performs
/// no locking or retries of its own.
pub trait KvStore {
    /// Get the value stored under `key`.
    fn get(&self, table: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&mut self, table: &str, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Remove `key`. Returns whether it existed.
    fn remove(&mut self, table: &str, key: &str) -> StoreResult<bool>;

    /// Visit every entry of `table` in key order.
    fn for_each(&self, table: &str, visit: &mut dyn FnMut(&str, &[u8])) -> StoreResult<()>;

    /// Whether `key` exists in `table`.
    fn has(&self, table: &str, key: &str) -> StoreResult<bool> {
        Ok(self.get(table, key)?.is_some())
    }
}

/// Read and decode a JSON value.
pub fn get_json<T, S>(store: &S, table: &str, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    match store.get(table, key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                table: table.to_string(),
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and write a JSON value.
pub fn put_json<T, S>(store: &mut S, table: &str, key: &str, value: &T) -> StoreResult<()>
where
    T: Serialize + ?Sized,
    S: KvStore + ?Sized,
{
    let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Encode {
        table: table.to_string(),
        key: key.to_string(),
        source,
    })?;
    store.put(table, key, bytes)
}

/// Member status as kept in the members table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Accepted,
    Active,
    Retired,
    #[serde(other)]
    Unknown,
}

/// Entry of [`tables::MEMBERS_INFO`].
///
/// `member_data` is free-form; the only field the engine reads from it is
/// `is_operator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub status: MemberStatus,
    #[serde(default)]
    pub member_data: Value,
}

impl MemberInfo {
    /// Active member with the given operator flag.
    pub fn active(is_operator: bool) -> Self {
        Self {
            status: MemberStatus::Active,
            member_data: serde_json::json!({ "is_operator": is_operator }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn is_operator(&self) -> bool {
        self.member_data
            .get("is_operator")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Result type for node operations.
pub type HostResult<T> = Result<T, HostError>;

/// Node operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Signing keys could not be installed.
    #[error("failed to install signing keys for {issuer}: {reason}")]
    SigningKeys { issuer: String, reason: String },

    /// Ledger rekey failed.
    #[error("ledger rekey failed: {0}")]
    Rekey(String),

    /// Service could not be opened.
    #[error("failed to open service: {0}")]
    ServiceTransition(String),
}

/// Identity, crypto and node-control operations provided by the host.
pub trait NodeHost {
    /// Whether `pem` holds one or more valid X.509 certificates.
    fn is_valid_x509_chain(&self, pem: &str) -> bool;

    /// Stable identifier derived from a PEM certificate.
    fn pem_to_id(&self, cert_pem: &str) -> HostResult<String>;

    /// Install (replacing) the signing keys of `issuer`, governed by its
    /// stored issuer record.
    fn set_jwt_public_signing_keys(
        &mut self,
        issuer: &str,
        metadata: &IssuerRecord,
        jwks: &Jwks,
    ) -> HostResult<()>;

    /// Remove every signing key installed for `issuer`.
    fn remove_jwt_public_signing_keys(&mut self, issuer: &str) -> HostResult<()>;

    /// Rotate the ledger secret.
    fn rekey_ledger(&mut self) -> HostResult<()>;

    /// Open the service to users.
    fn transition_service_to_open(&mut self) -> HostResult<()>;
}
