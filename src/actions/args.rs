//! Typed arguments of the actions that have persistent effects.
//!
//! Validation works on raw JSON so it can name the offending field; apply
//! decodes into these structs.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetMemberDataArgs {
    pub member_id: String,
    pub member_data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetUserArgs {
    pub cert: String,
    #[serde(default)]
    pub user_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveUserArgs {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCaCertBundleArgs {
    pub name: String,
    pub cert_bundle: String,
}

/// Which keys of an issuer's key set are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFilter {
    All,
    Sgx,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sgx_claims: Option<BTreeMap<String, String>>,
}

/// Typed view of the issuer fields apply acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtIssuerMetadata {
    pub key_filter: KeyFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_policy: Option<KeyPolicy>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub auto_refresh: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_bundle_name: Option<String>,
}

/// Issuer entry as persisted in the issuers table: the `set_jwt_issuer`
/// arguments as proposed, minus `jwks`.
pub type IssuerRecord = Map<String, Value>;

/// One entry of a JSON Web Key Set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kid: String,
    pub kty: String,
    /// Base64 DER certificates, leaf first.
    pub x5c: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JsonWebKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetJwtIssuerArgs {
    pub issuer: String,
    #[serde(flatten)]
    pub metadata: JwtIssuerMetadata,
    #[serde(default)]
    pub jwks: Option<Jwks>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetJwtPublicSigningKeysArgs {
    pub issuer: String,
    pub jwks: Jwks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveJwtIssuerArgs {
    pub issuer: String,
}
