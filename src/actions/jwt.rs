//! JWT issuer actions.
//!
//! The issuer record is stored keyed by the issuer string: the proposed
//! arguments as they were submitted, without the key set. Installing and
//! removing the keys themselves is the node's job.

use super::args::{IssuerRecord, RemoveJwtIssuerArgs, SetJwtIssuerArgs, SetJwtPublicSigningKeysArgs};
use super::ApplyError;
use crate::host::{get_json, put_json, tables, KvStore, NodeHost};
use crate::schema::{
    check_enum, check_jwks, check_type, is_truthy, parse_url, SchemaError,
};
use serde_json::Value;
use tracing::info;

const KEY_FILTERS: &[&str] = &["all", "sgx"];
const AUTO_REFRESH_SCHEME: &str = "https";

fn field<'a>(args: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    args.and_then(|a| a.get(name))
}

pub(super) fn validate_set_jwt_issuer<N>(args: Option<&Value>, node: &N) -> Result<(), SchemaError>
where
    N: NodeHost + ?Sized,
{
    let issuer = field(args, "issuer");
    check_type(issuer, "string", "issuer")?;
    check_type(field(args, "auto_refresh"), "boolean?", "auto_refresh")?;
    check_type(field(args, "ca_cert_bundle_name"), "string?", "ca_cert_bundle_name")?;
    check_enum(field(args, "key_filter"), KEY_FILTERS, "key_filter")?;

    let key_policy = field(args, "key_policy");
    check_type(key_policy, "object?", "key_policy")?;
    let sgx_claims = key_policy.and_then(|p| p.get("sgx_claims"));
    check_type(sgx_claims, "object?", "key_policy.sgx_claims")?;
    if let Some(claims) = sgx_claims.and_then(Value::as_object) {
        for (name, value) in claims {
            check_type(Some(value), "string", &format!("key_policy.sgx_claims[\"{name}\"]"))?;
        }
    }

    let jwks = field(args, "jwks");
    check_type(jwks, "object?", "jwks")?;
    if jwks.is_some_and(Value::is_object) {
        check_jwks(jwks, "jwks", node)?;
    }

    if is_truthy(field(args, "auto_refresh")) {
        validate_auto_refresh(issuer, field(args, "ca_cert_bundle_name"))?;
    }
    Ok(())
}

/// Auto-refresh fetches keys from the issuer, so the issuer must be a plain
/// https URL and a CA bundle must be named to verify the endpoint.
fn validate_auto_refresh(issuer: Option<&Value>, ca_cert_bundle_name: Option<&Value>) -> Result<(), SchemaError> {
    if !is_truthy(ca_cert_bundle_name) {
        return Err(SchemaError::Constraint(
            "ca_cert_bundle_name is missing but required if auto_refresh is true".to_string(),
        ));
    }

    let issuer = issuer.and_then(Value::as_str).unwrap_or_default();
    let url = parse_url(issuer).map_err(|_| {
        SchemaError::Constraint("issuer must be a URL if auto_refresh is true".to_string())
    })?;
    if url.scheme.as_deref() != Some(AUTO_REFRESH_SCHEME) {
        return Err(SchemaError::Constraint(
            "issuer must be a URL starting with https:// if auto_refresh is true".to_string(),
        ));
    }
    if url.has_query() || url.has_fragment() {
        return Err(SchemaError::Constraint(
            "issuer must be a URL without query/fragment if auto_refresh is true".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn validate_set_jwt_public_signing_keys<N>(args: Option<&Value>, node: &N) -> Result<(), SchemaError>
where
    N: NodeHost + ?Sized,
{
    check_type(field(args, "issuer"), "string", "issuer")?;
    check_jwks(field(args, "jwks"), "jwks", node)
}

pub(super) fn validate_remove_jwt_issuer(args: Option<&Value>) -> Result<(), SchemaError> {
    check_type(field(args, "issuer"), "string", "issuer")
}

/// `args` is the typed view of `raw`; the stored record is `raw` minus `jwks`.
pub(super) fn apply_set_jwt_issuer<S, N>(
    args: SetJwtIssuerArgs,
    raw: &Value,
    store: &mut S,
    node: &mut N,
) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
    N: NodeHost + ?Sized,
{
    let SetJwtIssuerArgs { issuer, metadata, jwks } = args;

    if metadata.auto_refresh {
        let bundle = metadata.ca_cert_bundle_name.clone().unwrap_or_default();
        if !store.has(tables::CA_CERT_BUNDLES, &bundle)? {
            return Err(ApplyError::CaCertBundleNotFound(bundle));
        }
    }

    let mut record: IssuerRecord = raw.as_object().cloned().unwrap_or_default();
    record.remove("jwks");

    if let Some(jwks) = &jwks {
        node.set_jwt_public_signing_keys(&issuer, &record, jwks)?;
    }
    put_json(store, tables::JWT_ISSUERS, &issuer, &record)?;

    info!(issuer = %issuer, auto_refresh = metadata.auto_refresh, "jwt issuer set");
    Ok(())
}

pub(super) fn apply_set_jwt_public_signing_keys<S, N>(
    args: SetJwtPublicSigningKeysArgs,
    store: &mut S,
    node: &mut N,
) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
    N: NodeHost + ?Sized,
{
    let record: IssuerRecord = get_json(store, tables::JWT_ISSUERS, &args.issuer)?
        .ok_or_else(|| ApplyError::IssuerNotFound(args.issuer.clone()))?;
    node.set_jwt_public_signing_keys(&args.issuer, &record, &args.jwks)?;
    Ok(())
}

pub(super) fn apply_remove_jwt_issuer<S, N>(args: RemoveJwtIssuerArgs, store: &mut S, node: &mut N) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
    N: NodeHost + ?Sized,
{
    if !store.remove(tables::JWT_ISSUERS, &args.issuer)? {
        return Ok(());
    }
    node.remove_jwt_public_signing_keys(&args.issuer)?;
    info!(issuer = %args.issuer, "jwt issuer removed");
    Ok(())
}
