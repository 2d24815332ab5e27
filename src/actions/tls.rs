//! CA certificate bundle actions.

use super::args::SetCaCertBundleArgs;
use super::ApplyError;
use crate::host::{put_json, tables, KvStore, NodeHost};
use crate::schema::{check_type, check_x509_cert_chain, SchemaError};
use serde_json::Value;

pub(super) fn validate_valid_pem<N>(args: Option<&Value>, node: &N) -> Result<(), SchemaError>
where
    N: NodeHost + ?Sized,
{
    check_x509_cert_chain(args.and_then(|a| a.get("pem")), "pem", node)
}

pub(super) fn validate_set_ca_cert_bundle<N>(args: Option<&Value>, node: &N) -> Result<(), SchemaError>
where
    N: NodeHost + ?Sized,
{
    check_type(args.and_then(|a| a.get("name")), "string", "name")?;
    check_x509_cert_chain(args.and_then(|a| a.get("cert_bundle")), "cert_bundle", node)
}

/// The arguments of `remove_ca_cert_bundle` are the bundle name itself.
pub(super) fn validate_remove_ca_cert_bundle(args: Option<&Value>) -> Result<(), SchemaError> {
    check_type(args, "string", "args")
}

pub(super) fn apply_set_ca_cert_bundle<S>(args: SetCaCertBundleArgs, store: &mut S) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
{
    put_json(store, tables::CA_CERT_BUNDLES, &args.name, &args.cert_bundle)?;
    Ok(())
}

pub(super) fn apply_remove_ca_cert_bundle<S>(name: String, store: &mut S) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
{
    store.remove(tables::CA_CERT_BUNDLES, &name)?;
    Ok(())
}
