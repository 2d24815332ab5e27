//! Self-contained node used by the operator CLI.
//!
//! Certificates are decoded from PEM with `rustls-pki-types`; identifiers
//! are the hex SHA-256 of the leaf certificate's DER. Installed signing keys,
//! the ledger generation and the service status live in this struct and are
//! persisted alongside the store.

use super::{HostError, HostResult, NodeHost};
use crate::actions::args::{IssuerRecord, Jwks};
use crate::schema::der_b64_to_pem;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::CertificateDer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// DER encoding of an X.509 certificate starts with a SEQUENCE tag.
const DER_SEQUENCE_TAG: u8 = 0x30;

/// Service lifecycle as seen by governance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    #[default]
    Opening,
    Open,
}

/// Signing keys installed for one issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledIssuer {
    pub metadata: IssuerRecord,
    /// kid -> base64 DER certificate chain
    pub keys: BTreeMap<String, Vec<String>>,
}

/// [`NodeHost`] backed by local state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareNode {
    #[serde(default)]
    pub signing_keys: BTreeMap<String, InstalledIssuer>,
    #[serde(default)]
    pub ledger_generation: u64,
    #[serde(default)]
    pub service_status: ServiceStatus,
}

impl SoftwareNode {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Decode every certificate in `pem`. Fails on malformed PEM, on payloads
/// that do not open with a DER SEQUENCE and when no certificate is present.
///
/// Structural check only: certificate contents, signatures and the chain
/// of trust are not verified.
pub fn decode_chain(pem: &str) -> HostResult<Vec<CertificateDer<'static>>> {
    let mut chain = Vec::new();
    for cert in CertificateDer::pem_slice_iter(pem.as_bytes()) {
        let cert = cert.map_err(|e| HostError::InvalidCertificate(format!("{e:?}")))?;
        if cert.first() != Some(&DER_SEQUENCE_TAG) {
            return Err(HostError::InvalidCertificate(
                "certificate is not DER encoded".to_string(),
            ));
        }
        chain.push(cert);
    }
    if chain.is_empty() {
        return Err(HostError::InvalidCertificate(
            "no certificate found in PEM".to_string(),
        ));
    }
    Ok(chain)
}

impl NodeHost for SoftwareNode {
    fn is_valid_x509_chain(&self, pem: &str) -> bool {
        decode_chain(pem).is_ok()
    }

    fn pem_to_id(&self, cert_pem: &str) -> HostResult<String> {
        let chain = decode_chain(cert_pem)?;
        Ok(hex::encode(Sha256::digest(chain[0].as_ref())))
    }

    fn set_jwt_public_signing_keys(
        &mut self,
        issuer: &str,
        metadata: &IssuerRecord,
        jwks: &Jwks,
    ) -> HostResult<()> {
        let mut keys = BTreeMap::new();
        for jwk in &jwks.keys {
            for b64der in &jwk.x5c {
                decode_chain(&der_b64_to_pem(b64der)).map_err(|e| HostError::SigningKeys {
                    issuer: issuer.to_string(),
                    reason: format!("key {}: {}", jwk.kid, e),
                })?;
            }
            keys.insert(jwk.kid.clone(), jwk.x5c.clone());
        }

        debug!(issuer, count = keys.len(), "installing signing keys");
        self.signing_keys.insert(
            issuer.to_string(),
            InstalledIssuer {
                metadata: metadata.clone(),
                keys,
            },
        );
        Ok(())
    }

    fn remove_jwt_public_signing_keys(&mut self, issuer: &str) -> HostResult<()> {
        self.signing_keys.remove(issuer);
        Ok(())
    }

    fn rekey_ledger(&mut self) -> HostResult<()> {
        self.ledger_generation = self
            .ledger_generation
            .checked_add(1)
            .ok_or_else(|| HostError::Rekey("ledger generation overflow".to_string()))?;
        info!(generation = self.ledger_generation, "ledger rekeyed");
        Ok(())
    }

    fn transition_service_to_open(&mut self) -> HostResult<()> {
        // Already open is fine: the transition is idempotent.
        self.service_status = ServiceStatus::Open;
        Ok(())
    }
}
