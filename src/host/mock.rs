//! Mock node for testing.
//!
//! Records every node-level call so tests can assert on side effects, and
//! uses a trivial certificate rule: a PEM is valid when it carries the
//! certificate header and does not contain [`INVALID_CERT_MARKER`].

use super::{HostError, HostResult, NodeHost};
use crate::actions::args::{IssuerRecord, Jwks};
use sha2::{Digest, Sha256};

/// Substring that makes [`MockNode`] reject a certificate.
pub const INVALID_CERT_MARKER: &str = "INVALID";

/// A node operation observed by [`MockNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCall {
    SetJwtPublicSigningKeys {
        issuer: String,
        metadata: IssuerRecord,
        kids: Vec<String>,
    },
    RemoveJwtPublicSigningKeys {
        issuer: String,
    },
    RekeyLedger,
    TransitionServiceToOpen,
}

/// Recording [`NodeHost`].
#[derive(Debug, Clone, Default)]
pub struct MockNode {
    calls: Vec<NodeCall>,
    fail_rekey: bool,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `rekey_ledger` fail (for test setup).
    pub fn failing_rekey() -> Self {
        Self {
            fail_rekey: true,
            ..Self::default()
        }
    }

    /// Calls observed so far, oldest first.
    pub fn calls(&self) -> &[NodeCall] {
        &self.calls
    }
}

impl NodeHost for MockNode {
    fn is_valid_x509_chain(&self, pem: &str) -> bool {
        pem.contains("-----BEGIN CERTIFICATE-----") && !pem.contains(INVALID_CERT_MARKER)
    }

    fn pem_to_id(&self, cert_pem: &str) -> HostResult<String> {
        if !self.is_valid_x509_chain(cert_pem) {
            return Err(HostError::InvalidCertificate(
                "not a PEM certificate".to_string(),
            ));
        }
        Ok(hex::encode(Sha256::digest(cert_pem.trim().as_bytes())))
    }

    fn set_jwt_public_signing_keys(
        &mut self,
        issuer: &str,
        metadata: &IssuerRecord,
        jwks: &Jwks,
    ) -> HostResult<()> {
        self.calls.push(NodeCall::SetJwtPublicSigningKeys {
            issuer: issuer.to_string(),
            metadata: metadata.clone(),
            kids: jwks.keys.iter().map(|k| k.kid.clone()).collect(),
        });
        Ok(())
    }

    fn remove_jwt_public_signing_keys(&mut self, issuer: &str) -> HostResult<()> {
        self.calls.push(NodeCall::RemoveJwtPublicSigningKeys {
            issuer: issuer.to_string(),
        });
        Ok(())
    }

    fn rekey_ledger(&mut self) -> HostResult<()> {
        if self.fail_rekey {
            return Err(HostError::Rekey("mock failure".to_string()));
        }
        self.calls.push(NodeCall::RekeyLedger);
        Ok(())
    }

    fn transition_service_to_open(&mut self) -> HostResult<()> {
        self.calls.push(NodeCall::TransitionServiceToOpen);
        Ok(())
    }
}
