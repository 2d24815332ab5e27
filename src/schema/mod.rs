//! Type and shape checks for action arguments.
//!
//! Every check takes the (possibly absent) JSON value and the label of the
//! field it came from, and either returns `Ok(())` or a [`SchemaError`]
//! naming the field. Absent values are modelled as `None` and reported as
//! `undefined`, matching the way proposals omit optional arguments.
//!
//! Certificate checks delegate to the host through [`NodeHost`], they never
//! parse X.509 themselves.

pub mod url;

use crate::host::NodeHost;
use serde_json::Value;
use std::fmt::Display;
use thiserror::Error;

pub use url::{parse_url, ParsedUrl, UrlError};

const PEM_CERT_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_CERT_FOOTER: &str = "-----END CERTIFICATE-----";

/// Malformed or out-of-range argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Value has the wrong JSON type.
    #[error("{field} must be of type {expected} but is {actual}")]
    Type {
        field: String,
        expected: String,
        actual: String,
    },

    /// Value is not one of the allowed literals.
    #[error("{field} must be one of {allowed}")]
    Enum { field: String, allowed: String },

    /// Value is below the lower bound.
    #[error("{field} must be greater than or equal to {bound}")]
    BelowMinimum { field: String, bound: String },

    /// Value is above the upper bound.
    #[error("{field} must be less than or equal to {bound}")]
    AboveMaximum { field: String, bound: String },

    /// Sequence has too few elements.
    #[error("{field} must be an array of minimum {min} elements")]
    TooShort { field: String, min: usize },

    /// Sequence has too many elements.
    #[error("{field} must be an array of maximum {max} elements")]
    TooLong { field: String, max: usize },

    /// A single base64 DER entry of a JWK is not a certificate.
    #[error("{field} is not an X509 certificate")]
    NotCertificate { field: String },

    /// PEM text is not a valid certificate chain.
    #[error("{field} must be a valid X509 certificate (chain) in PEM format")]
    InvalidCertChain { field: String },

    /// Cross-field constraint violated.
    #[error("{0}")]
    Constraint(String),

    /// Several sibling checks failed.
    #[error("{}", join_errors(.0))]
    Multiple(Vec<SchemaError>),
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl SchemaError {
    /// Collapse a list of failures into one error, `Ok` if the list is empty.
    pub fn collect(mut errors: Vec<SchemaError>) -> Result<(), SchemaError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(SchemaError::Multiple(errors)),
        }
    }
}

/// Name of the JSON type of `value`, `undefined` when absent.
pub fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// True for absent or `null`.
pub fn is_nullish(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// True for values a proposal author would consider "set": not absent,
/// not null, not `false`, not zero and not the empty string.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Check that `value` has the JSON type `kind`.
///
/// A trailing `?` on `kind` accepts absent or `null`. `array`, `integer` and
/// `object` have dedicated rules; any other kind is compared against
/// [`type_name`].
pub fn check_type(value: Option<&Value>, kind: &str, field: &str) -> Result<(), SchemaError> {
    let (kind, optional) = match kind.strip_suffix('?') {
        Some(base) => (base, true),
        None => (kind, false),
    };
    if optional && is_nullish(value) {
        return Ok(());
    }

    let matches = match (kind, value) {
        ("array", Some(v)) => v.is_array(),
        ("integer", Some(v)) => is_integer(v),
        ("object", Some(v)) => v.is_object(),
        (other, v) => type_name(v) == other,
    };

    if matches {
        Ok(())
    } else {
        Err(SchemaError::Type {
            field: field.to_string(),
            expected: kind.to_string(),
            actual: type_name(value).to_string(),
        })
    }
}

/// Check that `value` is a string equal to one of `members`.
pub fn check_enum(value: Option<&Value>, members: &[&str], field: &str) -> Result<(), SchemaError> {
    let found = value
        .and_then(Value::as_str)
        .is_some_and(|s| members.contains(&s));
    if found {
        Ok(())
    } else {
        Err(SchemaError::Enum {
            field: field.to_string(),
            allowed: members.join(", "),
        })
    }
}

/// Check `low <= value <= high`, `None` meaning unbounded on that side.
pub fn check_bounds<T>(value: T, low: Option<T>, high: Option<T>, field: &str) -> Result<(), SchemaError>
where
    T: PartialOrd + Display,
{
    if let Some(low) = low {
        if value < low {
            return Err(SchemaError::BelowMinimum {
                field: field.to_string(),
                bound: low.to_string(),
            });
        }
    }
    if let Some(high) = high {
        if value > high {
            return Err(SchemaError::AboveMaximum {
                field: field.to_string(),
                bound: high.to_string(),
            });
        }
    }
    Ok(())
}

/// Check `min <= items.len() <= max`, `None` meaning unbounded on that side.
pub fn check_length<T>(
    items: &[T],
    min: Option<usize>,
    max: Option<usize>,
    field: &str,
) -> Result<(), SchemaError> {
    if let Some(min) = min {
        if items.len() < min {
            return Err(SchemaError::TooShort {
                field: field.to_string(),
                min,
            });
        }
    }
    if let Some(max) = max {
        if items.len() > max {
            return Err(SchemaError::TooLong {
                field: field.to_string(),
                max,
            });
        }
    }
    Ok(())
}

/// Wrap a base64 DER certificate in PEM armor.
pub fn der_b64_to_pem(b64der: &str) -> String {
    format!("{PEM_CERT_HEADER}\n{b64der}\n{PEM_CERT_FOOTER}")
}

/// Check a JSON Web Key Set whose keys carry `x5c` certificate chains.
///
/// Every key and every `x5c` entry is checked; all failures are reported
/// together.
pub fn check_jwks<N: NodeHost + ?Sized>(
    value: Option<&Value>,
    field: &str,
    node: &N,
) -> Result<(), SchemaError> {
    check_type(value, "object", field)?;
    let keys_field = format!("{field}.keys");
    let keys = value.and_then(|v| v.get("keys"));
    check_type(keys, "array", &keys_field)?;
    let keys = keys.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

    let mut errors = Vec::new();
    for (i, jwk) in keys.iter().enumerate() {
        let key_field = format!("{keys_field}[{i}]");
        if let Err(e) = check_type(jwk.get("kid"), "string", &format!("{key_field}.kid")) {
            errors.push(e);
        }
        if let Err(e) = check_type(jwk.get("kty"), "string", &format!("{key_field}.kty")) {
            errors.push(e);
        }

        let x5c_field = format!("{key_field}.x5c");
        let x5c = match jwk.get("x5c") {
            Some(Value::Array(entries)) => entries,
            other => {
                if let Err(e) = check_type(other, "array", &x5c_field) {
                    errors.push(e);
                }
                continue;
            }
        };
        if let Err(e) = check_length(x5c, Some(1), None, &x5c_field) {
            errors.push(e);
        }
        for (j, entry) in x5c.iter().enumerate() {
            let entry_field = format!("{x5c_field}[{j}]");
            let b64der = match entry.as_str() {
                Some(s) => s,
                None => {
                    if let Err(e) = check_type(Some(entry), "string", &entry_field) {
                        errors.push(e);
                    }
                    continue;
                }
            };
            if !node.is_valid_x509_chain(&der_b64_to_pem(b64der)) {
                errors.push(SchemaError::NotCertificate { field: entry_field });
            }
        }
    }

    SchemaError::collect(errors)
}

/// Check that `value` is a PEM string holding a valid X.509 chain.
pub fn check_x509_cert_chain<N: NodeHost + ?Sized>(
    value: Option<&Value>,
    field: &str,
    node: &N,
) -> Result<(), SchemaError> {
    match value.and_then(Value::as_str) {
        Some(pem) if node.is_valid_x509_chain(pem) => Ok(()),
        _ => Err(SchemaError::InvalidCertChain {
            field: field.to_string(),
        }),
    }
}
