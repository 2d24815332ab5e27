//! Member and user management actions.

use super::args::{RemoveUserArgs, SetMemberDataArgs, SetUserArgs};
use super::ApplyError;
use crate::host::{get_json, put_json, tables, KvStore, NodeHost};
use crate::schema::{check_bounds, check_type, SchemaError};
use serde_json::{Map, Value};
use tracing::info;

/// Recovery threshold bounds (inclusive).
pub const MIN_RECOVERY_THRESHOLD: i64 = 1;
pub const MAX_RECOVERY_THRESHOLD: i64 = 254;

fn field<'a>(args: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    args.and_then(|a| a.get(name))
}

pub(super) fn validate_set_member_data(args: Option<&Value>) -> Result<(), SchemaError> {
    check_type(field(args, "member_id"), "string", "member_id")?;
    check_type(field(args, "member_data"), "object", "member_data")
}

pub(super) fn validate_set_recovery_threshold(args: Option<&Value>) -> Result<(), SchemaError> {
    let threshold = field(args, "threshold");
    check_type(threshold, "integer", "threshold")?;
    // check_type accepted a whole number; floats like 5.0 land here too
    let value = threshold.and_then(Value::as_f64).unwrap_or_default();
    check_bounds(
        value,
        Some(MIN_RECOVERY_THRESHOLD as f64),
        Some(MAX_RECOVERY_THRESHOLD as f64),
        "threshold",
    )
}

pub(super) fn validate_remove_user(args: Option<&Value>) -> Result<(), SchemaError> {
    check_type(field(args, "user_id"), "string", "user_id")
}

pub(super) fn apply_set_member_data<S>(args: SetMemberDataArgs, store: &mut S) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
{
    // only member_data is replaced; the rest of the record is written back as found
    let mut record: Map<String, Value> = get_json(store, tables::MEMBERS_INFO, &args.member_id)?
        .ok_or_else(|| ApplyError::MemberNotFound(args.member_id.clone()))?;
    record.insert("member_data".to_string(), Value::Object(args.member_data));
    put_json(store, tables::MEMBERS_INFO, &args.member_id, &record)?;
    Ok(())
}

/// Register a user certificate. Idempotent: a certificate that is already
/// registered leaves the store untouched.
pub(super) fn apply_set_user<S, N>(args: SetUserArgs, store: &mut S, node: &N) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
    N: NodeHost + ?Sized,
{
    let user_id = node.pem_to_id(&args.cert)?;

    if store.has(tables::USERS_CERTS, &user_id)? {
        info!(user_id = %user_id, "user cert already exists");
        return Ok(());
    }

    store.put(tables::USERS_CERTS, &user_id, args.cert.into_bytes())?;

    if let Some(user_data) = args.user_data {
        if store.has(tables::USERS_INFO, &user_id)? {
            return Err(ApplyError::UserInfoExists(user_id));
        }
        put_json(store, tables::USERS_INFO, &user_id, &user_data)?;
    }

    info!(user_id = %user_id, "user added");
    Ok(())
}

pub(super) fn apply_remove_user<S>(args: RemoveUserArgs, store: &mut S) -> Result<(), ApplyError>
where
    S: KvStore + ?Sized,
{
    store.remove(tables::USERS_CERTS, &args.user_id)?;
    store.remove(tables::USERS_INFO, &args.user_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::host::memory::MemoryStore;
    use crate::host::MemberInfo;
    use crate::host::mock::MockNode;
    use serde_json::json;

    const CERT: &str = "-----BEGIN CERTIFICATE-----\nMIIBuser\n-----END CERTIFICATE-----";

    #[test]
    fn test_set_member_data_validation() {
        assert!(validate_set_member_data(Some(&json!({"member_id": "m0", "member_data": {}}))).is_ok());

        let err = validate_set_member_data(Some(&json!({"member_id": 1, "member_data": {}}))).unwrap_err();
        assert_eq!(err.to_string(), "member_id must be of type string but is number");

        let err = validate_set_member_data(None).unwrap_err();
        assert_eq!(err.to_string(), "member_id must be of type string but is undefined");
    }

    #[test]
    fn test_set_member_data_replaces_member_data() {
        let mut store = MemoryStore::new();
        put_json(&mut store, tables::MEMBERS_INFO, "m0", &MemberInfo::active(false)).unwrap();

        let args = SetMemberDataArgs {
            member_id: "m0".to_string(),
            member_data: json!({"is_operator": true, "team": "ops"})
                .as_object()
                .cloned()
                .unwrap(),
        };
        apply_set_member_data(args, &mut store).unwrap();

        let info: MemberInfo = get_json(&store, tables::MEMBERS_INFO, "m0").unwrap().unwrap();
        assert!(info.is_operator());
        assert!(info.is_active());
        assert_eq!(info.member_data["team"], "ops");
    }

    #[test]
    fn test_set_member_data_keeps_rest_of_record() {
        let mut store = MemoryStore::new();
        put_json(
            &mut store,
            tables::MEMBERS_INFO,
            "m0",
            &json!({"status": "Suspended", "cert": "PEM", "member_data": {"is_operator": false}}),
        )
        .unwrap();
        put_json(&mut store, tables::MEMBERS_INFO, "m1", &json!({"cert": "PEM"})).unwrap();

        let mut node = MockNode::new();
        for member_id in ["m0", "m1"] {
            ActionKind::SetMemberData
                .apply(
                    &json!({"member_id": member_id, "member_data": {"is_operator": true}}),
                    &mut store,
                    &mut node,
                )
                .unwrap();
        }

        let m0: Value = get_json(&store, tables::MEMBERS_INFO, "m0").unwrap().unwrap();
        assert_eq!(
            m0,
            json!({"status": "Suspended", "cert": "PEM", "member_data": {"is_operator": true}})
        );
        let m1: Value = get_json(&store, tables::MEMBERS_INFO, "m1").unwrap().unwrap();
        assert_eq!(m1, json!({"cert": "PEM", "member_data": {"is_operator": true}}));
    }

    #[test]
    fn test_set_member_data_unknown_member() {
        let mut store = MemoryStore::new();
        let args = SetMemberDataArgs {
            member_id: "ghost".to_string(),
            member_data: Default::default(),
        };
        let err = apply_set_member_data(args, &mut store).unwrap_err();
        assert_eq!(err.to_string(), "Member ghost does not exist");
    }

    #[test]
    fn test_recovery_threshold_bounds() {
        assert!(validate_set_recovery_threshold(Some(&json!({"threshold": 1}))).is_ok());
        assert!(validate_set_recovery_threshold(Some(&json!({"threshold": 254}))).is_ok());
        assert!(validate_set_recovery_threshold(Some(&json!({"threshold": 0}))).is_err());
        assert!(validate_set_recovery_threshold(Some(&json!({"threshold": 5000}))).is_err());
        assert!(validate_set_recovery_threshold(Some(&json!({"threshold": 2.5}))).is_err());
        assert!(validate_set_recovery_threshold(Some(&json!({}))).is_err());
    }

    #[test]
    fn test_set_user_is_idempotent() {
        let mut store = MemoryStore::new();
        let node = MockNode::new();
        let args = SetUserArgs {
            cert: CERT.to_string(),
            user_data: Some(json!({"is_admin": true})),
        };

        apply_set_user(args.clone(), &mut store, &node).unwrap();
        let after_first = store.clone();
        apply_set_user(args, &mut store, &node).unwrap();

        assert_eq!(store, after_first);
        let user_id = node.pem_to_id(CERT).unwrap();
        assert_eq!(store.get(tables::USERS_CERTS, &user_id).unwrap(), Some(CERT.as_bytes().to_vec()));
        let data: Value = get_json(&store, tables::USERS_INFO, &user_id).unwrap().unwrap();
        assert_eq!(data, json!({"is_admin": true}));
    }

    #[test]
    fn test_set_user_with_stale_user_info_fails() {
        let mut store = MemoryStore::new();
        let node = MockNode::new();
        let user_id = node.pem_to_id(CERT).unwrap();
        put_json(&mut store, tables::USERS_INFO, &user_id, &json!({})).unwrap();

        let args = SetUserArgs {
            cert: CERT.to_string(),
            user_data: Some(json!({})),
        };
        let err = apply_set_user(args, &mut store, &node).unwrap_err();
        assert!(matches!(err, ApplyError::UserInfoExists(id) if id == user_id));
    }

    #[test]
    fn test_set_user_without_user_data() {
        let mut store = MemoryStore::new();
        let mut node = MockNode::new();
        ActionKind::SetUser
            .apply(&json!({"cert": CERT}), &mut store, &mut node)
            .unwrap();
        assert_eq!(store.len(tables::USERS_CERTS), 1);
        assert!(store.is_empty(tables::USERS_INFO));
    }

    #[test]
    fn test_remove_user_is_best_effort() {
        let mut store = MemoryStore::new();
        store.put(tables::USERS_CERTS, "u0", CERT.as_bytes().to_vec()).unwrap();
        store.put(tables::USERS_INFO, "u0", b"{}".to_vec()).unwrap();

        apply_remove_user(RemoveUserArgs { user_id: "u0".to_string() }, &mut store).unwrap();
        assert!(store.is_empty(tables::USERS_CERTS));
        assert!(store.is_empty(tables::USERS_INFO));

        apply_remove_user(RemoveUserArgs { user_id: "u0".to_string() }, &mut store).unwrap();
    }
}
