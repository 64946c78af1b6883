//! Tenant directory: name to id resolution.
//!
//! Registry operations address tenants by name; the directory maps names to
//! numeric ids whose big-endian encoding prefixes that tenant's system keys.
//! Resolution happens inside the caller's transaction so a rename or create
//! racing a retry is observed consistently.

use blobrange_store::Transaction;
use blobrange_types::{decode, encode, TenantId};

use crate::error::{RegistryError, Result};
use crate::keys;

/// Resolves `name` to its tenant id.
///
/// # Errors
///
/// [`RegistryError::TenantNotFound`] if the name has never been created.
pub(crate) fn resolve(txn: &mut Transaction, name: &str) -> Result<TenantId> {
    match txn.get(&keys::tenant_name_key(name))? {
        Some(v) => Ok(TenantId::new(decode::<i64>(&v)?)),
        None => Err(RegistryError::TenantNotFound { name: name.to_string() }),
    }
}

/// Resolves an optional tenant name; `None` addresses the untenanted root.
pub(crate) fn resolve_opt(
    txn: &mut Transaction,
    name: Option<&str>,
) -> Result<Option<TenantId>> {
    name.map(|n| resolve(txn, n)).transpose()
}

/// Creates `name` if absent and returns its id; creation is idempotent.
pub(crate) fn create(txn: &mut Transaction, name: &str) -> Result<TenantId> {
    let key = keys::tenant_name_key(name);
    if let Some(v) = txn.get(&key)? {
        return Ok(TenantId::new(decode::<i64>(&v)?));
    }
    let next = match txn.get(&keys::tenant_seq_key())? {
        Some(v) => decode::<i64>(&v)? + 1,
        None => 1,
    };
    txn.set(&keys::tenant_seq_key(), &encode(&next)?);
    txn.set(&key, &encode(&next)?);
    Ok(TenantId::new(next))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use blobrange_store::Store;

    #[test]
    fn test_create_then_resolve() {
        let store = Store::new();
        let mut txn = store.begin();
        let id = create(&mut txn, "acme").expect("create");
        txn.commit().expect("commit");

        let mut txn = store.begin();
        assert_eq!(resolve(&mut txn, "acme").expect("resolve"), id);
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let store = Store::new();
        let mut txn = store.begin();
        let err = resolve(&mut txn, "bogus").expect_err("must fail");
        assert!(matches!(err, RegistryError::TenantNotFound { .. }));
    }

    #[test]
    fn test_create_is_idempotent() {
        let store = Store::new();
        let mut txn = store.begin();
        let first = create(&mut txn, "acme").expect("create");
        let second = create(&mut txn, "acme").expect("create again");
        assert_eq!(first, second);
        let other = create(&mut txn, "umbrella").expect("create other");
        assert_ne!(first, other);
    }

    #[test]
    fn test_root_resolution_is_none() {
        let store = Store::new();
        let mut txn = store.begin();
        assert_eq!(resolve_opt(&mut txn, None).expect("root"), None);
    }
}
