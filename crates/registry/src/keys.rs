//! System key encoding for registry records.
//!
//! All registry state lives under the reserved `\xFF` system prefix, keyed so
//! that range scans stay tenant-scoped:
//!
//! - Boundary entries: `\xFF/blobrange/bdy/{tenant}{boundary_key:var}`
//! - Purge tasks:      `\xFF/blobrange/purge/{token:var}`
//! - Purge watermarks: `\xFF/blobrange/wm/{tenant}{begin_len:u32be}{begin_key}{end_key:var}`
//! - Commit version:   `\xFF/blobrange/version`
//! - Purge sequence:   `\xFF/blobrange/purge_seq`
//! - Tenant directory: `\xFF/tenant/{name:var}` and `\xFF/tenant_seq`
//!
//! `{tenant}` is one tag byte (`0x00` root, `0x01` tenant) followed by the
//! 8-byte big-endian tenant id when present. The boundary key is always the
//! trailing variable-length component, so scans over `[prefix + begin,
//! prefix + end)` translate key-space ranges directly.

use blobrange_types::{Key, PurgeToken, TenantId};

const BOUNDARY_PREFIX: &[u8] = b"\xff/blobrange/bdy/";
const PURGE_PREFIX: &[u8] = b"\xff/blobrange/purge/";
const WATERMARK_PREFIX: &[u8] = b"\xff/blobrange/wm/";
const VERSION_KEY: &[u8] = b"\xff/blobrange/version";
const PURGE_SEQ_KEY: &[u8] = b"\xff/blobrange/purge_seq";
const TENANT_PREFIX: &[u8] = b"\xff/tenant/";
const TENANT_SEQ_KEY: &[u8] = b"\xff/tenant_seq";

/// Tag byte for the untenanted root.
const TAG_ROOT: u8 = 0x00;
/// Tag byte preceding an 8-byte tenant id.
const TAG_TENANT: u8 = 0x01;

fn push_tenant(buf: &mut Key, tenant: Option<TenantId>) {
    match tenant {
        None => buf.push(TAG_ROOT),
        Some(id) => {
            buf.push(TAG_TENANT);
            buf.extend_from_slice(&id.prefix());
        },
    }
}

/// Prefix under which one tenant's boundary entries live.
pub fn boundary_prefix(tenant: Option<TenantId>) -> Key {
    let mut key = Vec::with_capacity(BOUNDARY_PREFIX.len() + 9);
    key.extend_from_slice(BOUNDARY_PREFIX);
    push_tenant(&mut key, tenant);
    key
}

/// Encodes the boundary entry key for `boundary` in `tenant`'s ledger.
pub fn boundary_key(tenant: Option<TenantId>, boundary: &[u8]) -> Key {
    let mut key = boundary_prefix(tenant);
    key.extend_from_slice(boundary);
    key
}

/// Decodes a boundary entry key back to its tenant and boundary components.
///
/// Returns `None` if the key is not a boundary entry.
pub fn decode_boundary_key(key: &[u8]) -> Option<(Option<TenantId>, Key)> {
    let rest = key.strip_prefix(BOUNDARY_PREFIX)?;
    let (&tag, rest) = rest.split_first()?;
    match tag {
        TAG_ROOT => Some((None, rest.to_vec())),
        TAG_TENANT => {
            if rest.len() < 8 {
                return None;
            }
            let id = i64::from_be_bytes(rest[..8].try_into().ok()?);
            Some((Some(TenantId::new(id)), rest[8..].to_vec()))
        },
        _ => None,
    }
}

/// Encodes the storage key for a purge task record.
pub fn purge_task_key(token: &PurgeToken) -> Key {
    let mut key = Vec::with_capacity(PURGE_PREFIX.len() + token.as_bytes().len());
    key.extend_from_slice(PURGE_PREFIX);
    key.extend_from_slice(token.as_bytes());
    key
}

/// Range covering every purge task record, for worker scans.
pub fn purge_task_range() -> (Key, Key) {
    range_of_prefix(PURGE_PREFIX)
}

/// Decodes a purge task storage key back to its token.
pub fn decode_purge_task_key(key: &[u8]) -> Option<PurgeToken> {
    key.strip_prefix(PURGE_PREFIX).map(|rest| PurgeToken::from_bytes(rest.to_vec()))
}

/// Prefix under which one tenant's purge watermarks live.
pub fn watermark_prefix(tenant: Option<TenantId>) -> Key {
    let mut key = Vec::with_capacity(WATERMARK_PREFIX.len() + 9);
    key.extend_from_slice(WATERMARK_PREFIX);
    push_tenant(&mut key, tenant);
    key
}

/// Encodes the watermark key for a purged range.
///
/// `begin` is length-prefixed: a bare concatenation would let distinct
/// ranges share one key (`[a, bc)` and `[ab, c)` both flatten to `abc`).
/// The authoritative range lives in the record value, the key is never
/// decoded.
pub fn watermark_key(tenant: Option<TenantId>, begin: &[u8], end: &[u8]) -> Key {
    let mut key = watermark_prefix(tenant);
    key.extend_from_slice(&(begin.len() as u32).to_be_bytes());
    key.extend_from_slice(begin);
    key.extend_from_slice(end);
    key
}

/// The ledger commit version counter key.
pub fn version_key() -> Key {
    VERSION_KEY.to_vec()
}

/// The purge token sequence counter key.
pub fn purge_seq_key() -> Key {
    PURGE_SEQ_KEY.to_vec()
}

/// Encodes the tenant directory key for `name`.
pub fn tenant_name_key(name: &str) -> Key {
    let mut key = Vec::with_capacity(TENANT_PREFIX.len() + name.len());
    key.extend_from_slice(TENANT_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

/// The tenant id sequence counter key.
pub fn tenant_seq_key() -> Key {
    TENANT_SEQ_KEY.to_vec()
}

/// Returns `[prefix, prefix-successor)` covering every key under `prefix`.
pub fn range_of_prefix(prefix: &[u8]) -> (Key, Key) {
    let mut end = prefix.to_vec();
    // Strip trailing 0xFF bytes, then increment; a prefix of all 0xFF bytes
    // cannot occur under our fixed system prefixes.
    while matches!(end.last(), Some(&0xFF)) {
        end.pop();
    }
    if let Some(last) = end.last_mut() {
        *last += 1;
    }
    (prefix.to_vec(), end)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_key_roundtrip() {
        let tenant = Some(TenantId::new(99));
        let encoded = boundary_key(tenant, b"user/alice");
        let (decoded_tenant, decoded_boundary) = decode_boundary_key(&encoded).expect("decodes");
        assert_eq!(decoded_tenant, tenant);
        assert_eq!(decoded_boundary, b"user/alice");
    }

    #[test]
    fn test_boundary_key_roundtrip_root() {
        let encoded = boundary_key(None, b"k");
        let (tenant, boundary) = decode_boundary_key(&encoded).expect("decodes");
        assert_eq!(tenant, None);
        assert_eq!(boundary, b"k");
    }

    #[test]
    fn test_boundary_keys_preserve_ordering() {
        let tenant = Some(TenantId::new(1));
        let a = boundary_key(tenant, b"a");
        let b = boundary_key(tenant, b"b");
        assert!(a < b, "boundary order must follow key order");
    }

    #[test]
    fn test_tenants_do_not_interleave() {
        // The highest root boundary sorts below the lowest tenant boundary.
        let root_hi = boundary_key(None, &[0xFE; 16]);
        let tenant_lo = boundary_key(Some(TenantId::new(i64::MIN)), b"");
        assert!(root_hi < tenant_lo);
    }

    #[test]
    fn test_purge_task_key_roundtrip() {
        let token = PurgeToken::from_bytes(vec![1, 2, 3, 0xFF]);
        let key = purge_task_key(&token);
        assert_eq!(decode_purge_task_key(&key), Some(token));
    }

    #[test]
    fn test_watermark_keys_distinguish_range_splits() {
        // Same concatenated bytes, different split points.
        let left = watermark_key(None, b"a", b"bc");
        let right = watermark_key(None, b"ab", b"c");
        assert_ne!(left, right);
    }

    #[test]
    fn test_range_of_prefix_covers_exactly() {
        let (begin, end) = range_of_prefix(b"ab");
        assert_eq!(begin, b"ab".to_vec());
        assert_eq!(end, b"ac".to_vec());
        assert!(b"ab\xff\xff".to_vec() < end);
        assert!(b"ac".to_vec() >= end);
    }

    #[test]
    fn test_range_of_prefix_trailing_ff() {
        let (_, end) = range_of_prefix(b"a\xff");
        assert_eq!(end, b"b".to_vec());
    }
}
