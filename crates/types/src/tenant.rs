//! Tenant identifiers.
//!
//! Tenants partition the key space and the boundary ledger into independent
//! instances. Externally a tenant is addressed by name; internally every
//! tenant resolves to a numeric [`TenantId`] whose big-endian encoding is the
//! key-space prefix. The untenanted root uses no prefix at all.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally visible tenant name.
pub type TenantName = String;

/// Unique identifier for a tenant.
///
/// Wraps an `i64` with compile-time type safety. The big-endian byte encoding
/// of the value is the tenant's key-space prefix, so tenants sort by id.
///
/// # Display
///
/// Formats with a `tenant:` prefix: `tenant:42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    /// Creates a new identifier from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns the tenant's key-space prefix.
    #[must_use]
    pub fn prefix(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl From<i64> for TenantId {
    #[inline]
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<TenantId> for i64 {
    #[inline]
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenant:{}", self.0)
    }
}
