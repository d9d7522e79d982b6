//! Identifiers used throughout claimflow.
//!
//! Linear identifiers use UUIDv7 for time-ordered sorting. Transaction
//! identifiers are SHA-256 content hashes, so two parties holding the same
//! transaction always agree on its id.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// LinearId
// ---------------------------------------------------------------------------

/// Identity shared by every version of an evolving ledger record.
///
/// Asset states keep the same `LinearId` across updates; a pointer holding
/// it always resolves to the latest unconsumed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LinearId(pub Uuid);

impl LinearId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for LinearId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "linear:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TxId
// ---------------------------------------------------------------------------

/// Content hash of a transaction body (SHA-256, 32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Full lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// StateRef
// ---------------------------------------------------------------------------

/// Points at output `index` of transaction `txhash`.
///
/// Equality is by content hash, never by object identity. This is what the
/// staleness check compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StateRef {
    pub txhash: TxId,
    pub index: u32,
}

impl StateRef {
    #[must_use]
    pub fn new(txhash: TxId, index: u32) -> Self {
        Self { txhash, index }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_id_uniqueness() {
        let a = LinearId::new();
        let b = LinearId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn linear_id_ordering() {
        let a = LinearId::new();
        let b = LinearId::new();
        assert!(a < b);
    }

    #[test]
    fn tx_id_display_is_truncated_hex() {
        let id = TxId([0xab; 32]);
        assert_eq!(id.to_string(), "tx:abababababababab");
        assert_eq!(id.short(), "abababab");
        assert_eq!(id.to_hex().len(), 64);
    }

    #[test]
    fn state_ref_equality_is_by_hash_and_index() {
        let a = StateRef::new(TxId([1u8; 32]), 0);
        let b = StateRef::new(TxId([1u8; 32]), 0);
        let c = StateRef::new(TxId([1u8; 32]), 1);
        let d = StateRef::new(TxId([2u8; 32]), 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn serde_roundtrips() {
        let id = LinearId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: LinearId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let sref = StateRef::new(TxId([9u8; 32]), 3);
        let json = serde_json::to_string(&sref).unwrap();
        let back: StateRef = serde_json::from_str(&json).unwrap();
        assert_eq!(sref, back);
    }
}
