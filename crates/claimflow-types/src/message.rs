//! Messages exchanged over a claim session.
//!
//! ```text
//!   Holder                                   Issuer
//!     │ ── AssetProof ──────────────────────▶ │  verify backchain
//!     │ ── Notification ────────────────────▶ │  staleness check, compute
//!     │ ◀──────────────────────── Proposal ── │  issuer-signed tx
//!     │ ── CounterSignature ────────────────▶ │  (or Reject)
//!     │ ◀─────────────────────── Finalized ── │  notarised tx
//! ```
//!
//! Either side may send `Reject` instead of its next message; the receiver
//! terminates the run.

use serde::{Deserialize, Serialize};

use crate::{Amount, AssetState, SignedTransaction, StateAndRef, TransactionSignature};

/// The holder's statement of how much of the asset it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimNotification {
    pub amount: Amount,
}

/// The holder's asset state plus the transactions proving it.
///
/// `history` is ordered dependencies-first and ends with the transaction
/// that defines `state_and_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStateProof {
    pub state_and_ref: StateAndRef<AssetState>,
    pub history: Vec<SignedTransaction>,
}

/// One frame on a claim session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimMessage {
    AssetProof(AssetStateProof),
    Notification(ClaimNotification),
    Proposal(SignedTransaction),
    CounterSignature(TransactionSignature),
    Finalized(SignedTransaction),
    Reject { reason: String },
}

impl ClaimMessage {
    /// Variant name, for logs and unexpected-message errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssetProof(_) => "AssetProof",
            Self::Notification(_) => "Notification",
            Self::Proposal(_) => "Proposal",
            Self::CounterSignature(_) => "CounterSignature",
            Self::Finalized(_) => "Finalized",
            Self::Reject { .. } => "Reject",
        }
    }

    /// Encode for the wire.
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an untrusted frame.
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
