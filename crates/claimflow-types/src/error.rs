//! Error types for the claimflow protocol.
//!
//! All errors use the `CF_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Asset state / reference errors
//! - 2xx: Claim errors
//! - 3xx: Transaction and signature errors
//! - 4xx: Finality errors
//! - 5xx: Session errors
//! - 9xx: General / internal errors
//!
//! Every error is terminal for the protocol run that produced it.

use thiserror::Error;

use crate::{LinearId, PartyKey, StateRef, TxId};

/// Central error enum for all claimflow operations.
#[derive(Debug, Error)]
pub enum ClaimError {
    // =================================================================
    // Asset Errors (1xx)
    // =================================================================
    /// The local vault holds no asset state with this symbol.
    #[error("CF_ERR_100: Unknown asset: {0}")]
    UnknownAsset(String),

    /// A pointer (or a state reference) could not be resolved locally.
    #[error("CF_ERR_101: Unresolvable reference: {reason}")]
    UnresolvableReference { reason: String },

    /// The holder's asset state is not the issuer's latest version.
    #[error(
        "CF_ERR_102: Stale asset state: holder supplied {supplied}, issuer has {current}; \
         holder must refresh before claiming"
    )]
    StaleAssetState { supplied: StateRef, current: StateRef },

    /// The holder's asset proof or its transaction history failed verification.
    #[error("CF_ERR_103: Invalid asset proof: {reason}")]
    InvalidAssetProof { reason: String },

    // =================================================================
    // Claim Errors (2xx)
    // =================================================================
    /// The proposed claim does not name the requesting party as holder.
    #[error("CF_ERR_200: Claim ownership mismatch: {reason}")]
    ClaimOwnershipMismatch { reason: String },

    /// The claim could not be computed or is structurally invalid.
    #[error("CF_ERR_201: Invalid claim: {reason}")]
    InvalidClaim { reason: String },

    /// The settlement currency code is not known.
    #[error("CF_ERR_202: Unknown currency: {0}")]
    UnknownCurrency(String),

    // =================================================================
    // Transaction Errors (3xx)
    // =================================================================
    /// The transaction broke a contract rule.
    #[error("CF_ERR_300: Contract violation: {reason}")]
    ContractViolation { reason: String },

    /// A required signer declined or returned an unusable signature.
    #[error("CF_ERR_301: Signature rejected: {reason}")]
    SignatureRejected { reason: String },

    /// A signature failed ed25519 verification.
    #[error("CF_ERR_302: Invalid signature by {signer} on {tx_id}")]
    InvalidSignature { signer: PartyKey, tx_id: TxId },

    /// The transaction id does not match the transaction content.
    #[error("CF_ERR_303: Transaction id mismatch: declared {declared}, computed {computed}")]
    TransactionIdMismatch { declared: TxId, computed: TxId },

    // =================================================================
    // Finality Errors (4xx)
    // =================================================================
    /// The notary saw a conflicting use of one of the transaction's states.
    #[error("CF_ERR_400: Finality conflict: {state} already consumed by {consumed_by}")]
    FinalityConflict { state: StateRef, consumed_by: TxId },

    /// Finality did not complete in time.
    #[error("CF_ERR_401: Finality timed out after {timeout_ms}ms")]
    FinalityTimeout { timeout_ms: u64 },

    /// The finalized transaction is not the one this party signed.
    #[error("CF_ERR_402: Finality mismatch: signed {signed}, received {received}")]
    FinalityMismatch { signed: TxId, received: TxId },

    // =================================================================
    // Session Errors (5xx)
    // =================================================================
    /// The session failed (counterparty disconnected, channel closed).
    #[error("CF_ERR_500: Session error: {reason}")]
    SessionError { reason: String },

    /// No message arrived within the session timeout.
    #[error("CF_ERR_501: Session timed out after {timeout_ms}ms waiting for {waiting_for}")]
    SessionTimeout {
        waiting_for: &'static str,
        timeout_ms: u64,
    },

    /// The counterparty sent a message out of protocol order.
    #[error("CF_ERR_502: Unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },

    /// The counterparty explicitly rejected and ended the run.
    #[error("CF_ERR_503: Counterparty aborted: {reason}")]
    CounterpartyAborted { reason: String },

    /// No session endpoint is registered for this party.
    #[error("CF_ERR_504: Unknown party: {0}")]
    UnknownParty(PartyKey),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CF_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CF_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("CF_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("CF_ERR_903: I/O error: {0}")]
    Io(String),
}

impl ClaimError {
    /// Shorthand for an unresolvable linear pointer.
    #[must_use]
    pub fn unresolvable_pointer(linear_id: LinearId) -> Self {
        Self::UnresolvableReference {
            reason: format!("no unconsumed state for {linear_id}"),
        }
    }

    /// Shorthand for a contract rule failure.
    #[must_use]
    pub fn contract(reason: impl Into<String>) -> Self {
        Self::ContractViolation {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ClaimError>;

impl From<std::io::Error> for ClaimError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClaimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
