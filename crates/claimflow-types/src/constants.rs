//! Protocol-wide constants for claimflow.

/// Default time to wait for the counterparty's next session message (ms).
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 30_000;

/// Default time allowed for the notary to finalize a transaction (ms).
pub const DEFAULT_FINALITY_TIMEOUT_MS: u64 = 10_000;

/// Default bound on in-flight frames per session direction.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Bound on sessions waiting to be accepted by a responder.
pub const DEFAULT_INBOX_CAPACITY: usize = 64;

/// Finished issuer runs buffered for a responder handle before new ones
/// are dropped.
pub const DEFAULT_OUTCOME_CAPACITY: usize = 256;

/// Longest backchain a holder may send with its asset proof.
pub const MAX_PROOF_HISTORY: usize = 1_024;

/// Largest number of fraction digits a token may declare.
pub const MAX_FRACTION_DIGITS: u32 = 28;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name.
pub const PROTOCOL_NAME: &str = "claimflow";
