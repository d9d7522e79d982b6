//! Parties and signing identities.
//!
//! A [`Party`] is a well-known name bound to an ed25519 public key. The
//! [`Identity`] is the node-local half: the same party plus its signing key,
//! which never leaves the owning node.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{TransactionSignature, TxId};

// ---------------------------------------------------------------------------
// PartyKey
// ---------------------------------------------------------------------------

/// The raw ed25519 public key (32 bytes) that owns a party's states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PartyKey(pub [u8; 32]);

impl PartyKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Verify an ed25519 signature by this key over `message`.
    ///
    /// Malformed keys or signatures simply fail verification.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(message, &signature).is_ok()
    }
}

impl fmt::Display for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Party
// ---------------------------------------------------------------------------

/// A network participant: legal name plus owning key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub owning_key: PartyKey,
}

impl Party {
    #[must_use]
    pub fn new(name: impl Into<String>, owning_key: PartyKey) -> Self {
        Self {
            name: name.into(),
            owning_key,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.owning_key.short())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A node's own party together with its private signing key.
pub struct Identity {
    party: Party,
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh identity from the OS random source.
    #[must_use]
    pub fn generate(name: impl Into<String>) -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self::from_signing_key(name, signing_key)
    }

    /// Deterministic identity from a 32-byte seed (fixtures, demos).
    #[must_use]
    pub fn from_seed(name: impl Into<String>, seed: [u8; 32]) -> Self {
        Self::from_signing_key(name, SigningKey::from_bytes(&seed))
    }

    fn from_signing_key(name: impl Into<String>, signing_key: SigningKey) -> Self {
        let owning_key = PartyKey(signing_key.verifying_key().to_bytes());
        Self {
            party: Party::new(name, owning_key),
            signing_key,
        }
    }

    #[must_use]
    pub fn party(&self) -> &Party {
        &self.party
    }

    #[must_use]
    pub fn key(&self) -> PartyKey {
        self.party.owning_key
    }

    /// Sign a transaction id with this identity's key.
    #[must_use]
    pub fn sign(&self, tx_id: &TxId) -> TransactionSignature {
        let signature = self.signing_key.sign(tx_id.as_bytes());
        TransactionSignature {
            by: self.key(),
            bytes: signature.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("party", &self.party)
            .finish_non_exhaustive()
    }
}
