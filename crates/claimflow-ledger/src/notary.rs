//! The finality service.
//!
//! A notary orders transactions: it refuses any transaction that would
//! consume or reference a state another transaction has already consumed,
//! and signs the rest. Its signature is what makes a transaction final.
//!
//! [`InMemoryNotary`] is non-validating: it checks signatures and
//! uniqueness, not contract rules.

use std::sync::Mutex;

use async_trait::async_trait;
use claimflow_types::{
    ClaimError, Identity, Party, Result, SignedTransaction, TransactionSignature,
};

use crate::uniqueness::{CommitOutcome, UniquenessProvider};

/// Ordering authority that finalizes transactions.
#[async_trait]
pub trait Notary: Send + Sync {
    /// The notary's well-known identity.
    fn party(&self) -> &Party;

    /// Finalize a fully signed transaction and return the notary signature.
    ///
    /// # Errors
    /// - [`ClaimError::FinalityConflict`] if a state was already consumed
    /// - [`ClaimError::SignatureRejected`] if signatures are missing or the
    ///   transaction names a different notary
    async fn finalize(&self, stx: &SignedTransaction) -> Result<TransactionSignature>;
}

/// Uniqueness notary backed by an in-process provider.
pub struct InMemoryNotary {
    identity: Identity,
    uniqueness: Mutex<UniquenessProvider>,
}

impl InMemoryNotary {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            uniqueness: Mutex::new(UniquenessProvider::new()),
        }
    }

    /// Number of transactions finalized so far.
    pub fn committed_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, UniquenessProvider>> {
        self.uniqueness
            .lock()
            .map_err(|_| ClaimError::Internal("notary lock poisoned".into()))
    }
}

#[async_trait]
impl Notary for InMemoryNotary {
    fn party(&self) -> &Party {
        self.identity.party()
    }

    async fn finalize(&self, stx: &SignedTransaction) -> Result<TransactionSignature> {
        if stx.notary() != self.party() {
            return Err(ClaimError::SignatureRejected {
                reason: format!(
                    "{} asked to finalize {} governed by {}",
                    self.party(),
                    stx.id(),
                    stx.notary()
                ),
            });
        }
        stx.verify_required_signatures()?;

        let body = &stx.tx.body;
        let outcome = self.lock()?.commit(stx.id(), &body.inputs, &body.references);
        match outcome {
            Ok(CommitOutcome::Committed) => {
                tracing::info!(
                    notary = %self.party(),
                    tx = %stx.id(),
                    inputs = body.inputs.len(),
                    references = body.references.len(),
                    "Transaction finalized"
                );
            }
            Ok(CommitOutcome::AlreadyCommitted) => {
                tracing::debug!(tx = %stx.id(), "Transaction already finalized");
            }
            Err(err) => {
                tracing::warn!(tx = %stx.id(), error = %err, "Finality refused");
                return Err(err);
            }
        }
        Ok(self.identity.sign(&stx.id()))
    }
}
