//! Uniqueness provider: the notary's double-spend guard.
//!
//! Like blockchain UTXO: each state can only be consumed once. A transaction
//! that tries to consume, or to reference, a state already consumed by a
//! *different* transaction is a conflict and returns
//! [`ClaimError::FinalityConflict`].
//!
//! Reference states are never consumed, but they must still be current at
//! finality: referencing a superseded asset version is how a claim built on
//! stale data is caught even if both parties agreed on it.

use std::collections::{HashMap, HashSet};

use claimflow_types::{ClaimError, Result, StateRef, TxId};

/// Whether a commit changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// First time this transaction was committed.
    Committed,
    /// The same transaction was committed before; nothing changed.
    AlreadyCommitted,
}

/// Tracks which transaction consumed each state.
#[derive(Debug, Default)]
pub struct UniquenessProvider {
    /// State → the transaction that consumed it.
    consumed: HashMap<StateRef, TxId>,
    /// Every transaction committed so far.
    committed: HashSet<TxId>,
}

impl UniquenessProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `tx_id`, consuming `inputs` and checking `references`.
    ///
    /// All checks run before any state is marked, so a conflict leaves the
    /// provider unchanged.
    ///
    /// # Errors
    /// Returns [`ClaimError::FinalityConflict`] naming the first state that
    /// another transaction already consumed.
    pub fn commit(
        &mut self,
        tx_id: TxId,
        inputs: &[StateRef],
        references: &[StateRef],
    ) -> Result<CommitOutcome> {
        if self.committed.contains(&tx_id) {
            return Ok(CommitOutcome::AlreadyCommitted);
        }

        for state in inputs.iter().chain(references) {
            if let Some(&consumed_by) = self.consumed.get(state) {
                return Err(ClaimError::FinalityConflict {
                    state: *state,
                    consumed_by,
                });
            }
        }

        let mut seen = HashSet::with_capacity(inputs.len());
        for state in inputs {
            if !seen.insert(*state) {
                return Err(ClaimError::FinalityConflict {
                    state: *state,
                    consumed_by: tx_id,
                });
            }
        }

        for state in inputs {
            self.consumed.insert(*state, tx_id);
        }
        self.committed.insert(tx_id);
        Ok(CommitOutcome::Committed)
    }

    /// The transaction that consumed `state`, if any.
    #[must_use]
    pub fn consumed_by(&self, state: &StateRef) -> Option<TxId> {
        self.consumed.get(state).copied()
    }

    #[must_use]
    pub fn is_committed(&self, tx_id: &TxId) -> bool {
        self.committed.contains(tx_id)
    }

    /// Number of transactions committed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}
