//! Verification of an asset-state proof and its transaction history.
//!
//! The receiving party trusts nothing in the proof. It checks that:
//! 1. the history is bounded and non-empty
//! 2. every transaction's id matches its body, it carries every required
//!    signature, and its notary signed it
//! 3. every input and reference resolves to an *earlier* transaction in the
//!    history (the chain is closed and dependencies-first)
//! 4. every transaction satisfies the contract
//! 5. the proven state is exactly output `index` of its defining transaction

use std::collections::HashMap;

use claimflow_types::{
    AssetState, AssetStateProof, ClaimError, Result, SignedTransaction, StateAndRef, TxId,
    constants,
};

use crate::{contract::ContractVerifier, ledger_tx::LedgerTransaction};

fn invalid(reason: impl Into<String>) -> ClaimError {
    ClaimError::InvalidAssetProof {
        reason: reason.into(),
    }
}

/// Check `proof` and return the proven asset state.
///
/// # Errors
/// Returns [`ClaimError::InvalidAssetProof`] describing the first failed check.
pub fn verify_proof(
    proof: &AssetStateProof,
    verifier: &dyn ContractVerifier,
) -> Result<StateAndRef<AssetState>> {
    if proof.history.is_empty() {
        return Err(invalid("empty transaction history"));
    }
    if proof.history.len() > constants::MAX_PROOF_HISTORY {
        return Err(invalid(format!(
            "history of {} transactions exceeds limit {}",
            proof.history.len(),
            constants::MAX_PROOF_HISTORY
        )));
    }

    let mut verified: HashMap<TxId, &SignedTransaction> = HashMap::with_capacity(proof.history.len());
    for stx in &proof.history {
        stx.verify_finalized()
            .map_err(|e| invalid(format!("{}: {e}", stx.id())))?;

        let ltx = LedgerTransaction::resolve(&stx.tx, |sref| {
            verified
                .get(&sref.txhash)
                .and_then(|dep| dep.tx.out_ref(sref.index))
        })
        .map_err(|e| invalid(format!("{} has an unproven dependency: {e}", stx.id())))?;

        verifier
            .verify(&ltx)
            .map_err(|e| invalid(format!("{}: {e}", stx.id())))?;

        verified.insert(stx.id(), stx);
    }

    let claimed = &proof.state_and_ref;
    let defining = verified
        .get(&claimed.reference.txhash)
        .ok_or_else(|| invalid(format!("defining transaction {} not in history", claimed.reference.txhash)))?;
    let actual = defining
        .tx
        .out_ref(claimed.reference.index)
        .and_then(StateAndRef::into_asset)
        .ok_or_else(|| invalid(format!("{} is not an asset output", claimed.reference)))?;
    if &actual != claimed {
        return Err(invalid(format!(
            "state at {} differs from the one presented",
            claimed.reference
        )));
    }

    Ok(actual)
}
