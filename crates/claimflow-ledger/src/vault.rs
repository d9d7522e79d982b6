//! A party's local ledger view: recorded transactions, unconsumed states,
//! and the holdings index.
//!
//! The vault is the indexed query store the claim flows consult. It only
//! ever reflects what *this* party has recorded. A holder that missed an
//! asset update still resolves the old version, which is how stale views
//! arise.

use std::{
    collections::{HashMap, HashSet},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use claimflow_types::{
    Amount, AssetPointer, AssetState, ClaimError, ClaimRecord, LedgerState, LinearId, Party,
    PointerResolver, Result, SignedTransaction, StateAndRef, StateRef, TransactionState, TxId,
    WireTransaction,
};

use crate::ledger_tx::LedgerTransaction;

/// The per-party store consumed read-mostly by both flows.
pub trait Vault: PointerResolver + Send + Sync {
    /// The party whose view this is.
    fn owner(&self) -> &Party;

    /// Pointer to the asset with `symbol`.
    ///
    /// # Errors
    /// Returns [`ClaimError::UnknownAsset`] if no unconsumed asset has it.
    fn query_asset_pointer(&self, symbol: &str) -> Result<AssetPointer>;

    /// How much of the pointed-to asset the owner holds. Zero if none.
    fn holding_amount(&self, pointer: &AssetPointer) -> Result<Amount>;

    /// A recorded transaction, if known.
    ///
    /// # Errors
    /// Returns [`ClaimError::Internal`] if the vault cannot be read.
    fn transaction(&self, id: &TxId) -> Result<Option<SignedTransaction>>;

    /// Record a finalized transaction, updating the unconsumed set.
    fn record(&self, stx: SignedTransaction) -> Result<()>;

    /// Any state this vault has seen, consumed or not.
    fn resolve_state(&self, sref: &StateRef) -> Result<StateAndRef<LedgerState>> {
        self.transaction(&sref.txhash)?
            .and_then(|stx| stx.tx.out_ref(sref.index))
            .ok_or_else(|| ClaimError::UnresolvableReference {
                reason: format!("state {sref} is not in the vault of {}", self.owner()),
            })
    }

    /// Resolve inputs and references for contract verification.
    fn to_ledger_transaction(&self, tx: &WireTransaction) -> Result<LedgerTransaction> {
        let mut known = HashMap::new();
        for sref in tx.body.inputs.iter().chain(&tx.body.references) {
            if let Some(stx) = self.transaction(&sref.txhash)? {
                known.extend(stx.tx.out_ref(sref.index).map(|s| (*sref, s)));
            }
        }
        LedgerTransaction::resolve(tx, |sref| known.get(sref).cloned())
    }

    /// Backchain of `tx_id`: every transaction its inputs and references
    /// depend on, dependencies first, ending with `tx_id` itself.
    fn history(&self, tx_id: &TxId) -> Result<Vec<SignedTransaction>> {
        let mut ordered = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<(TxId, Option<SignedTransaction>)> = vec![(*tx_id, None)];

        while let Some((id, expanded)) = stack.pop() {
            if let Some(stx) = expanded {
                ordered.push(stx);
                continue;
            }
            if !seen.insert(id) {
                continue;
            }
            let stx = self
                .transaction(&id)?
                .ok_or_else(|| ClaimError::UnresolvableReference {
                    reason: format!("{id} missing from the vault of {}", self.owner()),
                })?;
            let deps: Vec<TxId> = stx
                .tx
                .body
                .inputs
                .iter()
                .chain(&stx.tx.body.references)
                .map(|r| r.txhash)
                .filter(|d| !seen.contains(d))
                .collect();
            stack.push((id, Some(stx)));
            stack.extend(deps.into_iter().map(|d| (d, None)));
        }
        Ok(ordered)
    }
}

// ---------------------------------------------------------------------------
// InMemoryVault
// ---------------------------------------------------------------------------

#[derive(Default)]
struct VaultInner {
    transactions: HashMap<TxId, SignedTransaction>,
    unconsumed: HashMap<StateRef, TransactionState<LedgerState>>,
    consumed: HashSet<StateRef>,
    holdings: HashMap<LinearId, i64>,
}

/// Vault backed by in-process maps behind a lock.
pub struct InMemoryVault {
    owner: Party,
    inner: RwLock<VaultInner>,
}

impl InMemoryVault {
    #[must_use]
    pub fn new(owner: Party) -> Self {
        Self {
            owner,
            inner: RwLock::new(VaultInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, VaultInner>> {
        self.inner
            .read()
            .map_err(|_| ClaimError::Internal("vault lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, VaultInner>> {
        self.inner
            .write()
            .map_err(|_| ClaimError::Internal("vault lock poisoned".into()))
    }

    /// Set the owner's holding of an asset. Token bookkeeping itself is out
    /// of scope; this is the index the holder flow reads.
    pub fn set_holding(&self, pointer: &AssetPointer, quantity: i64) -> Result<()> {
        self.write()?.holdings.insert(pointer.linear_id, quantity);
        Ok(())
    }

    /// Unconsumed claims recorded in this vault.
    pub fn claims(&self) -> Result<Vec<ClaimRecord>> {
        let inner = self.read()?;
        let mut claims: Vec<ClaimRecord> = inner
            .unconsumed
            .values()
            .filter_map(|s| s.data.as_claim().cloned())
            .collect();
        claims.sort_by_key(|c| c.linear_id);
        Ok(claims)
    }

    /// Number of recorded transactions.
    pub fn transaction_count(&self) -> Result<usize> {
        Ok(self.read()?.transactions.len())
    }

    /// Whether `sref` has been consumed by a recorded transaction.
    pub fn is_consumed(&self, sref: &StateRef) -> Result<bool> {
        Ok(self.read()?.consumed.contains(sref))
    }
}

impl PointerResolver for InMemoryVault {
    fn latest_asset(&self, linear_id: LinearId) -> Result<Option<StateAndRef<AssetState>>> {
        let inner = self.read()?;
        Ok(inner.unconsumed.iter().find_map(|(sref, state)| match &state.data {
            LedgerState::Asset(asset) if asset.linear_id == linear_id => Some(StateAndRef {
                state: TransactionState::new(asset.clone(), state.notary.clone()),
                reference: *sref,
            }),
            _ => None,
        }))
    }
}

impl Vault for InMemoryVault {
    fn owner(&self) -> &Party {
        &self.owner
    }

    fn query_asset_pointer(&self, symbol: &str) -> Result<AssetPointer> {
        let inner = self.read()?;
        inner
            .unconsumed
            .values()
            .filter_map(|s| s.data.as_asset())
            .filter(|a| a.symbol == symbol)
            .min_by_key(|a| a.linear_id)
            .map(AssetState::pointer)
            .ok_or_else(|| ClaimError::UnknownAsset(symbol.to_string()))
    }

    fn holding_amount(&self, pointer: &AssetPointer) -> Result<Amount> {
        let asset = pointer.resolve(self)?;
        let quantity = self
            .read()?
            .holdings
            .get(&pointer.linear_id)
            .copied()
            .unwrap_or(0);
        Ok(Amount::new(quantity, asset.state.data.token_type()))
    }

    fn transaction(&self, id: &TxId) -> Result<Option<SignedTransaction>> {
        Ok(self.read()?.transactions.get(id).cloned())
    }

    fn record(&self, stx: SignedTransaction) -> Result<()> {
        stx.verify_finalized()?;
        let mut inner = self.write()?;
        if inner.transactions.contains_key(&stx.id()) {
            return Ok(());
        }
        for input in &stx.tx.body.inputs {
            inner.unconsumed.remove(input);
            inner.consumed.insert(*input);
        }
        for out in stx.tx.out_refs() {
            if !inner.consumed.contains(&out.reference) {
                inner.unconsumed.insert(out.reference, out.state);
            }
        }
        tracing::debug!(
            owner = %self.owner,
            tx = %stx.id(),
            inputs = stx.tx.body.inputs.len(),
            outputs = stx.tx.body.outputs.len(),
            "Transaction recorded"
        );
        inner.transactions.insert(stx.id(), stx);
        Ok(())
    }
}
