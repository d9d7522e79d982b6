//! Resolved transactions: a wire transaction with its input and reference
//! states looked up, ready for contract verification.

use claimflow_types::{
    ClaimError, Command, LedgerState, Party, Result, StateAndRef, StateRef, TransactionState, TxId,
    WireTransaction,
};

/// A [`WireTransaction`] whose input and reference states have been resolved.
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    pub id: TxId,
    pub inputs: Vec<StateAndRef<LedgerState>>,
    pub references: Vec<StateAndRef<LedgerState>>,
    pub outputs: Vec<TransactionState<LedgerState>>,
    pub commands: Vec<Command>,
    pub notary: Party,
}

impl LedgerTransaction {
    /// Resolve every input and reference through `lookup`.
    ///
    /// # Errors
    /// Returns [`ClaimError::UnresolvableReference`] for the first state
    /// `lookup` does not know.
    pub fn resolve<F>(tx: &WireTransaction, lookup: F) -> Result<Self>
    where
        F: Fn(&StateRef) -> Option<StateAndRef<LedgerState>>,
    {
        let find = |sref: &StateRef| {
            lookup(sref).ok_or_else(|| ClaimError::UnresolvableReference {
                reason: format!("state {sref} needed by {} is unknown", tx.id),
            })
        };
        let inputs = tx.body.inputs.iter().map(find).collect::<Result<Vec<_>>>()?;
        let references = tx
            .body
            .references
            .iter()
            .map(find)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: tx.id,
            inputs,
            references,
            outputs: tx.body.outputs.clone(),
            commands: tx.body.commands.clone(),
            notary: tx.body.notary.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use claimflow_types::{AssetState, CommandKind, Identity, TransactionBuilder};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn resolves_references_through_lookup() {
        let issuer = Identity::from_seed("Issuer", [1u8; 32]);
        let notary = Identity::from_seed("Notary", [3u8; 32]);
        let asset = AssetState::dummy(issuer.party().clone(), "ACME", Decimal::new(25, 3));
        let issue = TransactionBuilder::new(notary.party().clone())
            .add_output(LedgerState::Asset(asset))
            .add_command(Command::new(CommandKind::IssueAsset, vec![issuer.key()]))
            .build()
            .unwrap();
        let sref = StateRef::new(issue.id, 0);
        let tx = TransactionBuilder::new(notary.party().clone())
            .add_reference(sref)
            .build()
            .unwrap();

        let ltx = LedgerTransaction::resolve(&tx, |r| {
            (r.txhash == issue.id).then(|| issue.out_ref(r.index)).flatten()
        })
        .unwrap();
        assert_eq!(ltx.references.len(), 1);
        assert_eq!(ltx.references[0].reference, sref);
        assert!(ltx.inputs.is_empty());
    }

    #[test]
    fn unknown_reference_fails() {
        let notary = Identity::from_seed("Notary", [3u8; 32]);
        let tx = TransactionBuilder::new(notary.party().clone())
            .add_reference(StateRef::new(TxId([8u8; 32]), 0))
            .build()
            .unwrap();
        let err = LedgerTransaction::resolve(&tx, |_| None).unwrap_err();
        assert!(matches!(err, ClaimError::UnresolvableReference { .. }));
    }
}
