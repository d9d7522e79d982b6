//! Minimal asset lifecycle operations used to seed a ledger.
//!
//! Asset issuance is not part of the claim protocol; these helpers exist so
//! tests and the demo can put real, notarised asset states into vaults and
//! produce newer versions that leave a party's copy stale.

use claimflow_types::{
    AssetPointer, AssetState, Command, CommandKind, Identity, LedgerState, Result,
    SignedTransaction, TransactionBuilder,
};

use crate::{contract::ContractVerifier, notary::Notary, vault::Vault};

async fn verify_sign_and_finalize(
    builder: TransactionBuilder,
    issuer: &Identity,
    vault: &dyn Vault,
    verifier: &dyn ContractVerifier,
    notary: &dyn Notary,
) -> Result<SignedTransaction> {
    let tx = builder.build()?;
    verifier.verify(&vault.to_ledger_transaction(&tx)?)?;
    let ptx = SignedTransaction::signed_by(tx, issuer);
    let notary_sig = notary.finalize(&ptx).await?;
    let stx = ptx.with_signature(notary_sig)?;
    vault.record(stx.clone())?;
    Ok(stx)
}

/// Issue the first version of `asset`, recording it in the issuer's vault.
pub async fn issue_asset(
    issuer: &Identity,
    vault: &dyn Vault,
    verifier: &dyn ContractVerifier,
    notary: &dyn Notary,
    asset: AssetState,
) -> Result<SignedTransaction> {
    let symbol = asset.symbol.clone();
    let builder = TransactionBuilder::new(notary.party().clone())
        .add_output(LedgerState::Asset(asset))
        .add_command(Command::new(CommandKind::IssueAsset, vec![issuer.key()]));
    let stx = verify_sign_and_finalize(builder, issuer, vault, verifier, notary).await?;
    tracing::info!(symbol = %symbol, tx = %stx.id(), "Asset issued");
    Ok(stx)
}

/// Produce a new version of the asset behind `pointer`, consuming the
/// issuer's current one.
pub async fn update_asset<F>(
    issuer: &Identity,
    vault: &dyn Vault,
    verifier: &dyn ContractVerifier,
    notary: &dyn Notary,
    pointer: &AssetPointer,
    mutate: F,
) -> Result<SignedTransaction>
where
    F: FnOnce(&mut AssetState) + Send,
{
    let current = pointer.resolve(vault)?;
    let mut next = current.state.data.clone();
    mutate(&mut next);
    let builder = TransactionBuilder::new(current.state.notary.clone())
        .add_input(current.reference)
        .add_output(LedgerState::Asset(next))
        .add_command(Command::new(CommandKind::UpdateAsset, vec![issuer.key()]));
    let stx = verify_sign_and_finalize(builder, issuer, vault, verifier, notary).await?;
    tracing::info!(symbol = %pointer.symbol, tx = %stx.id(), "Asset updated");
    Ok(stx)
}

/// Copy `stx` and its backchain from `source` into `target`.
pub fn distribute(stx: &SignedTransaction, source: &dyn Vault, target: &dyn Vault) -> Result<()> {
    for tx in source.history(&stx.id())? {
        target.record(tx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use claimflow_types::{Party, PointerResolver, StateRef};
    use rust_decimal::Decimal;

    use super::*;
    use crate::{contract::ClaimContract, notary::InMemoryNotary, vault::InMemoryVault};

    struct Net {
        issuer: Identity,
        issuer_vault: InMemoryVault,
        holder_vault: InMemoryVault,
        notary: InMemoryNotary,
    }

    fn net() -> Net {
        let issuer = Identity::from_seed("Issuer", [1u8; 32]);
        let issuer_vault = InMemoryVault::new(issuer.party().clone());
        let holder_vault = InMemoryVault::new(Party::new("Holder", claimflow_types::PartyKey([2u8; 32])));
        Net {
            issuer,
            issuer_vault,
            holder_vault,
            notary: InMemoryNotary::new(Identity::from_seed("Notary", [3u8; 32])),
        }
    }

    #[tokio::test]
    async fn issue_then_distribute() {
        let n = net();
        let asset = AssetState::dummy(n.issuer.party().clone(), "ACME", Decimal::new(25, 3));
        let stx = issue_asset(&n.issuer, &n.issuer_vault, &ClaimContract, &n.notary, asset.clone())
            .await
            .unwrap();
        distribute(&stx, &n.issuer_vault, &n.holder_vault).unwrap();

        let at_holder = n.holder_vault.latest_asset(asset.linear_id).unwrap().unwrap();
        assert_eq!(at_holder.reference, StateRef::new(stx.id(), 0));
    }

    #[tokio::test]
    async fn update_leaves_undistributed_copy_stale() {
        let n = net();
        let asset = AssetState::dummy(n.issuer.party().clone(), "ACME", Decimal::new(25, 3));
        let v1 = issue_asset(&n.issuer, &n.issuer_vault, &ClaimContract, &n.notary, asset.clone())
            .await
            .unwrap();
        distribute(&v1, &n.issuer_vault, &n.holder_vault).unwrap();

        let v2 = update_asset(
            &n.issuer,
            &n.issuer_vault,
            &ClaimContract,
            &n.notary,
            &asset.pointer(),
            |a| a.yield_rate = Decimal::new(30, 3),
        )
        .await
        .unwrap();

        let issuer_view = n.issuer_vault.latest_asset(asset.linear_id).unwrap().unwrap();
        let holder_view = n.holder_vault.latest_asset(asset.linear_id).unwrap().unwrap();
        assert_eq!(issuer_view.reference.txhash, v2.id());
        assert_eq!(holder_view.reference.txhash, v1.id());

        distribute(&v2, &n.issuer_vault, &n.holder_vault).unwrap();
        let holder_view = n.holder_vault.latest_asset(asset.linear_id).unwrap().unwrap();
        assert_eq!(holder_view.reference.txhash, v2.id());
    }

    #[tokio::test]
    async fn unknown_currency_rejected_by_contract() {
        let n = net();
        let mut asset = AssetState::dummy(n.issuer.party().clone(), "ACME", Decimal::new(25, 3));
        asset.currency = "XYZ".into();
        let err = issue_asset(&n.issuer, &n.issuer_vault, &ClaimContract, &n.notary, asset)
            .await
            .unwrap_err();
        assert!(matches!(err, claimflow_types::ClaimError::ContractViolation { .. }));
        assert_eq!(n.notary.committed_count().unwrap(), 0);
    }
}
