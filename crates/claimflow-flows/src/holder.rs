//! The holder's side of a claim: the initiating flow.
//!
//! The holder proves which asset version it holds, says how much, and then
//! only countersigns a proposal whose single claim names it as the holder.

use claimflow_types::{
    AssetStateProof, ClaimError, ClaimMessage, ClaimNotification, Party, Result,
    SignedTransaction, TxId, WireTransaction,
};

use crate::{
    finality::{receive_finality, sign_proposal},
    services::NodeServices,
};

/// Check that `tx` carries exactly one claim and that `me` is its holder.
///
/// # Errors
/// Returns [`ClaimError::ClaimOwnershipMismatch`] otherwise.
pub fn check_claim_ownership(tx: &WireTransaction, me: &Party) -> Result<()> {
    match tx.claim_outputs().as_slice() {
        [claim] if &claim.holder == me => Ok(()),
        [claim] => Err(ClaimError::ClaimOwnershipMismatch {
            reason: format!("claim {} names {} as holder, not {me}", claim.linear_id, claim.holder),
        }),
        [] => Err(ClaimError::ClaimOwnershipMismatch {
            reason: format!("{} carries no claim", tx.id),
        }),
        many => Err(ClaimError::ClaimOwnershipMismatch {
            reason: format!("{} carries {} claims", tx.id, many.len()),
        }),
    }
}

/// Claim against the issuer of the asset with `symbol`.
pub struct HolderFlow {
    services: NodeServices,
    symbol: String,
}

impl HolderFlow {
    #[must_use]
    pub fn new(services: NodeServices, symbol: impl Into<String>) -> Self {
        Self {
            services,
            symbol: symbol.into(),
        }
    }

    /// Run the flow to completion and return the finalized transaction id.
    ///
    /// # Errors
    /// - [`ClaimError::UnknownAsset`] / [`ClaimError::UnresolvableReference`]
    ///   if the holder's vault cannot produce the asset
    /// - [`ClaimError::ClaimOwnershipMismatch`] if the proposal pays someone else
    /// - [`ClaimError::CounterpartyAborted`] if the issuer rejects the claim
    /// - any signature, contract, finality or session error on the way
    pub async fn run(self) -> Result<TxId> {
        self.run_to_completion().await.map(|stx| stx.id())
    }

    /// As [`HolderFlow::run`], returning the whole finalized transaction.
    pub async fn run_to_completion(self) -> Result<SignedTransaction> {
        let services = &self.services;
        let me = services.me().clone();

        let pointer = services.vault.query_asset_pointer(&self.symbol)?;
        let held = pointer.resolve(&*services.vault)?;
        let amount = services.vault.holding_amount(&pointer)?;
        let history = services.vault.history(&held.reference.txhash)?;
        let issuer = held.state.data.issuer.clone();

        tracing::info!(
            holder = %me,
            issuer = %issuer,
            symbol = %self.symbol,
            asset_ref = %held.reference,
            holding = %amount,
            "Claim started"
        );

        let mut session = services.network.open_session(&me, &issuer).await?;
        let outcome = async {
            session
                .send(&ClaimMessage::AssetProof(AssetStateProof {
                    state_and_ref: held,
                    history,
                }))
                .await?;
            session
                .send(&ClaimMessage::Notification(ClaimNotification { amount }))
                .await?;

            let signed = sign_proposal(&mut session, services, |proposal| {
                check_claim_ownership(&proposal.tx, &me)
            })
            .await?;
            receive_finality(services, &mut session, signed.id()).await
        }
        .await;

        match &outcome {
            Ok(stx) => tracing::info!(holder = %me, tx = %stx.id(), "Claim finalized"),
            Err(err) => tracing::warn!(holder = %me, symbol = %self.symbol, error = %err, "Claim failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use claimflow_types::{
        Amount, AssetState, ClaimRecord, Command, CommandKind, Identity, LedgerState, LinearId,
        PartyKey, StateRef, TokenType, TransactionBuilder, TxId,
    };
    use rust_decimal::Decimal;

    use super::*;

    fn party(name: &str, b: u8) -> Party {
        Party::new(name, PartyKey([b; 32]))
    }

    fn claim(issuer: &Party, holder: &Party) -> LedgerState {
        LedgerState::Claim(ClaimRecord {
            linear_id: LinearId::new(),
            issuer: issuer.clone(),
            holder: holder.clone(),
            created_at: Utc::now(),
            amount: Amount::new(2, TokenType::new("USD", 2)),
            paid: false,
        })
    }

    fn tx(outputs: Vec<LedgerState>) -> WireTransaction {
        let notary = party("Notary", 3);
        outputs
            .into_iter()
            .fold(TransactionBuilder::new(notary), TransactionBuilder::add_output)
            .add_reference(StateRef::new(TxId([5u8; 32]), 0))
            .add_command(Command::new(CommandKind::CreateClaim, vec![PartyKey([1u8; 32])]))
            .build()
            .unwrap()
    }

    #[test]
    fn own_claim_passes() {
        let (issuer, me) = (party("Issuer", 1), party("Holder", 2));
        check_claim_ownership(&tx(vec![claim(&issuer, &me)]), &me).unwrap();
    }

    #[test]
    fn third_party_claim_rejected() {
        let (issuer, me, other) = (party("Issuer", 1), party("Holder", 2), party("Mallory", 9));
        let err = check_claim_ownership(&tx(vec![claim(&issuer, &other)]), &me).unwrap_err();
        assert!(matches!(err, ClaimError::ClaimOwnershipMismatch { ref reason } if reason.contains("Mallory")));
    }

    #[test]
    fn no_claim_rejected() {
        let issuer = Identity::from_seed("Issuer", [1u8; 32]);
        let asset = AssetState::dummy(issuer.party().clone(), "ACME", Decimal::new(25, 3));
        let err = check_claim_ownership(&tx(vec![LedgerState::Asset(asset)]), &party("Holder", 2))
            .unwrap_err();
        assert!(matches!(err, ClaimError::ClaimOwnershipMismatch { .. }));
    }

    #[test]
    fn two_claims_rejected_even_if_one_is_ours() {
        let (issuer, me, other) = (party("Issuer", 1), party("Holder", 2), party("Mallory", 9));
        let outputs = vec![claim(&issuer, &me), claim(&issuer, &other)];
        let err = check_claim_ownership(&tx(outputs), &me).unwrap_err();
        assert!(matches!(err, ClaimError::ClaimOwnershipMismatch { ref reason } if reason.contains("2 claims")));
    }
}
