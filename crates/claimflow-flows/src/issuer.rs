//! The issuer's side of a claim: the responding flow.
//!
//! ```text
//! AssetProof ─▶ verify backchain ─▶ resolve own pointer
//!                                         │
//! Notification ─────────────────▶ same txhash? ──no──▶ StaleAssetState
//!                                         │ yes
//!                            amount = trunc(quantity × yield)
//!                                         │
//!                   build ─▶ contract ─▶ sign ─▶ collect ─▶ finalize
//! ```
//!
//! Any failure after the session opens is reported to the holder with a
//! `Reject` before the flow returns.

use claimflow_ledger::verify_proof;
use claimflow_types::{
    Amount, AssetState, ClaimError, ClaimRecord, Command, CommandKind, LedgerState, Result,
    SignedTransaction, StateAndRef, TokenType, TransactionBuilder,
};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    finality::{collect_signatures, finalize},
    services::NodeServices,
    session::Session,
};

/// Claim owed for `held` units of `asset`: `trunc(quantity × yield_rate)`
/// minor units of the asset's settlement currency.
///
/// # Errors
/// - [`ClaimError::InvalidClaim`] if `held` is not denominated in the asset's
///   token (code and fraction digits) or the product does not fit an `i64`
/// - [`ClaimError::UnknownCurrency`] for an unrecognised settlement currency
pub fn compute_claim_amount(held: &Amount, asset: &AssetState) -> Result<Amount> {
    let unit = asset.token_type();
    if held.token != unit {
        return Err(ClaimError::InvalidClaim {
            reason: format!(
                "holding is in {}/{}, asset is {}/{}",
                held.token.code, held.token.fraction_digits, unit.code, unit.fraction_digits
            ),
        });
    }
    let currency = TokenType::currency(&asset.currency)?;
    let quantity = Decimal::from(held.quantity)
        .checked_mul(asset.yield_rate)
        .map(|product| product.trunc())
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| ClaimError::InvalidClaim {
            reason: format!(
                "{} × {} overflows the claim amount",
                held.quantity, asset.yield_rate
            ),
        })?;
    Ok(Amount::new(quantity, currency))
}

/// The supplied asset state must be the one the issuer currently has.
///
/// # Errors
/// Returns [`ClaimError::StaleAssetState`] on any difference in `txhash`.
pub fn check_freshness(
    supplied: &StateAndRef<AssetState>,
    current: &StateAndRef<AssetState>,
) -> Result<()> {
    if supplied.reference.txhash == current.reference.txhash {
        Ok(())
    } else {
        Err(ClaimError::StaleAssetState {
            supplied: supplied.reference,
            current: current.reference,
        })
    }
}

/// Answer one holder's claim on an accepted session.
pub struct IssuerFlow {
    services: NodeServices,
    session: Session,
}

impl IssuerFlow {
    #[must_use]
    pub fn new(services: NodeServices, session: Session) -> Self {
        Self { services, session }
    }

    /// Run to completion, returning the finalized claim transaction.
    ///
    /// # Errors
    /// - [`ClaimError::InvalidAssetProof`] if the backchain does not verify
    /// - [`ClaimError::StaleAssetState`] if the holder's view is outdated
    /// - [`ClaimError::ContractViolation`] if the claim breaks a contract rule
    /// - [`ClaimError::SignatureRejected`] if the holder refuses to sign
    /// - [`ClaimError::FinalityConflict`] / [`ClaimError::FinalityTimeout`]
    ///   from the notary
    pub async fn run(mut self) -> Result<SignedTransaction> {
        let holder = self.session.counterparty().clone();
        let outcome = self.respond().await;
        match &outcome {
            Ok(stx) => tracing::info!(
                issuer = %self.services.me(),
                holder = %holder,
                tx = %stx.id(),
                "Claim issued"
            ),
            Err(err) => {
                tracing::warn!(holder = %holder, error = %err, "Claim refused");
                self.session.reject(err.to_string()).await;
            }
        }
        outcome
    }

    async fn respond(&mut self) -> Result<SignedTransaction> {
        let services = &self.services;
        let session = &mut self.session;
        let me = services.me().clone();
        let holder = session.counterparty().clone();

        let proof = session.receive_proof().await?;
        let supplied = verify_proof(&proof, &*services.verifier)?;
        let pointer = services
            .vault
            .query_asset_pointer(&supplied.state.data.symbol)?;
        let current = pointer.resolve(&*services.vault)?;

        let notification = session.receive_notification().await?;
        check_freshness(&supplied, &current)?;

        let asset = &current.state.data;
        let amount = compute_claim_amount(&notification.amount, asset)?;
        tracing::debug!(
            holder = %holder,
            holding = %notification.amount,
            yield_rate = %asset.yield_rate,
            claim = %amount,
            "Claim amount computed"
        );

        let claim = ClaimRecord::new(me.clone(), holder.clone(), amount);
        let signers = vec![me.owning_key, holder.owning_key];
        let tx = TransactionBuilder::new(supplied.state.notary.clone())
            .add_reference(current.reference)
            .add_output(LedgerState::Claim(claim))
            .add_command(Command::new(CommandKind::CreateClaim, signers))
            .build()?;
        services.verify_transaction(&tx)?;
        let ptx = SignedTransaction::signed_by(tx, &services.identity);

        let stx = collect_signatures(session, ptx).await?;
        finalize(services, session, stx).await
    }
}
