//! Contract rules every claimflow transaction must satisfy.
//!
//! The issuer runs these before asking anyone to sign; the holder runs them
//! again on the proposal it receives, and the backchain check runs them on
//! every transaction of a proof.

use claimflow_types::{AssetState, ClaimError, ClaimRecord, CommandKind, PartyKey, Result, TokenType};
use rust_decimal::Decimal;

use crate::ledger_tx::LedgerTransaction;

/// Rule-verification engine.
pub trait ContractVerifier: Send + Sync {
    /// # Errors
    /// Returns [`ClaimError::ContractViolation`] naming the first broken rule.
    fn verify(&self, tx: &LedgerTransaction) -> Result<()>;
}

fn require(condition: bool, reason: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ClaimError::contract(reason))
    }
}

/// The asset and claim contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimContract;

impl ClaimContract {
    fn verify_create_claim(tx: &LedgerTransaction, signers: &[PartyKey]) -> Result<()> {
        require(tx.inputs.is_empty(), "no inputs should be consumed when creating a claim")?;
        require(tx.outputs.len() == 1, "exactly one output should be created")?;
        let claim: &ClaimRecord = tx.outputs[0]
            .data
            .as_claim()
            .ok_or_else(|| ClaimError::contract("the output must be a claim"))?;
        require(tx.references.len() == 1, "exactly one asset reference is required")?;
        let asset: &AssetState = tx.references[0]
            .state
            .data
            .as_asset()
            .ok_or_else(|| ClaimError::contract("the reference must be an asset state"))?;

        require(
            asset.issuer == claim.issuer,
            "the claim must be issued by the asset issuer",
        )?;
        require(claim.issuer != claim.holder, "issuer and holder cannot be the same party")?;
        require(
            claim.amount.token.code == asset.currency,
            "the claim must settle in the asset's currency",
        )?;
        require(!claim.paid, "a new claim cannot already be paid")?;
        require(claim.amount.is_positive(), "the claim amount must be positive")?;
        require(
            signers.contains(&claim.issuer.owning_key),
            "the issuer must sign",
        )?;
        require(
            signers.contains(&claim.holder.owning_key),
            "the holder must sign",
        )?;
        Ok(())
    }

    fn verify_asset_output(tx: &LedgerTransaction, signers: &[PartyKey]) -> Result<AssetState> {
        require(tx.outputs.len() == 1, "exactly one asset output should be created")?;
        let asset = tx.outputs[0]
            .data
            .as_asset()
            .ok_or_else(|| ClaimError::contract("the output must be an asset state"))?;
        require(
            signers.contains(&asset.issuer.owning_key),
            "the asset issuer must sign",
        )?;
        require(asset.yield_rate >= Decimal::ZERO, "yield rate cannot be negative")?;
        require(
            asset.token_type().is_representable(),
            "the asset declares too many fraction digits",
        )?;
        TokenType::currency(&asset.currency)
            .map_err(|_| ClaimError::contract("the settlement currency must be known"))?;
        Ok(asset.clone())
    }

    fn verify_issue_asset(tx: &LedgerTransaction, signers: &[PartyKey]) -> Result<()> {
        require(tx.inputs.is_empty(), "issuing an asset consumes nothing")?;
        Self::verify_asset_output(tx, signers)?;
        Ok(())
    }

    fn verify_update_asset(tx: &LedgerTransaction, signers: &[PartyKey]) -> Result<()> {
        require(tx.inputs.len() == 1, "an update consumes exactly one prior version")?;
        let prev = tx.inputs[0]
            .state
            .data
            .as_asset()
            .ok_or_else(|| ClaimError::contract("the input must be an asset state"))?;
        let next = Self::verify_asset_output(tx, signers)?;
        require(prev.linear_id == next.linear_id, "an update keeps the linear id")?;
        require(prev.symbol == next.symbol, "an update keeps the symbol")?;
        require(prev.issuer == next.issuer, "an update keeps the issuer")?;
        Ok(())
    }
}

impl ContractVerifier for ClaimContract {
    fn verify(&self, tx: &LedgerTransaction) -> Result<()> {
        require(tx.commands.len() == 1, "exactly one command is required")?;
        let command = &tx.commands[0];
        match command.kind {
            CommandKind::CreateClaim => Self::verify_create_claim(tx, &command.signers),
            CommandKind::IssueAsset => Self::verify_issue_asset(tx, &command.signers),
            CommandKind::UpdateAsset => Self::verify_update_asset(tx, &command.signers),
        }?;
        for output in &tx.outputs {
            require(
                output.notary == tx.notary,
                "outputs must be governed by the transaction notary",
            )?;
        }
        tracing::debug!(tx = %tx.id, command = %command.kind, "Contract verified");
        Ok(())
    }
}
