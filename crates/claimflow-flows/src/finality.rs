//! Signature collection and finality.
//!
//! Two halves per step:
//!
//! | Step       | Proposer               | Counterparty        |
//! |------------|------------------------|---------------------|
//! | signatures | [`collect_signatures`] | [`sign_proposal`]   |
//! | finality   | [`finalize`]           | [`receive_finality`] |
//!
//! Every failure here is terminal for the run. Nothing is retried.

use claimflow_types::{
    ClaimError, ClaimMessage, PartyKey, Result, SignedTransaction, TransactionSignature, TxId,
};

use crate::{services::NodeServices, session::Session};

/// Send the partially signed `ptx` and wait for the counterparty's
/// signature.
///
/// # Errors
/// [`ClaimError::SignatureRejected`] if the counterparty rejects or answers
/// with a signature that is not its own or does not verify.
pub async fn collect_signatures(
    session: &mut Session,
    ptx: SignedTransaction,
) -> Result<SignedTransaction> {
    let counterparty = session.counterparty().owning_key;
    ptx.verify_signatures_except(&[counterparty])?;
    session.send(&ClaimMessage::Proposal(ptx.clone())).await?;

    let sig = match session.receive_counter_signature().await {
        Ok(sig) => sig,
        Err(ClaimError::CounterpartyAborted { reason }) => {
            return Err(ClaimError::SignatureRejected { reason });
        }
        Err(err) => return Err(err),
    };
    if sig.by != counterparty {
        return Err(ClaimError::SignatureRejected {
            reason: format!("expected a signature by {}, got one by {}", counterparty, sig.by),
        });
    }

    let stx = ptx
        .with_signature(sig)
        .map_err(|e| ClaimError::SignatureRejected {
            reason: e.to_string(),
        })?;
    stx.verify_required_signatures()?;
    tracing::debug!(tx = %stx.id(), by = %session.counterparty(), "Counter-signature collected");
    Ok(stx)
}

/// Receive a proposal, vet it, and sign it.
///
/// `check` runs after the proposer's signature is verified and before the
/// contract. Any failure sends `Reject` and returns without signing.
pub async fn sign_proposal<F>(
    session: &mut Session,
    services: &NodeServices,
    check: F,
) -> Result<SignedTransaction>
where
    F: FnOnce(&SignedTransaction) -> Result<()>,
{
    let proposal = session.receive_proposal().await?;
    let proposer = session.counterparty().owning_key;

    if let Err(err) = vet_proposal(services, &proposal, proposer, check) {
        tracing::warn!(
            tx = %proposal.id(),
            from = %session.counterparty(),
            error = %err,
            "Proposal rejected"
        );
        session.reject(err.to_string()).await;
        return Err(err);
    }

    let sig = services.identity.sign(&proposal.id());
    session
        .send(&ClaimMessage::CounterSignature(sig.clone()))
        .await?;
    tracing::debug!(tx = %proposal.id(), "Proposal signed");
    proposal.with_signature(sig)
}

fn vet_proposal<F>(
    services: &NodeServices,
    proposal: &SignedTransaction,
    proposer: PartyKey,
    check: F,
) -> Result<()>
where
    F: FnOnce(&SignedTransaction) -> Result<()>,
{
    proposal.tx.verify_id()?;
    let proposer_sig = proposal
        .sigs
        .iter()
        .find(|s| s.by == proposer)
        .ok_or_else(|| ClaimError::SignatureRejected {
            reason: format!("{} is not signed by its proposer", proposal.id()),
        })?;
    proposer_sig.verify(&proposal.id())?;

    check(proposal)?;

    proposal.verify_signatures_except(&[services.identity.key()])?;
    services.verify_transaction(&proposal.tx)
}

/// Have the notary finalize `stx`, record it, and hand it to the
/// counterparty.
///
/// # Errors
/// - [`ClaimError::Configuration`] if this node has no route to the
///   transaction's notary
/// - [`ClaimError::FinalityTimeout`] if the notary does not answer within
///   `finality_timeout_ms`
/// - [`ClaimError::FinalityConflict`] if the notary refuses
pub async fn finalize(
    services: &NodeServices,
    session: &mut Session,
    stx: SignedTransaction,
) -> Result<SignedTransaction> {
    if services.notary.party() != stx.notary() {
        return Err(ClaimError::Configuration(format!(
            "{} requires notary {}, this node uses {}",
            stx.id(),
            stx.notary(),
            services.notary.party()
        )));
    }

    let timeout = services.config.finality_timeout();
    let notary_sig: TransactionSignature =
        tokio::time::timeout(timeout, services.notary.finalize(&stx))
            .await
            .map_err(|_| ClaimError::FinalityTimeout {
                timeout_ms: services.config.finality_timeout_ms,
            })??;

    let finalized = stx.with_signature(notary_sig)?;
    finalized.verify_finalized()?;
    services.vault.record(finalized.clone())?;
    session
        .send(&ClaimMessage::Finalized(finalized.clone()))
        .await?;
    tracing::info!(
        tx = %finalized.id(),
        notary = %finalized.notary(),
        "Transaction finalized and distributed"
    );
    Ok(finalized)
}

/// Wait for the proposer to distribute the finalized `expected` transaction,
/// then record it.
///
/// The wait covers the proposer's own notary call, so it is the session
/// timeout plus the finality timeout.
///
/// # Errors
/// - [`ClaimError::FinalityTimeout`] if nothing arrives in time
/// - [`ClaimError::FinalityMismatch`] if a different transaction arrives
/// - [`ClaimError::CounterpartyAborted`] if the proposer gave up
pub async fn receive_finality(
    services: &NodeServices,
    session: &mut Session,
    expected: TxId,
) -> Result<SignedTransaction> {
    let config = &services.config;
    let wait = config.session_timeout() + config.finality_timeout();
    let stx = match session.receive_finalized(wait).await {
        Ok(stx) => stx,
        Err(ClaimError::SessionTimeout { timeout_ms, .. }) => {
            return Err(ClaimError::FinalityTimeout { timeout_ms });
        }
        Err(err) => return Err(err),
    };

    if stx.id() != expected {
        return Err(ClaimError::FinalityMismatch {
            signed: expected,
            received: stx.id(),
        });
    }
    stx.verify_finalized()?;
    services.vault.record(stx.clone())?;
    tracing::debug!(tx = %stx.id(), "Finalized transaction recorded");
    Ok(stx)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use claimflow_ledger::{InMemoryNotary, InMemoryVault, Notary};
    use claimflow_types::{
        AssetState, Command, CommandKind, FlowConfig, Identity, LedgerState, Party,
        TransactionBuilder,
    };
    use rust_decimal::Decimal;

    use super::*;
    use crate::session::MemoryNetwork;

    /// Never answers.
    struct SilentNotary(Party);

    #[async_trait]
    impl Notary for SilentNotary {
        fn party(&self) -> &Party {
            &self.0
        }

        async fn finalize(&self, _stx: &SignedTransaction) -> Result<TransactionSignature> {
            std::future::pending().await
        }
    }

    fn config() -> FlowConfig {
        FlowConfig {
            session_timeout_ms: 500,
            finality_timeout_ms: 50,
            ..FlowConfig::default()
        }
    }

    fn services(identity: Identity, notary: Arc<dyn Notary>) -> NodeServices {
        let vault = Arc::new(InMemoryVault::new(identity.party().clone()));
        NodeServices::new(identity, vault, notary, MemoryNetwork::new(config()), config())
    }

    /// Asset issuance signed by the issuer only: no holder signature needed.
    fn issue_tx(issuer: &Identity, notary: &Party) -> SignedTransaction {
        let asset = AssetState::dummy(issuer.party().clone(), "ACME", Decimal::new(25, 3));
        TransactionBuilder::new(notary.clone())
            .add_output(LedgerState::Asset(asset))
            .add_command(Command::new(CommandKind::IssueAsset, vec![issuer.key()]))
            .sign_initial(issuer)
            .unwrap()
    }

    #[tokio::test]
    async fn finalize_then_receive() {
        let notary: Arc<dyn Notary> =
            Arc::new(InMemoryNotary::new(Identity::from_seed("Notary", [3u8; 32])));
        let issuer = services(Identity::from_seed("Issuer", [1u8; 32]), notary.clone());
        let holder = services(Identity::from_seed("Holder", [2u8; 32]), notary.clone());
        let (mut a, mut b) = Session::pair(issuer.me().clone(), holder.me().clone(), &config());

        let stx = issue_tx(&issuer.identity, notary.party());
        let id = stx.id();
        let (sent, received) = tokio::join!(
            finalize(&issuer, &mut a, stx),
            receive_finality(&holder, &mut b, id)
        );
        assert_eq!(sent.unwrap().id(), id);
        assert_eq!(received.unwrap().id(), id);
        assert!(issuer.vault.transaction(&id).unwrap().is_some());
        assert!(holder.vault.transaction(&id).unwrap().is_some());
    }

    #[tokio::test]
    async fn silent_notary_times_out() {
        let notary_party = Identity::from_seed("Notary", [3u8; 32]).party().clone();
        let notary: Arc<dyn Notary> = Arc::new(SilentNotary(notary_party.clone()));
        let issuer = services(Identity::from_seed("Issuer", [1u8; 32]), notary);
        let holder = Identity::from_seed("Holder", [2u8; 32]).party().clone();
        let (mut a, _b) = Session::pair(issuer.me().clone(), holder, &config());

        let stx = issue_tx(&issuer.identity, &notary_party);
        let id = stx.id();
        let err = finalize(&issuer, &mut a, stx).await.unwrap_err();
        assert!(matches!(err, ClaimError::FinalityTimeout { timeout_ms: 50 }));
        assert!(issuer.vault.transaction(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_notary_route_is_configuration_error() {
        let notary: Arc<dyn Notary> =
            Arc::new(InMemoryNotary::new(Identity::from_seed("Notary", [3u8; 32])));
        let issuer = services(Identity::from_seed("Issuer", [1u8; 32]), notary);
        let other = Identity::from_seed("Other", [4u8; 32]).party().clone();
        let (mut a, _b) = Session::pair(issuer.me().clone(), other.clone(), &config());

        let stx = issue_tx(&issuer.identity, &other);
        let err = finalize(&issuer, &mut a, stx).await.unwrap_err();
        assert!(matches!(err, ClaimError::Configuration(_)));
    }

    #[tokio::test]
    async fn rejected_proposal_is_signature_rejected() {
        let notary: Arc<dyn Notary> =
            Arc::new(InMemoryNotary::new(Identity::from_seed("Notary", [3u8; 32])));
        let issuer = services(Identity::from_seed("Issuer", [1u8; 32]), notary.clone());
        let holder = services(Identity::from_seed("Holder", [2u8; 32]), notary.clone());
        let (mut a, mut b) = Session::pair(issuer.me().clone(), holder.me().clone(), &config());

        let ptx = issue_tx(&issuer.identity, notary.party());
        let (collected, signed) = tokio::join!(
            collect_signatures(&mut a, ptx),
            sign_proposal(&mut b, &holder, |_| Err(ClaimError::InvalidClaim {
                reason: "not today".into()
            }))
        );
        assert!(matches!(signed.unwrap_err(), ClaimError::InvalidClaim { .. }));
        assert!(
            matches!(collected.unwrap_err(), ClaimError::SignatureRejected { ref reason } if reason.contains("not today"))
        );
    }

    #[tokio::test]
    async fn foreign_counter_signature_rejected() {
        let notary: Arc<dyn Notary> =
            Arc::new(InMemoryNotary::new(Identity::from_seed("Notary", [3u8; 32])));
        let issuer = services(Identity::from_seed("Issuer", [1u8; 32]), notary.clone());
        let holder = Identity::from_seed("Holder", [2u8; 32]);
        let intruder = Identity::from_seed("Intruder", [9u8; 32]);
        let (mut a, mut b) = Session::pair(issuer.me().clone(), holder.party().clone(), &config());

        let ptx = issue_tx(&issuer.identity, notary.party());
        let id = ptx.id();
        let answer = async move {
            b.receive_proposal().await.unwrap();
            b.send(&ClaimMessage::CounterSignature(intruder.sign(&id)))
                .await
                .unwrap();
        };
        let (collected, ()) = tokio::join!(collect_signatures(&mut a, ptx), answer);
        assert!(matches!(collected.unwrap_err(), ClaimError::SignatureRejected { .. }));
    }

    #[tokio::test]
    async fn finalized_with_other_id_is_mismatch() {
        let notary_identity = Identity::from_seed("Notary", [3u8; 32]);
        let notary: Arc<dyn Notary> =
            Arc::new(InMemoryNotary::new(Identity::from_seed("Notary", [3u8; 32])));
        let holder = services(Identity::from_seed("Holder", [2u8; 32]), notary.clone());
        let issuer = Identity::from_seed("Issuer", [1u8; 32]);
        let (a, mut b) = Session::pair(issuer.party().clone(), holder.me().clone(), &config());

        let stx = issue_tx(&issuer, notary.party());
        let finalized = stx.clone().with_signature(notary_identity.sign(&stx.id())).unwrap();
        a.send(&ClaimMessage::Finalized(finalized)).await.unwrap();

        let expected = TxId([7u8; 32]);
        let err = receive_finality(&holder, &mut b, expected).await.unwrap_err();
        assert!(matches!(err, ClaimError::FinalityMismatch { signed, .. } if signed == expected));
    }
}
