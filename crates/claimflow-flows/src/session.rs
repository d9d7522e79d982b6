//! Point-to-point sessions between two parties.
//!
//! A [`Session`] is one end of a typed channel pair. Frames are JSON-encoded
//! [`ClaimMessage`]s, so whatever arrives is decoded from bytes and checked
//! before anything trusts it. The [`MemoryNetwork`] routes new sessions to
//! the inbox a party registered, the way a transport would route an
//! authenticated connection.

use std::{collections::HashMap, sync::Arc, time::Duration};

use claimflow_types::{
    AssetStateProof, ClaimError, ClaimMessage, ClaimNotification, FlowConfig, Party, PartyKey,
    Result, SignedTransaction, TransactionSignature, constants,
};
use tokio::sync::{RwLock, mpsc};

/// One end of an ordered, authenticated channel to a single counterparty.
pub struct Session {
    local: Party,
    counterparty: Party,
    outbound: mpsc::Sender<Vec<u8>>,
    inbound: mpsc::Receiver<Vec<u8>>,
    timeout: Duration,
}

impl Session {
    /// Two connected ends: the first belongs to `a`, the second to `b`.
    #[must_use]
    pub fn pair(a: Party, b: Party, config: &FlowConfig) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(config.channel_capacity);
        let (b_tx, a_rx) = mpsc::channel(config.channel_capacity);
        let timeout = config.session_timeout();
        (
            Self {
                local: a.clone(),
                counterparty: b.clone(),
                outbound: a_tx,
                inbound: a_rx,
                timeout,
            },
            Self {
                local: b,
                counterparty: a,
                outbound: b_tx,
                inbound: b_rx,
                timeout,
            },
        )
    }

    #[must_use]
    pub fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    #[must_use]
    pub fn local(&self) -> &Party {
        &self.local
    }

    /// Send one frame.
    ///
    /// # Errors
    /// Returns [`ClaimError::SessionError`] if the counterparty has gone.
    pub async fn send(&self, msg: &ClaimMessage) -> Result<()> {
        let frame = msg.to_bytes()?;
        tracing::debug!(
            from = %self.local,
            to = %self.counterparty,
            kind = msg.kind(),
            bytes = frame.len(),
            "Session send"
        );
        self.outbound
            .send(frame)
            .await
            .map_err(|_| ClaimError::SessionError {
                reason: format!("{} closed the session", self.counterparty),
            })
    }

    /// Best-effort `Reject`; the counterparty may already have left.
    pub async fn reject(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.send(&ClaimMessage::Reject { reason }).await.is_err() {
            tracing::debug!(to = %self.counterparty, "Reject not delivered: session closed");
        }
    }

    /// Next frame, waiting at most the configured session timeout.
    pub async fn receive(&mut self, waiting_for: &'static str) -> Result<ClaimMessage> {
        let timeout = self.timeout;
        self.receive_within(waiting_for, timeout).await
    }

    /// Next frame, waiting at most `timeout`.
    ///
    /// # Errors
    /// - [`ClaimError::SessionTimeout`] if nothing arrives in time
    /// - [`ClaimError::SessionError`] if the channel closed
    /// - [`ClaimError::Serialization`] if the frame does not decode
    pub async fn receive_within(
        &mut self,
        waiting_for: &'static str,
        timeout: Duration,
    ) -> Result<ClaimMessage> {
        let frame = tokio::time::timeout(timeout, self.inbound.recv())
            .await
            .map_err(|_| ClaimError::SessionTimeout {
                waiting_for,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .ok_or_else(|| ClaimError::SessionError {
                reason: format!(
                    "{} closed the session while we waited for {waiting_for}",
                    self.counterparty
                ),
            })?;
        let msg = ClaimMessage::from_bytes(&frame)?;
        tracing::debug!(
            at = %self.local,
            from = %self.counterparty,
            kind = msg.kind(),
            "Session receive"
        );
        Ok(msg)
    }

    pub async fn receive_proof(&mut self) -> Result<AssetStateProof> {
        match self.receive("AssetProof").await? {
            ClaimMessage::AssetProof(proof) => Ok(proof),
            other => Err(unexpected("AssetProof", other)),
        }
    }

    pub async fn receive_notification(&mut self) -> Result<ClaimNotification> {
        match self.receive("Notification").await? {
            ClaimMessage::Notification(notification) => Ok(notification),
            other => Err(unexpected("Notification", other)),
        }
    }

    pub async fn receive_proposal(&mut self) -> Result<SignedTransaction> {
        match self.receive("Proposal").await? {
            ClaimMessage::Proposal(stx) => Ok(stx),
            other => Err(unexpected("Proposal", other)),
        }
    }

    pub async fn receive_counter_signature(&mut self) -> Result<TransactionSignature> {
        match self.receive("CounterSignature").await? {
            ClaimMessage::CounterSignature(sig) => Ok(sig),
            other => Err(unexpected("CounterSignature", other)),
        }
    }

    pub async fn receive_finalized(&mut self, timeout: Duration) -> Result<SignedTransaction> {
        match self.receive_within("Finalized", timeout).await? {
            ClaimMessage::Finalized(stx) => Ok(stx),
            other => Err(unexpected("Finalized", other)),
        }
    }
}

/// A `Reject` ends the run with the counterparty's reason; anything else
/// out of order is a protocol violation.
fn unexpected(expected: &'static str, actual: ClaimMessage) -> ClaimError {
    match actual {
        ClaimMessage::Reject { reason } => ClaimError::CounterpartyAborted { reason },
        other => ClaimError::UnexpectedMessage {
            expected,
            actual: other.kind(),
        },
    }
}

// ---------------------------------------------------------------------------
// MemoryNetwork
// ---------------------------------------------------------------------------

/// Sessions opened towards a registered party, waiting to be accepted.
pub struct SessionInbox {
    party: Party,
    sessions: mpsc::Receiver<Session>,
}

impl SessionInbox {
    #[must_use]
    pub fn party(&self) -> &Party {
        &self.party
    }

    /// Next incoming session, or `None` once the network is dropped.
    pub async fn accept(&mut self) -> Option<Session> {
        self.sessions.recv().await
    }
}

/// In-process transport connecting registered parties.
#[derive(Clone)]
pub struct MemoryNetwork {
    endpoints: Arc<RwLock<HashMap<PartyKey, mpsc::Sender<Session>>>>,
    config: FlowConfig,
}

impl MemoryNetwork {
    #[must_use]
    pub fn new(config: FlowConfig) -> Self {
        Self {
            endpoints: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Register `party` as reachable; sessions opened to it land in the
    /// returned inbox. Registering again replaces the previous inbox.
    pub async fn register(&self, party: &Party) -> SessionInbox {
        let (tx, rx) = mpsc::channel(constants::DEFAULT_INBOX_CAPACITY);
        self.endpoints.write().await.insert(party.owning_key, tx);
        SessionInbox {
            party: party.clone(),
            sessions: rx,
        }
    }

    /// Open a session from `from` to `to`.
    ///
    /// # Errors
    /// - [`ClaimError::UnknownParty`] if `to` never registered
    /// - [`ClaimError::SessionError`] if `to` stopped accepting sessions
    pub async fn open_session(&self, from: &Party, to: &Party) -> Result<Session> {
        let endpoint = self
            .endpoints
            .read()
            .await
            .get(&to.owning_key)
            .cloned()
            .ok_or(ClaimError::UnknownParty(to.owning_key))?;
        let (ours, theirs) = Session::pair(from.clone(), to.clone(), &self.config);
        endpoint
            .send(theirs)
            .await
            .map_err(|_| ClaimError::SessionError {
                reason: format!("{to} is not accepting sessions"),
            })?;
        tracing::debug!(from = %from, to = %to, "Session opened");
        Ok(ours)
    }
}

#[cfg(test)]
mod tests {
    use claimflow_types::{Amount, Identity, TokenType};

    use super::*;

    fn parties() -> (Party, Party) {
        (
            Identity::from_seed("Holder", [2u8; 32]).party().clone(),
            Identity::from_seed("Issuer", [1u8; 32]).party().clone(),
        )
    }

    fn notification() -> ClaimMessage {
        ClaimMessage::Notification(ClaimNotification {
            amount: Amount::new(100, TokenType::new("ACME", 0)),
        })
    }

    #[tokio::test]
    async fn pair_delivers_in_order() {
        let (h, i) = parties();
        let (a, mut b) = Session::pair(h.clone(), i, &FlowConfig::default());
        a.send(&notification()).await.unwrap();
        a.reject("done").await;

        assert_eq!(b.counterparty(), &h);
        assert!(b.receive_notification().await.is_ok());
        let err = b.receive_proposal().await.unwrap_err();
        assert!(matches!(err, ClaimError::CounterpartyAborted { ref reason } if reason == "done"));
    }

    #[tokio::test]
    async fn out_of_order_message_is_unexpected() {
        let (h, i) = parties();
        let (a, mut b) = Session::pair(h, i, &FlowConfig::default());
        a.send(&notification()).await.unwrap();
        let err = b.receive_proof().await.unwrap_err();
        assert!(matches!(
            err,
            ClaimError::UnexpectedMessage { expected: "AssetProof", actual: "Notification" }
        ));
    }

    #[tokio::test]
    async fn dropped_counterparty_is_session_error() {
        let (h, i) = parties();
        let (a, mut b) = Session::pair(h, i, &FlowConfig::default());
        drop(a);
        let err = b.receive_notification().await.unwrap_err();
        assert!(matches!(err, ClaimError::SessionError { .. }));
    }

    #[tokio::test]
    async fn silent_counterparty_times_out() {
        let (h, i) = parties();
        let config = FlowConfig {
            session_timeout_ms: 20,
            ..FlowConfig::default()
        };
        let (_a, mut b) = Session::pair(h, i, &config);
        let err = b.receive_notification().await.unwrap_err();
        assert!(matches!(
            err,
            ClaimError::SessionTimeout { waiting_for: "Notification", timeout_ms: 20 }
        ));
    }

    #[tokio::test]
    async fn network_routes_to_registered_party() {
        let (h, i) = parties();
        let net = MemoryNetwork::new(FlowConfig::default());
        let mut inbox = net.register(&i).await;

        let ours = net.open_session(&h, &i).await.unwrap();
        ours.send(&notification()).await.unwrap();

        let mut theirs = inbox.accept().await.unwrap();
        assert_eq!(theirs.counterparty(), &h);
        assert_eq!(theirs.local(), &i);
        assert!(theirs.receive_notification().await.is_ok());
    }

    #[tokio::test]
    async fn unknown_party_cannot_be_reached() {
        let (h, i) = parties();
        let net = MemoryNetwork::new(FlowConfig::default());
        let err = net.open_session(&h, &i).await.err().unwrap();
        assert!(matches!(err, ClaimError::UnknownParty(k) if k == i.owning_key));
    }
}
