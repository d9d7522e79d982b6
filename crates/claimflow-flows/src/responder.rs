//! Issuer-side accept loop.

use claimflow_types::{Party, Result, SignedTransaction};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::{issuer::IssuerFlow, services::NodeServices, session::SessionInbox};

/// How one issuer run ended.
#[derive(Debug)]
pub struct IssuerOutcome {
    pub holder: Party,
    pub result: Result<SignedTransaction>,
}

/// Running responder: the accept task plus a stream of run outcomes.
pub struct ResponderHandle {
    pub task: JoinHandle<()>,
    pub outcomes: mpsc::Receiver<IssuerOutcome>,
}

impl ResponderHandle {
    /// Next finished run, in completion order.
    pub async fn next_outcome(&mut self) -> Option<IssuerOutcome> {
        self.outcomes.recv().await
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Accept sessions from `inbox` and run one [`IssuerFlow`] task per session.
///
/// Runs are independent: a failing run never affects the others. The loop
/// ends when the network side of the inbox is dropped. At most
/// `outcome_capacity` undrained outcomes are kept; later ones are dropped.
pub fn spawn_responder(services: NodeServices, mut inbox: SessionInbox) -> ResponderHandle {
    let (outcome_tx, outcomes) = mpsc::channel(services.config.outcome_capacity.max(1));
    let task = tokio::spawn(async move {
        tracing::info!(issuer = %inbox.party(), "Responder listening");
        while let Some(session) = inbox.accept().await {
            let services = services.clone();
            let outcome_tx = outcome_tx.clone();
            tokio::spawn(async move {
                let holder = session.counterparty().clone();
                let result = IssuerFlow::new(services, session).run().await;
                // Nobody listening is fine; the run is already logged.
                if let Err(TrySendError::Full(dropped)) =
                    outcome_tx.try_send(IssuerOutcome { holder, result })
                {
                    tracing::warn!(holder = %dropped.holder, "Outcome buffer full, dropping");
                }
            });
        }
        tracing::info!(issuer = %inbox.party(), "Responder stopped");
    });
    ResponderHandle { task, outcomes }
}
