//! Everything a flow needs from its node.

use std::sync::Arc;

use claimflow_ledger::{ClaimContract, ContractVerifier, Notary, Vault};
use claimflow_types::{FlowConfig, Identity, Party, Result, WireTransaction};

use crate::session::MemoryNetwork;

/// Handles to the node-local services a flow runs against.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct NodeServices {
    pub identity: Arc<Identity>,
    pub vault: Arc<dyn Vault>,
    pub verifier: Arc<dyn ContractVerifier>,
    pub notary: Arc<dyn Notary>,
    pub network: MemoryNetwork,
    pub config: FlowConfig,
}

impl NodeServices {
    /// Services verifying with [`ClaimContract`].
    #[must_use]
    pub fn new(
        identity: Identity,
        vault: Arc<dyn Vault>,
        notary: Arc<dyn Notary>,
        network: MemoryNetwork,
        config: FlowConfig,
    ) -> Self {
        Self {
            identity: Arc::new(identity),
            vault,
            verifier: Arc::new(ClaimContract),
            notary,
            network,
            config,
        }
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn ContractVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_notary(mut self, notary: Arc<dyn Notary>) -> Self {
        self.notary = notary;
        self
    }

    #[must_use]
    pub fn me(&self) -> &Party {
        self.identity.party()
    }

    /// Resolve `tx` against this node's vault and run the contract.
    ///
    /// # Errors
    /// [`claimflow_types::ClaimError::UnresolvableReference`] for states the
    /// vault has never seen, [`claimflow_types::ClaimError::ContractViolation`]
    /// for rule failures.
    pub fn verify_transaction(&self, tx: &WireTransaction) -> Result<()> {
        let ltx = self.vault.to_ledger_transaction(tx)?;
        self.verifier.verify(&ltx)
    }
}
