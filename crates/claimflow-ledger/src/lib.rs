//! # claimflow-ledger
//!
//! **Ledger collaborators** consumed by the claim protocol: the per-party
//! vault, the contract verifier, and the finality service (notary).
//!
//! ## Architecture
//!
//! The protocol never reaches for a global ledger. Each flow is handed:
//! 1. a [`Vault`]: its own view of transactions, unconsumed states and holdings
//! 2. a [`ContractVerifier`]: business rules every transaction must satisfy
//! 3. a [`Notary`]: the ordering authority that finalizes transactions
//!
//! In-memory implementations ([`InMemoryVault`], [`ClaimContract`],
//! [`InMemoryNotary`]) back the tests and the demo; production deployments
//! plug in their own.
//!
//! ## Proofs
//!
//! A holder proves an asset state by shipping its backchain;
//! [`backchain::verify_proof`] checks it without trusting the sender.

pub mod asset_ops;
pub mod backchain;
pub mod contract;
pub mod ledger_tx;
pub mod notary;
pub mod uniqueness;
pub mod vault;

pub use backchain::verify_proof;
pub use contract::{ClaimContract, ContractVerifier};
pub use ledger_tx::LedgerTransaction;
pub use notary::{InMemoryNotary, Notary};
pub use uniqueness::{CommitOutcome, UniquenessProvider};
pub use vault::{InMemoryVault, Vault};
