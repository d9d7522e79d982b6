//! # claimflow-flows
//!
//! The two-party claim protocol. A **holder** of an asset asks the asset's
//! **issuer** for a claim computed from the asset's yield rate; both parties
//! sign the resulting transaction and a notary finalizes it.
//!
//! ```text
//!   HolderFlow                          IssuerFlow
//!   ──────────                          ──────────
//!   resolve pointer, holding
//!   open session ───── AssetProof ───▶  verify backchain
//!                ───── Notification ─▶  staleness check
//!                                       compute amount, build, sign
//!   ownership check ◀─ Proposal ─────
//!   contract, sign ─── CounterSig ───▶  finalize with notary
//!   record        ◀─── Finalized ────   record
//! ```
//!
//! Either both parties end with the same finalized transaction or neither
//! records anything. All failures are terminal for the run.
//!
//! Runs are tokio tasks; each owns its [`Session`]. Shared state lives only
//! in the vault and the notary.

pub mod finality;
pub mod holder;
pub mod issuer;
pub mod responder;
pub mod services;
pub mod session;

pub use finality::{collect_signatures, finalize, receive_finality, sign_proposal};
pub use holder::{HolderFlow, check_claim_ownership};
pub use issuer::{IssuerFlow, check_freshness, compute_claim_amount};
pub use responder::{IssuerOutcome, ResponderHandle, spawn_responder};
pub use services::NodeServices;
pub use session::{MemoryNetwork, Session, SessionInbox};
