//! # claimflow-types
//!
//! Shared types, errors, and configuration for the **claimflow** yield claim
//! protocol.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`LinearId`], [`TxId`], [`StateRef`]
//! - **Parties**: [`Party`], [`PartyKey`], [`Identity`]
//! - **Amounts**: [`Amount`], [`TokenType`]
//! - **Asset model**: [`AssetState`], [`AssetPointer`], [`StateAndRef`], [`TransactionState`]
//! - **Claim model**: [`ClaimRecord`]
//! - **Transactions**: [`TransactionBuilder`], [`WireTransaction`], [`SignedTransaction`], [`Command`]
//! - **Messages**: [`ClaimMessage`], [`ClaimNotification`], [`AssetStateProof`]
//! - **Configuration**: [`FlowConfig`]
//! - **Errors**: [`ClaimError`] with `CF_ERR_` prefix codes
//! - **Constants**: protocol-wide defaults

pub mod amount;
pub mod asset;
pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod message;
pub mod party;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use claimflow_types::{AssetState, ClaimRecord, SignedTransaction, ...};

pub use amount::*;
pub use asset::*;
pub use claim::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use message::*;
pub use party::*;
pub use transaction::*;

// Constants are accessed via `claimflow_types::constants::FOO`
// (not re-exported to avoid name collisions).
