//! The claim record: a payable obligation of the issuer to the holder.
//!
//! ## Lifecycle
//!
//! ```text
//!   issuer builds ──▶ transaction output ──▶ notarised ──▶ durable
//!        │                                       ✗
//!        └──────────── run aborts ──────▶ discarded, never durable
//! ```
//!
//! A claim is created exactly once per successful protocol run. Paying it
//! (flipping `paid`) is a separate business operation outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, LinearId, Party};

/// A claim against the issuer, created by a successful protocol run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Unique identifier of this claim.
    pub linear_id: LinearId,
    /// The party that owes the amount.
    pub issuer: Party,
    /// The party entitled to the amount.
    pub holder: Party,
    /// When the issuer created the claim.
    pub created_at: DateTime<Utc>,
    /// Amount owed, in minor units of the settlement currency.
    pub amount: Amount,
    /// Whether the claim has been settled. Always `false` at creation.
    pub paid: bool,
}

impl ClaimRecord {
    /// A fresh, unpaid claim stamped with a new id and the current time.
    #[must_use]
    pub fn new(issuer: Party, holder: Party, amount: Amount) -> Self {
        Self {
            linear_id: LinearId::new(),
            issuer,
            holder,
            created_at: Utc::now(),
            amount,
            paid: false,
        }
    }

    /// Both parties must sign the transaction that creates this claim.
    #[must_use]
    pub fn participants(&self) -> [&Party; 2] {
        [&self.issuer, &self.holder]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PartyKey, TokenType};

    fn parties() -> (Party, Party) {
        (
            Party::new("Issuer", PartyKey([1u8; 32])),
            Party::new("Holder", PartyKey([2u8; 32])),
        )
    }

    #[test]
    fn new_claim_is_unpaid() {
        let (issuer, holder) = parties();
        let claim = ClaimRecord::new(issuer, holder, Amount::new(2, TokenType::new("USD", 2)));
        assert!(!claim.paid);
        assert_eq!(claim.amount.quantity, 2);
    }

    #[test]
    fn identical_inputs_produce_distinct_claims() {
        let (issuer, holder) = parties();
        let amount = Amount::new(2, TokenType::new("USD", 2));
        let a = ClaimRecord::new(issuer.clone(), holder.clone(), amount.clone());
        let b = ClaimRecord::new(issuer, holder, amount);
        assert_ne!(a.linear_id, b.linear_id);
        assert_ne!(a, b);
    }

    #[test]
    fn participants_are_issuer_then_holder() {
        let (issuer, holder) = parties();
        let claim = ClaimRecord::new(issuer.clone(), holder.clone(), Amount::new(1, TokenType::new("USD", 2)));
        let [first, second] = claim.participants();
        assert_eq!(first, &issuer);
        assert_eq!(second, &holder);
    }
}
