//! Asset states and the pointer that resolves to their latest version.
//!
//! An asset record evolves: each update consumes the previous version and
//! emits a new one with the same [`LinearId`]. Parties hold an
//! [`AssetPointer`] rather than a concrete version, and resolve it against
//! their *own* ledger view when they need current data. Two parties may
//! therefore resolve the same pointer to different versions. The claim
//! protocol's staleness check exists to detect exactly that.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ClaimError, LinearId, Party, Result, StateAndRef, TokenType};

/// The issuer-owned record describing a yield-bearing asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetState {
    /// Shared across all versions of this asset.
    pub linear_id: LinearId,
    /// Ticker symbol (e.g., "ACME").
    pub symbol: String,
    /// Human-readable name.
    pub name: String,
    /// The party that issues the asset and honours claims against it.
    pub issuer: Party,
    /// Yield paid per unit held, in the settlement currency.
    pub yield_rate: Decimal,
    /// ISO-4217 code of the settlement currency.
    pub currency: String,
    /// Fraction digits of the asset's own token units.
    pub fraction_digits: u32,
}

impl AssetState {
    /// The token type that holdings of this asset are denominated in.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        TokenType::new(self.symbol.clone(), self.fraction_digits)
    }

    /// A pointer to the latest version of this asset.
    #[must_use]
    pub fn pointer(&self) -> AssetPointer {
        AssetPointer {
            linear_id: self.linear_id,
            symbol: self.symbol.clone(),
        }
    }
}

/// Lookup of the latest unconsumed version of a linear asset record.
///
/// Implemented by each party's local ledger view.
pub trait PointerResolver {
    /// The unconsumed asset state carrying `linear_id`, if the resolver knows it.
    ///
    /// # Errors
    /// Returns [`ClaimError::Internal`] if the ledger view cannot be read.
    fn latest_asset(&self, linear_id: LinearId) -> Result<Option<StateAndRef<AssetState>>>;
}

/// Reference to "whatever the latest version of this asset is".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPointer {
    pub linear_id: LinearId,
    pub symbol: String,
}

impl AssetPointer {
    /// Resolve to the current version according to `resolver`'s ledger view.
    ///
    /// # Errors
    /// Returns [`ClaimError::UnresolvableReference`] if the resolver has no
    /// unconsumed state for this pointer, or the state it has carries a
    /// different symbol. Read failures of the resolver propagate unchanged.
    pub fn resolve<R>(&self, resolver: &R) -> Result<StateAndRef<AssetState>>
    where
        R: PointerResolver + ?Sized,
    {
        let resolved = resolver
            .latest_asset(self.linear_id)?
            .ok_or_else(|| ClaimError::unresolvable_pointer(self.linear_id))?;
        if resolved.state.data.symbol != self.symbol {
            return Err(ClaimError::UnresolvableReference {
                reason: format!(
                    "{} resolved to symbol {}, expected {}",
                    self.linear_id, resolved.state.data.symbol, self.symbol
                ),
            });
        }
        Ok(resolved)
    }
}

/// Test fixtures. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl AssetState {
    /// An ACME-style asset paying `yield_rate` USD per unit.
    pub fn dummy(issuer: Party, symbol: &str, yield_rate: Decimal) -> Self {
        Self {
            linear_id: LinearId::new(),
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            issuer,
            yield_rate,
            currency: "USD".to_string(),
            fraction_digits: 0,
        }
    }
}
