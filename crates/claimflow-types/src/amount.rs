//! Token types and integer amounts.
//!
//! An [`Amount`] counts whole minor units of its [`TokenType`]: for a
//! currency with two fraction digits a quantity of `250` is `2.50`.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ClaimError, Result, constants::MAX_FRACTION_DIGITS};

/// ISO-4217 default fraction digits for the currencies a claim may settle in.
const CURRENCY_FRACTION_DIGITS: &[(&str, u32)] = &[
    ("AUD", 2),
    ("BHD", 3),
    ("CAD", 2),
    ("CHF", 2),
    ("CNY", 2),
    ("EUR", 2),
    ("GBP", 2),
    ("HKD", 2),
    ("JPY", 0),
    ("KRW", 0),
    ("KWD", 3),
    ("SGD", 2),
    ("USD", 2),
];

/// A kind of token: an asset symbol or a settlement currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenType {
    /// Symbol or currency code (e.g., "ACME", "USD").
    pub code: String,
    /// Number of decimal places a minor unit represents.
    pub fraction_digits: u32,
}

impl TokenType {
    #[must_use]
    pub fn new(code: impl Into<String>, fraction_digits: u32) -> Self {
        Self {
            code: code.into(),
            fraction_digits,
        }
    }

    /// Token type for a settlement currency, using its default fraction digits.
    ///
    /// # Errors
    /// Returns [`ClaimError::UnknownCurrency`] if the code is not recognised.
    pub fn currency(code: &str) -> Result<Self> {
        CURRENCY_FRACTION_DIGITS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(c, digits)| Self::new(*c, *digits))
            .ok_or_else(|| ClaimError::UnknownCurrency(code.to_string()))
    }

    /// Whether amounts of this token can be expressed as a [`Decimal`].
    #[must_use]
    pub fn is_representable(&self) -> bool {
        self.fraction_digits <= MAX_FRACTION_DIGITS
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// An integer quantity of minor units of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    pub quantity: i64,
    pub token: TokenType,
}

impl Amount {
    #[must_use]
    pub fn new(quantity: i64, token: TokenType) -> Self {
        Self { quantity, token }
    }

    #[must_use]
    pub fn zero(token: TokenType) -> Self {
        Self::new(0, token)
    }

    /// The amount in display units (`quantity × 10^-fraction_digits`), or
    /// `None` when the token declares more fraction digits than a
    /// [`Decimal`] carries.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::try_new(self.quantity, self.token.fraction_digits).ok()
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.quantity > 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(value) => write!(f, "{value} {}", self.token),
            None => write!(
                f,
                "{} {} (1e-{})",
                self.quantity, self.token, self.token.fraction_digits
            ),
        }
    }
}
