pub mod convert;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places every stored amount is normalized to.
pub const SCALE: u32 = 2;

/// Uppercase currency code ("USD", "EUR", ...).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Self {
        Currency(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round to two decimal places, half-up (midpoint away from zero).
pub fn round_half_up(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// True when the value carries no more precision than two decimal places.
pub fn is_cent_precise(amount: Decimal) -> bool {
    round_half_up(amount) == amount
}
