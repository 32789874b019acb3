//! Normalized coin literals.
//!
//! Payments in the auction protocol are expressed as coin literals such as
//! `"250stake"`: a non-negative integer amount directly followed by a denom.
//! This module provides the [`Coin`] type, the strict parser used for
//! payment promises, and the canonical rendering used on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The base denom bids are solicited and paid in.
pub const BASE_DENOM: &str = "stake";

/// Errors produced when parsing a coin literal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoinError {
    #[error("empty coin literal")]
    Empty,
    #[error("invalid coin amount: {0}")]
    Amount(String),
    #[error("invalid coin denom: {0:?}")]
    Denom(String),
}

/// A single amount of a single denom.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Checks a denom against the canonical form: a letter followed by 2..=127
/// letters, digits, `/`, `:`, `.`, `_`, or `-`.
fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let mut chars = denom.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if !first_ok || !rest_ok || denom.len() < 3 || denom.len() > 128 {
        return Err(CoinError::Denom(denom.to_string()));
    }
    Ok(())
}

/// Parses a normalized coin literal such as `"250stake"`.
///
/// Leading and trailing whitespace is tolerated; everything else is strict:
/// the amount is a plain base-10 integer (no sign, no separators) and the
/// denom must be canonical. This is the only parser used for payment
/// promises, on both the proposer and the builder side.
pub fn parse_coin_normalized(s: &str) -> Result<Coin, CoinError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CoinError::Empty);
    }

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (amount_str, denom) = s.split_at(split);
    if amount_str.is_empty() {
        return Err(CoinError::Amount(s.to_string()));
    }

    let amount: u128 = amount_str
        .parse()
        .map_err(|_| CoinError::Amount(amount_str.to_string()))?;
    validate_denom(denom)?;

    Ok(Coin::new(amount, denom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_literal() {
        let coin = parse_coin_normalized("250stake").expect("literal should parse");
        assert_eq!(coin.amount, 250);
        assert_eq!(coin.denom, "stake");
        assert_eq!(coin.to_string(), "250stake");
    }

    #[test]
    fn parses_zero_amount() {
        let coin = parse_coin_normalized("0stake").expect("zero amount is valid");
        assert_eq!(coin.amount, 0);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let coin = parse_coin_normalized("  42stake ").expect("whitespace trimmed");
        assert_eq!(coin, Coin::new(42, "stake"));
    }

    #[test]
    fn rejects_bad_literals() {
        for bad in ["", "stake", "250", "-1stake", "1.5stake", "250 stake", "99st"] {
            assert!(parse_coin_normalized(bad).is_err(), "should reject {bad:?}");
        }
    }

    #[test]
    fn rejects_denoms_with_bad_leading_char() {
        assert!(parse_coin_normalized("250/stake").is_err());

        // Digits split at the first non-digit, so this is amount 2509.
        let coin = parse_coin_normalized("2509stake").expect("valid literal");
        assert_eq!(coin.amount, 2509);
        assert_eq!(coin.denom, "stake");
    }
}
