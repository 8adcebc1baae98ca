//! Swap quotes produced by the pool oracle.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Result of quoting an exact-input sell of the derivative token for the
/// base asset.
///
/// Invariant: `minimum_amount_out <= amount_out`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub amount_out: Decimal,
    pub minimum_amount_out: Decimal,
    /// Price impact in percent (e.g. `0.35` means 0.35%).
    pub price_impact_pct: Decimal,
}

impl Quote {
    /// Build a quote; a minimum above `amount_out` is capped to it.
    pub fn new(amount_out: Decimal, minimum_amount_out: Decimal, price_impact_pct: Decimal) -> Self {
        Self {
            amount_out,
            minimum_amount_out: minimum_amount_out.min(amount_out),
            price_impact_pct,
        }
    }

    /// Build a quote whose minimum is `amount_out * (1 - slippage)`.
    pub fn with_slippage(amount_out: Decimal, slippage: Decimal, price_impact_pct: Decimal) -> Self {
        let minimum = amount_out * (Decimal::one() - slippage.clamp_non_negative());
        Self::new(amount_out, minimum.clamp_non_negative(), price_impact_pct)
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Result of quoting an exact-output buy of the derivative token, paid in
/// the base asset.
///
/// Invariant: `amount_in <= maximum_amount_in`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyQuote {
    pub amount_in: Decimal,
    pub maximum_amount_in: Decimal,
    pub price_impact_pct: Decimal,
}

impl BuyQuote {
    /// Build a quote; a maximum below `amount_in` is raised to it.
    pub fn new(amount_in: Decimal, maximum_amount_in: Decimal, price_impact_pct: Decimal) -> Self {
        Self {
            amount_in,
            maximum_amount_in: maximum_amount_in.max(amount_in),
            price_impact_pct,
        }
    }

    /// Build a quote whose maximum is `amount_in * (1 + slippage)`.
    pub fn with_slippage(amount_in: Decimal, slippage: Decimal, price_impact_pct: Decimal) -> Self {
        let maximum = amount_in * (Decimal::one() + slippage.clamp_non_negative());
        Self::new(amount_in, maximum, price_impact_pct)
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn minimum_never_exceeds_amount_out() {
        let q = Quote::new(d("1"), d("2"), Decimal::zero());
        assert_eq!(q.minimum_amount_out, d("1"));
    }

    #[test]
    fn sell_slippage_lowers_minimum() {
        let q = Quote::with_slippage(d("100"), d("0.005"), d("0.1"));
        assert_eq!(q.amount_out, d("100"));
        assert_eq!(q.minimum_amount_out, d("99.5"));
    }

    #[test]
    fn buy_slippage_raises_maximum() {
        let q = BuyQuote::with_slippage(d("10"), d("0.01"), Decimal::zero());
        assert_eq!(q.maximum_amount_in, d("10.1"));
    }

    #[test]
    fn quote_serializes_camel_case() {
        let json = serde_json::to_value(Quote::zero()).unwrap();
        assert!(json.get("minimumAmountOut").is_some());
        assert!(json.get("priceImpactPct").is_some());
    }
}
