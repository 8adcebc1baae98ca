//! Pro-rata share valuation of the strategy vault.

use crate::domain::{BuyQuote, Decimal, Vault};

/// Vault collateral attributable to `shares` out of `supply`.
pub fn collateral_for_shares(shares: Decimal, supply: Decimal, vault: &Vault) -> Decimal {
    pro_rata(vault.collateral_amount, shares, supply)
}

/// Vault debt attributable to `shares` out of `supply`.
pub fn debt_for_shares(shares: Decimal, supply: Decimal, vault: &Vault) -> Decimal {
    pro_rata(vault.short_amount, shares, supply)
}

fn pro_rata(total: Decimal, shares: Decimal, supply: Decimal) -> Decimal {
    if !supply.is_positive() || !shares.is_positive() {
        return Decimal::zero();
    }
    total
        .checked_mul(shares)
        .and_then(|scaled| scaled.checked_div(supply))
        .unwrap_or_default()
}

/// Base asset a holder would receive by unwinding: their collateral minus
/// the cost of buying back their debt. Never negative.
pub fn current_value(collateral_share: Decimal, buy_back: &BuyQuote) -> Decimal {
    (collateral_share - buy_back.amount_in).clamp_non_negative()
}

/// Shares to burn to withdraw `eth_amount` from a position worth
/// `current_value`. `None` when the position has no value or the share
/// count leaves the decimal range.
pub fn shares_for_withdraw(
    eth_amount: Decimal,
    current_value: Decimal,
    share_balance: Decimal,
) -> Option<Decimal> {
    if !current_value.is_positive() {
        return None;
    }
    eth_amount
        .checked_div(current_value)?
        .checked_mul(share_balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn shares_split_vault_pro_rata() {
        let vault = Vault::new(1, d("100"), d("50"));
        assert_eq!(collateral_for_shares(d("25"), d("100"), &vault), d("25"));
        assert_eq!(debt_for_shares(d("25"), d("100"), &vault), d("12.5"));
    }

    #[test]
    fn zero_supply_yields_zero() {
        let vault = Vault::new(1, d("100"), d("50"));
        assert_eq!(collateral_for_shares(d("25"), Decimal::zero(), &vault), Decimal::zero());
    }

    #[test]
    fn current_value_floors_at_zero() {
        let quote = BuyQuote::new(d("30"), d("31"), Decimal::zero());
        assert_eq!(current_value(d("25"), &quote), Decimal::zero());
        assert_eq!(current_value(d("40"), &quote), d("10"));
    }

    #[test]
    fn withdraw_converts_eth_to_shares() {
        assert_eq!(shares_for_withdraw(d("2"), d("10"), d("50")), Some(d("10")));
        assert_eq!(shares_for_withdraw(d("2"), Decimal::zero(), d("50")), None);
    }

    #[test]
    fn overflowing_share_math_yields_zero() {
        let vault = Vault::new(1, Decimal::MAX, d("50"));
        assert_eq!(collateral_for_shares(d("2"), d("100"), &vault), Decimal::zero());
        assert_eq!(shares_for_withdraw(Decimal::MAX, d("0.5"), d("10")), None);
    }
}
