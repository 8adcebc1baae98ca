//! Validation of proposed deposits and withdrawals.
//!
//! Pure and side-effect free; re-run whenever any input changes. The cap
//! check that includes the flash borrow uses whatever borrow estimate the
//! caller has, so it must be re-run once the borrow search has finished.

use crate::domain::{Decimal, Quote};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Implied funding below this fraction of the trailing average raises an
/// advisory.
pub const DEFAULT_FUNDING_WARNING_RATIO: Decimal = Decimal::new(dec!(0.75));
/// Deposits with price impact above this percentage are flagged as risky.
pub const DEFAULT_PRICE_IMPACT_WARNING_PCT: Decimal = Decimal::new(dec!(3));

/// Rebalance auction signals from the strategy contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HedgeSignal {
    pub time_hedge_available: bool,
    pub price_hedge_available: bool,
}

impl HedgeSignal {
    pub fn is_locked(&self) -> bool {
        self.time_hedge_available || self.price_hedge_available
    }
}

/// Current implied funding against its trailing average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSnapshot {
    pub current_implied: Decimal,
    pub historical_average: Decimal,
    /// Length of the trailing window, in hours.
    pub period_hours: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardInputs {
    pub deposit_amount: Decimal,
    /// Base asset already deposited in the strategy.
    pub existing_deposited: Decimal,
    pub max_capacity: Decimal,
    /// Latest flash-borrow estimate for `deposit_amount`.
    pub projected_borrow: Decimal,
    pub available_balance: Decimal,
    pub withdraw_amount: Decimal,
    pub current_position_value: Decimal,
    pub hedge: HedgeSignal,
    pub funding: Option<FundingSnapshot>,
    pub funding_warning_ratio: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GuardError {
    CapExceeded,
    CapExceededByBorrow { borrow: Decimal },
    InsufficientBalance,
    ExceedsPosition,
    HedgeInProgress,
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::CapExceeded => write!(f, "Amount greater than strategy cap"),
            GuardError::CapExceededByBorrow { borrow } => write!(
                f,
                "Amount greater than strategy cap since it flash borrows {:.2} ETH. Input a smaller amount",
                borrow.round_dp(2).inner()
            ),
            GuardError::InsufficientBalance => write!(f, "Insufficient ETH balance"),
            GuardError::ExceedsPosition => {
                write!(f, "Withdraw amount greater than strategy balance")
            }
            GuardError::HedgeInProgress => {
                write!(f, "Deposits and withdraws available after the hedge auction")
            }
        }
    }
}

impl std::error::Error for GuardError {}

/// Non-blocking warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Advisory {
    LowFunding { period_hours: u32 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::LowFunding { period_hours } => write!(
                f,
                "Current implied funding is 75% lower than the last {} hours. Consider if you want to deposit now or later",
                period_hours
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardOutcome {
    pub deposit_error: Option<GuardError>,
    pub withdraw_error: Option<GuardError>,
    pub warning: Option<Advisory>,
}

impl GuardOutcome {
    pub fn can_deposit(&self) -> bool {
        self.deposit_error.is_none()
    }

    pub fn can_withdraw(&self) -> bool {
        self.withdraw_error.is_none()
    }
}

/// Validate a proposed deposit and withdrawal.
///
/// Deposit checks run in order (cap, cap including borrow, balance) and
/// report only the first failure. A pending hedge auction replaces any
/// other error on both sides.
pub fn evaluate(inputs: &GuardInputs) -> GuardOutcome {
    // A sum past the decimal range is over any cap.
    let committed = inputs.deposit_amount.checked_add(inputs.existing_deposited);
    let with_borrow = committed.and_then(|committed| committed.checked_add(inputs.projected_borrow));
    let over_cap = |total: Option<Decimal>| total.map_or(true, |total| total >= inputs.max_capacity);

    let mut deposit_error = if over_cap(committed) {
        Some(GuardError::CapExceeded)
    } else if over_cap(with_borrow) {
        Some(GuardError::CapExceededByBorrow {
            borrow: inputs.projected_borrow,
        })
    } else if inputs.available_balance < inputs.deposit_amount {
        Some(GuardError::InsufficientBalance)
    } else {
        None
    };

    let mut withdraw_error = if inputs.withdraw_amount > inputs.current_position_value {
        Some(GuardError::ExceedsPosition)
    } else {
        None
    };

    if inputs.hedge.is_locked() {
        deposit_error = Some(GuardError::HedgeInProgress);
        withdraw_error = Some(GuardError::HedgeInProgress);
    }

    let warning = inputs.funding.and_then(|funding| {
        let threshold = inputs
            .funding_warning_ratio
            .checked_mul(funding.historical_average)?;
        (funding.current_implied <= threshold).then_some(Advisory::LowFunding {
            period_hours: funding.period_hours,
        })
    });

    GuardOutcome {
        deposit_error,
        withdraw_error,
        warning,
    }
}

/// Whether a quote's price impact exceeds `threshold_pct`.
pub fn is_high_price_impact(quote: &Quote, threshold_pct: Decimal) -> bool {
    quote.price_impact_pct > threshold_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn borrow_message_shows_two_decimals() {
        let err = GuardError::CapExceededByBorrow { borrow: d("12.3456") };
        assert_eq!(
            err.to_string(),
            "Amount greater than strategy cap since it flash borrows 12.35 ETH. Input a smaller amount"
        );
    }

    #[test]
    fn advisory_names_period() {
        let advisory = Advisory::LowFunding { period_hours: 24 };
        assert!(advisory.to_string().contains("last 24 hours"));
    }

    #[test]
    fn price_impact_threshold_is_exclusive() {
        let quote = Quote::new(d("1"), d("1"), d("3"));
        assert!(!is_high_price_impact(&quote, DEFAULT_PRICE_IMPACT_WARNING_PCT));
        let quote = Quote::new(d("1"), d("1"), d("3.01"));
        assert!(is_high_price_impact(&quote, DEFAULT_PRICE_IMPACT_WARNING_PCT));
    }
}
