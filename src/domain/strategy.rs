//! Strategy-level inputs and derived risk state.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only strategy configuration for a single computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyParameters {
    /// Hard cap on total base-asset collateral held by the strategy vault.
    pub max_capacity: Decimal,
    /// Slippage tolerance as a fraction (0.005 = 0.5%).
    pub slippage_tolerance: Decimal,
    pub normalization_factor: Decimal,
}

/// Collateralization of a vault. `liquidation_price` is in the debt's
/// valuation currency (USD per base asset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralState {
    /// Percent, rounded to one decimal place.
    pub collateral_percent: Decimal,
    pub liquidation_price: Decimal,
}

impl CollateralState {
    /// Defined result for vaults without debt.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.collateral_percent.is_zero() && self.liquidation_price.is_zero()
    }
}
