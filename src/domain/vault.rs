//! Vault and liquidity-position collateral read from the controller.

use crate::domain::{Address, Decimal};
use serde::{Deserialize, Serialize};

/// A controller vault: base-asset collateral backing a short position in
/// the derivative token. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: u64,
    pub collateral_amount: Decimal,
    pub short_amount: Decimal,
    /// Liquidity-position token deposited as extra collateral, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity_position_id: Option<u64>,
    pub operator: Address,
}

impl Vault {
    pub fn new(id: u64, collateral_amount: Decimal, short_amount: Decimal) -> Self {
        Self {
            id,
            collateral_amount,
            short_amount,
            liquidity_position_id: None,
            operator: Address::default(),
        }
    }

    pub fn with_liquidity_position(mut self, position_id: u64) -> Self {
        self.liquidity_position_id = Some(position_id);
        self
    }

    pub fn with_operator(mut self, operator: Address) -> Self {
        self.operator = operator;
        self
    }

    /// Debt per unit of collateral; `None` for an empty vault.
    pub fn debt_per_collateral(&self) -> Option<Decimal> {
        if !self.collateral_amount.is_positive() {
            return None;
        }
        self.short_amount.checked_div(self.collateral_amount)
    }
}

/// Range of a concentrated-liquidity position.
///
/// `liquidity` is expressed in whole-token units (both pool tokens carry the
/// same number of decimals, so the scaling cancels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionShape {
    pub liquidity: Decimal,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

/// A liquidity position used as vault collateral, with its current token
/// amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityPosition {
    pub base_amount: Decimal,
    pub derivative_amount: Decimal,
    pub shape: PositionShape,
}
