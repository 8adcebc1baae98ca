//! Collateralization percentage and liquidation price of a vault.

use crate::domain::{CollateralState, Decimal, LiquidityPosition};
use crate::engine::lp_math;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Scale between the derivative's nominal amount and its index value.
pub const INDEX_SCALE: Decimal = Decimal::new(dec!(10000));
/// Collateral ratio at which a vault becomes liquidatable (150%).
pub const LIQUIDATION_THRESHOLD: Decimal = Decimal::new(dec!(1.5));

/// Market inputs shared by every valuation in one computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingContext {
    pub norm_factor: Decimal,
    /// ETH/USD time-weighted average price.
    pub twap_price: Decimal,
    /// Annualized implied volatility as a fraction.
    pub implied_vol: Decimal,
    /// Whether the base asset is token0 of the derivative pool.
    pub is_weth_token0: bool,
}

/// Debt value in the base asset: `short / INDEX_SCALE * norm_factor * twap`.
/// `None` on overflow.
pub fn debt_in_base(debt_short: Decimal, norm_factor: Decimal, twap_price: Decimal) -> Option<Decimal> {
    debt_short
        .checked_div(INDEX_SCALE)?
        .checked_mul(norm_factor)?
        .checked_mul(twap_price)
}

/// Derivative amount whose debt value equals `debt`; `None` when the norm
/// factor or price is zero.
pub fn short_amount_from_debt(
    debt: Decimal,
    norm_factor: Decimal,
    twap_price: Decimal,
) -> Option<Decimal> {
    debt.checked_mul(INDEX_SCALE)?
        .checked_div(norm_factor)?
        .checked_div(twap_price)
}

/// Value in the base asset of derivative tokens held as collateral.
pub fn derivative_value_in_base(amount: Decimal, ctx: &PricingContext) -> Option<Decimal> {
    amount
        .checked_mul(ctx.norm_factor)?
        .checked_mul(ctx.twap_price)?
        .checked_div(INDEX_SCALE)
}

/// Collateralization of a vault.
///
/// With a liquidity position the position's base and derivative amounts
/// count as collateral and the liquidation price comes from
/// [`lp_math::liquidation_price_for_lp`]. A vault with no positive debt
/// yields [`CollateralState::empty`], as does any input large enough to
/// overflow the decimal range.
pub fn collateral_state(
    collateral: Decimal,
    debt_short: Decimal,
    position: Option<&LiquidityPosition>,
    ctx: &PricingContext,
) -> CollateralState {
    match checked_collateral_state(collateral, debt_short, position, ctx) {
        Some(state) => state,
        None => {
            tracing::warn!(
                collateral = %collateral,
                debt_short = %debt_short,
                twap = %ctx.twap_price,
                "collateral state overflowed decimal range"
            );
            CollateralState::empty()
        }
    }
}

fn checked_collateral_state(
    collateral: Decimal,
    debt_short: Decimal,
    position: Option<&LiquidityPosition>,
    ctx: &PricingContext,
) -> Option<CollateralState> {
    let debt_value = debt_in_base(debt_short, ctx.norm_factor, ctx.twap_price)?;
    if !debt_value.is_positive() {
        return Some(CollateralState::empty());
    }

    let (effective_collateral, liquidation_price) = match position {
        None => {
            let threshold_debt = ctx
                .norm_factor
                .checked_mul(debt_short)?
                .checked_div(INDEX_SCALE)?
                .checked_mul(LIQUIDATION_THRESHOLD)?;
            (collateral, collateral.checked_div(threshold_debt)?)
        }
        Some(position) => {
            let effective = collateral
                .checked_add(position.base_amount)?
                .checked_add(derivative_value_in_base(position.derivative_amount, ctx)?)?;
            let price = lp_math::liquidation_price_for_lp(collateral, debt_short, &position.shape, ctx)
                .unwrap_or_else(|| {
                    tracing::warn!(
                        liquidity = %position.shape.liquidity,
                        tick_lower = position.shape.tick_lower,
                        tick_upper = position.shape.tick_upper,
                        "liquidity position liquidation price unavailable"
                    );
                    Decimal::zero()
                });
            (effective, price)
        }
    };

    let collateral_percent = effective_collateral
        .checked_div(debt_value)?
        .checked_mul(Decimal::hundred())?
        .round_dp(1);

    Some(CollateralState {
        collateral_percent,
        liquidation_price,
    })
}
