//! Concentrated-liquidity valuation and the liquidation price of a vault
//! whose collateral includes a liquidity position.
//!
//! Pool prices are token1 per token0 at `1.0001^tick`. The derivative's
//! mark price in the base asset is modeled as
//! `norm_factor * eth_price * exp(iv^2 * funding_period) / INDEX_SCALE`,
//! while the collateral check itself values derivative tokens at the index
//! (`norm_factor * eth_price / INDEX_SCALE`).

use crate::domain::{Decimal, PositionShape};
use crate::engine::collateral::{PricingContext, INDEX_SCALE, LIQUIDATION_THRESHOLD};
use rust_decimal_macros::dec;

const TICK_BASE: Decimal = Decimal::new(dec!(1.0001));
/// Funding period of the derivative, in years (17.5 days).
const FUNDING_PERIOD_YEARS: Decimal = Decimal::new(dec!(0.0479452054794520547945205479));
const TWO: Decimal = Decimal::new(dec!(2));
const MAX_BRACKET_STEPS: u32 = 40;
const MAX_BISECTION_STEPS: u32 = 200;

/// `sqrt(1.0001^tick)`; `None` when the power leaves decimal range.
pub fn sqrt_price_at_tick(tick: i32) -> Option<Decimal> {
    TICK_BASE.checked_powi(i64::from(tick))?.sqrt()
}

/// Token amounts `(amount0, amount1)` held by `liquidity` between
/// `sqrt_lower` and `sqrt_upper` at pool price `sqrt_price`.
pub fn amounts_for_liquidity(
    sqrt_price: Decimal,
    sqrt_lower: Decimal,
    sqrt_upper: Decimal,
    liquidity: Decimal,
) -> Option<(Decimal, Decimal)> {
    let (sqrt_lower, sqrt_upper) = if sqrt_lower <= sqrt_upper {
        (sqrt_lower, sqrt_upper)
    } else {
        (sqrt_upper, sqrt_lower)
    };

    if sqrt_price <= sqrt_lower {
        let amount0 = liquidity
            .checked_mul(sqrt_upper - sqrt_lower)?
            .checked_div(sqrt_lower.checked_mul(sqrt_upper)?)?;
        Some((amount0, Decimal::zero()))
    } else if sqrt_price >= sqrt_upper {
        let amount1 = liquidity.checked_mul(sqrt_upper - sqrt_lower)?;
        Some((Decimal::zero(), amount1))
    } else {
        let amount0 = liquidity
            .checked_mul(sqrt_upper - sqrt_price)?
            .checked_div(sqrt_price.checked_mul(sqrt_upper)?)?;
        let amount1 = liquidity.checked_mul(sqrt_price - sqrt_lower)?;
        Some((amount0, amount1))
    }
}

/// `exp(iv^2 * funding_period)`.
fn volatility_premium(implied_vol: Decimal) -> Option<Decimal> {
    implied_vol
        .checked_mul(implied_vol)?
        .checked_mul(FUNDING_PERIOD_YEARS)?
        .checked_exp()
}

/// Base-asset value of the position if ETH traded at `eth_price`.
pub fn lp_collateral_value(
    shape: &PositionShape,
    eth_price: Decimal,
    ctx: &PricingContext,
) -> Option<Decimal> {
    let index_value = ctx
        .norm_factor
        .checked_mul(eth_price)?
        .checked_div(INDEX_SCALE)?;
    let mark = index_value.checked_mul(volatility_premium(ctx.implied_vol)?)?;
    if !mark.is_positive() {
        return None;
    }

    let pool_price = if ctx.is_weth_token0 {
        Decimal::one().checked_div(mark)?
    } else {
        mark
    };
    let (amount0, amount1) = amounts_for_liquidity(
        pool_price.sqrt()?,
        sqrt_price_at_tick(shape.tick_lower)?,
        sqrt_price_at_tick(shape.tick_upper)?,
        shape.liquidity,
    )?;
    let (base, derivative) = if ctx.is_weth_token0 {
        (amount0, amount1)
    } else {
        (amount1, amount0)
    };

    base.checked_add(derivative.checked_mul(index_value)?)
}

/// Collateral left over the liquidation threshold at `eth_price`.
fn surplus(
    collateral: Decimal,
    debt_short: Decimal,
    shape: &PositionShape,
    eth_price: Decimal,
    ctx: &PricingContext,
) -> Option<Decimal> {
    let lp_value = lp_collateral_value(shape, eth_price, ctx)?;
    let debt_value = debt_short
        .checked_mul(ctx.norm_factor)?
        .checked_mul(eth_price)?
        .checked_div(INDEX_SCALE)?;
    collateral
        .checked_add(lp_value)?
        .checked_sub(debt_value.checked_mul(LIQUIDATION_THRESHOLD)?)
}

/// ETH price at which `collateral` plus the position's value falls to the
/// liquidation threshold of the debt.
///
/// The surplus shrinks as ETH rises, so the crossing is bracketed by
/// doubling (or halving) from the TWAP price and then bisected. Returns
/// `None` if the tick math overflows or no crossing is bracketed.
pub fn liquidation_price_for_lp(
    collateral: Decimal,
    debt_short: Decimal,
    shape: &PositionShape,
    ctx: &PricingContext,
) -> Option<Decimal> {
    if !debt_short.is_positive() {
        return None;
    }
    let f = |price: Decimal| surplus(collateral, debt_short, shape, price, ctx);

    let start = ctx.twap_price.max(Decimal::one());
    let (mut lo, mut hi) = if f(start)?.is_positive() {
        let mut hi = start;
        let mut steps = 0;
        while f(hi)?.is_positive() {
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                return None;
            }
            hi = hi.checked_mul(TWO)?;
        }
        (hi / TWO, hi)
    } else {
        let mut lo = start;
        let mut steps = 0;
        while !f(lo)?.is_positive() {
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                // Under water at any realistic price.
                return Some(lo);
            }
            lo = lo / TWO;
        }
        (lo, lo * TWO)
    };

    for _ in 0..MAX_BISECTION_STEPS {
        let mid = lo + (hi - lo) / TWO;
        if mid == lo || mid == hi {
            break;
        }
        if f(mid)?.is_positive() {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Some(hi)
}
