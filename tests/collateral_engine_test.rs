use crab_engine::engine::collateral::{collateral_state, debt_in_base, PricingContext};
use crab_engine::{CollateralState, Decimal, LiquidityPosition, PositionShape};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn ctx(norm_factor: &str, twap: &str) -> PricingContext {
    PricingContext {
        norm_factor: d(norm_factor),
        twap_price: d(twap),
        implied_vol: d("0.9"),
        is_weth_token0: false,
    }
}

fn lp_position() -> LiquidityPosition {
    LiquidityPosition {
        base_amount: d("1"),
        derivative_amount: d("100"),
        shape: PositionShape {
            liquidity: d("100"),
            tick_lower: -23000,
            tick_upper: -13000,
        },
    }
}

#[test]
fn test_plain_vault_percent_and_liquidation_price() {
    let state = collateral_state(d("150"), d("50"), None, &ctx("1", "2000"));
    assert_eq!(state.collateral_percent, d("1500.0"));
    assert_eq!(state.liquidation_price, d("20000"));
}

#[test]
fn test_liquidation_price_sits_on_threshold() {
    let ctx = ctx("0.8", "1800");
    let state = collateral_state(d("30"), d("120"), None, &ctx);
    let debt_at_liquidation =
        debt_in_base(d("120"), ctx.norm_factor, state.liquidation_price).unwrap();
    let ratio = d("30") / debt_at_liquidation;
    assert!((ratio - d("1.5")).abs() < d("0.000000001"), "ratio {}", ratio);
}

#[test]
fn test_zero_debt_is_empty_for_any_collateral() {
    for collateral in ["0", "0.0001", "1", "150", "1000000"] {
        let state = collateral_state(d(collateral), Decimal::zero(), None, &ctx("1", "2000"));
        assert_eq!(state, CollateralState::empty(), "collateral {}", collateral);

        let with_lp =
            collateral_state(d(collateral), Decimal::zero(), Some(&lp_position()), &ctx("1", "2000"));
        assert!(with_lp.is_empty());
    }
}

#[test]
fn test_zero_norm_factor_is_empty() {
    let state = collateral_state(d("150"), d("50"), None, &ctx("0", "2000"));
    assert!(state.is_empty());
}

#[test]
fn test_liquidity_position_counts_as_collateral() {
    let ctx = ctx("0.8", "2000");
    let plain = collateral_state(d("10"), d("100"), None, &ctx);
    let with_lp = collateral_state(d("10"), d("100"), Some(&lp_position()), &ctx);

    // 10 + 1 + 100 * 0.8 * 2000 / 10000 = 27 against a debt of 16.
    assert_eq!(plain.collateral_percent, d("62.5"));
    assert_eq!(with_lp.collateral_percent, d("168.8"));
    assert!(with_lp.liquidation_price > ctx.twap_price);
}

#[test]
fn test_more_collateral_raises_liquidation_price() {
    let ctx = ctx("1", "2000");
    let low = collateral_state(d("100"), d("50"), None, &ctx);
    let high = collateral_state(d("200"), d("50"), None, &ctx);
    assert!(high.liquidation_price > low.liquidation_price);
    assert!(high.collateral_percent > low.collateral_percent);
}

#[test]
fn test_one_wei_debt_against_large_collateral_is_empty() {
    let state = collateral_state(
        d("200000000"),
        d("0.000000000000000001"),
        None,
        &ctx("1", "2000"),
    );
    assert_eq!(state, CollateralState::empty());
}

#[test]
fn test_twap_at_decimal_max_is_empty() {
    let mut ctx = ctx("1", "2000");
    ctx.twap_price = Decimal::MAX;
    assert_eq!(collateral_state(d("1"), d("100000"), None, &ctx), CollateralState::empty());
    assert_eq!(
        collateral_state(d("1"), d("100000"), Some(&lp_position()), &ctx),
        CollateralState::empty()
    );
    assert_eq!(debt_in_base(d("100000"), d("1"), Decimal::MAX), None);
}
