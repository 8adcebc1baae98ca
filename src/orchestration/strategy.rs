use crate::config::EngineConfig;
use crate::domain::{
    Address, BuyQuote, CollateralState, Decimal, LiquidityPosition, PositionSnapshot,
    StrategyParameters, Vault,
};
use crate::engine::guard::{self, GuardInputs, GuardOutcome};
use crate::engine::ledger::{fold_history, PositionReport};
use crate::engine::solver::{clamp_borrow_to_cap, BorrowSearch, BorrowSolution};
use crate::engine::{collateral, valuation, PricingContext};
use crate::error::CoreError;
use crate::oracle::{
    HistorySource, LiquidityPositionSource, OracleError, QuoteOracle, StrategySource, TwapOracle,
};
use serde::Serialize;
use std::sync::Arc;

fn check_slippage(slippage: Decimal) -> Result<(), CoreError> {
    if slippage.is_negative() || slippage >= Decimal::one() {
        return Err(CoreError::InvalidInput(format!(
            "slippage must be in [0, 1), got {}",
            slippage
        )));
    }
    Ok(())
}

/// Sized flash deposit, ready for guard re-validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositSizing {
    pub deposit: Decimal,
    /// Raw result of the borrow search.
    pub solution: BorrowSolution,
    /// Borrow after clamping to the strategy cap; this is what gets executed.
    pub borrow_amount: Decimal,
    pub clamped: bool,
    pub high_price_impact: bool,
}

impl DepositSizing {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collateral the deposit adds to the vault: deposit plus flash borrow.
    pub fn total_collateral(&self) -> Decimal {
        self.deposit + self.borrow_amount
    }
}

/// Sized flash withdrawal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawSizing {
    pub share_amount: Decimal,
    pub debt_to_repay: Decimal,
    /// Most base asset the withdrawal may spend buying back debt.
    pub max_eth_to_pay: Decimal,
    pub quote: BuyQuote,
}

impl WithdrawSizing {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Wires external collaborators into the pure engine.
///
/// Every method is self-contained: it reads a fresh snapshot of its inputs
/// and shares no mutable state with concurrent calls, so a superseded call
/// can simply be dropped.
#[derive(Clone)]
pub struct CrabStrategy {
    quotes: Arc<dyn QuoteOracle>,
    strategy: Arc<dyn StrategySource>,
    twap: Arc<dyn TwapOracle>,
    positions: Arc<dyn LiquidityPositionSource>,
    history: Arc<dyn HistorySource>,
    config: EngineConfig,
}

impl CrabStrategy {
    pub fn new(
        quotes: Arc<dyn QuoteOracle>,
        strategy: Arc<dyn StrategySource>,
        twap: Arc<dyn TwapOracle>,
        positions: Arc<dyn LiquidityPositionSource>,
        history: Arc<dyn HistorySource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            quotes,
            strategy,
            twap,
            positions,
            history,
            config,
        }
    }

    /// Build from one value that implements every collaborator.
    pub fn from_source<S>(source: Arc<S>, config: EngineConfig) -> Self
    where
        S: QuoteOracle
            + StrategySource
            + TwapOracle
            + LiquidityPositionSource
            + HistorySource
            + 'static,
    {
        Self::new(
            source.clone(),
            source.clone(),
            source.clone(),
            source.clone(),
            source,
            config,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn strategy_vault(&self) -> Result<Option<Vault>, OracleError> {
        self.strategy.get_vault(self.config.vault_id).await
    }

    /// Size the flash borrow for `deposit` and clamp it to the cap.
    ///
    /// A non-positive deposit or a missing vault yields
    /// [`DepositSizing::empty`] without quoting.
    pub async fn size_deposit(
        &self,
        deposit: Decimal,
        params: &StrategyParameters,
    ) -> Result<DepositSizing, CoreError> {
        check_slippage(params.slippage_tolerance)?;
        if !deposit.is_positive() {
            return Ok(DepositSizing::empty());
        }
        let Some(vault) = self.strategy_vault().await? else {
            tracing::warn!(vault_id = self.config.vault_id, "strategy vault not found");
            return Ok(DepositSizing::empty());
        };

        let solution = match BorrowSearch::new(deposit, &vault, self.config.solver_settings()) {
            Some(mut search) => {
                while let Some(candidate) = search.next_candidate() {
                    let quote = self
                        .quotes
                        .sell_quote(candidate.debt_to_mint, params.slippage_tolerance)
                        .await?;
                    search.observe(quote);
                }
                search.finish()
            }
            None => BorrowSolution::zero(),
        };

        let borrow_amount = clamp_borrow_to_cap(
            deposit,
            vault.collateral_amount,
            params.max_capacity,
            solution.borrow_amount,
        );

        tracing::info!(
            deposit = %deposit,
            borrow = %borrow_amount,
            converged = solution.converged,
            iterations = solution.iterations,
            "sized flash deposit"
        );

        Ok(DepositSizing {
            deposit,
            solution,
            borrow_amount,
            clamped: borrow_amount < solution.borrow_amount,
            high_price_impact: guard::is_high_price_impact(
                &solution.quote,
                self.config.price_impact_warning_pct,
            ),
        })
    }

    /// Re-run the guard against a finished sizing so the cap check sees the
    /// converged borrow rather than an in-flight estimate.
    pub fn revalidate_deposit(&self, sizing: &DepositSizing, inputs: GuardInputs) -> GuardOutcome {
        guard::evaluate(&GuardInputs {
            deposit_amount: sizing.deposit,
            projected_borrow: sizing.solution.borrow_amount,
            funding_warning_ratio: self.config.funding_warning_ratio,
            ..inputs
        })
    }

    /// Strategy vault and share supply, or `None` when `share_balance` has
    /// no claim on anything.
    async fn share_of_vault(
        &self,
        share_balance: Decimal,
    ) -> Result<Option<(Vault, Decimal)>, OracleError> {
        let Some(vault) = self.strategy_vault().await? else {
            return Ok(None);
        };
        let supply = self.strategy.share_supply().await?;
        if !supply.is_positive() || !share_balance.is_positive() {
            return Ok(None);
        }
        Ok(Some((vault, supply)))
    }

    /// Caller slippage, or the configured default when `None`.
    fn slippage_or_default(&self, slippage: Option<Decimal>) -> Result<Decimal, CoreError> {
        let slippage = slippage.unwrap_or(self.config.slippage_tolerance);
        check_slippage(slippage)?;
        Ok(slippage)
    }

    /// Base asset `share_balance` would unwind to right now.
    pub async fn current_value(
        &self,
        share_balance: Decimal,
        slippage: Option<Decimal>,
    ) -> Result<Decimal, CoreError> {
        let slippage = self.slippage_or_default(slippage)?;
        let Some((vault, supply)) = self.share_of_vault(share_balance).await? else {
            return Ok(Decimal::zero());
        };
        Ok(self.unwind_value(&vault, supply, share_balance, slippage).await?)
    }

    async fn unwind_value(
        &self,
        vault: &Vault,
        supply: Decimal,
        shares: Decimal,
        slippage: Decimal,
    ) -> Result<Decimal, OracleError> {
        let collateral = valuation::collateral_for_shares(shares, supply, vault);
        let debt = valuation::debt_for_shares(shares, supply, vault);
        if !debt.is_positive() {
            return Ok(collateral);
        }
        let buy_back = self.quotes.buy_quote(debt, slippage).await?;
        Ok(valuation::current_value(collateral, &buy_back))
    }

    /// Size a withdrawal of `eth_amount` base asset from a holder of
    /// `share_balance` shares.
    pub async fn size_withdraw(
        &self,
        eth_amount: Decimal,
        share_balance: Decimal,
        slippage: Option<Decimal>,
    ) -> Result<WithdrawSizing, CoreError> {
        let slippage = self.slippage_or_default(slippage)?;
        if !eth_amount.is_positive() {
            return Ok(WithdrawSizing::empty());
        }
        let Some((vault, supply)) = self.share_of_vault(share_balance).await? else {
            return Ok(WithdrawSizing::empty());
        };

        let current = self
            .unwind_value(&vault, supply, share_balance, slippage)
            .await?;
        let Some(shares) = valuation::shares_for_withdraw(eth_amount, current, share_balance) else {
            return Ok(WithdrawSizing::empty());
        };
        let share_amount = shares.min(share_balance);
        let debt_to_repay = valuation::debt_for_shares(share_amount, supply, &vault);
        let quote = if debt_to_repay.is_positive() {
            self.quotes.buy_quote(debt_to_repay, slippage).await?
        } else {
            BuyQuote::zero()
        };

        Ok(WithdrawSizing {
            share_amount,
            debt_to_repay,
            max_eth_to_pay: quote.maximum_amount_in,
            quote,
        })
    }

    /// Net deposited capital of `account`, folded from its full history.
    pub async fn position_snapshot(&self, account: &Address) -> Result<PositionSnapshot, CoreError> {
        let history = self.history.get_transaction_history(account).await?;
        let snapshot = fold_history(&history);
        tracing::debug!(
            account = %account,
            records = history.len(),
            principal = %snapshot.deposited_principal,
            "folded position history"
        );
        Ok(snapshot)
    }

    /// Deposited capital against current value, in ETH and USD.
    pub async fn position_report(
        &self,
        account: &Address,
        share_balance: Decimal,
        eth_index_price: Decimal,
        slippage: Option<Decimal>,
    ) -> Result<PositionReport, CoreError> {
        let (snapshot, current_eth) = futures::future::try_join(
            self.position_snapshot(account),
            self.current_value(share_balance, slippage),
        )
        .await?;
        Ok(PositionReport::new(snapshot, current_eth, eth_index_price))
    }

    async fn eth_twap(&self) -> Result<Decimal, OracleError> {
        self.twap
            .get_twap_price(
                &self.config.eth_usdc_pool,
                &self.config.weth,
                &self.config.usdc,
                self.config.twap_period_secs,
            )
            .await
    }

    async fn liquidity_position(
        &self,
        position_id: Option<u64>,
    ) -> Result<Option<LiquidityPosition>, OracleError> {
        match position_id {
            Some(id) => self.positions.get_liquidity_position(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Collateralization and liquidation price of `vault_id`, valuing debt
    /// at `params.normalization_factor`.
    ///
    /// A missing vault yields [`CollateralState::empty`]; an unavailable
    /// TWAP is returned as an error.
    pub async fn vault_risk(
        &self,
        vault_id: u64,
        params: &StrategyParameters,
        implied_vol: Decimal,
        is_weth_token0: bool,
    ) -> Result<CollateralState, CoreError> {
        let Some(vault) = self.strategy.get_vault(vault_id).await? else {
            return Ok(CollateralState::empty());
        };

        let (twap_price, position) = futures::future::try_join(
            self.eth_twap(),
            self.liquidity_position(vault.liquidity_position_id),
        )
        .await?;

        let ctx = PricingContext {
            norm_factor: params.normalization_factor,
            twap_price,
            implied_vol,
            is_weth_token0,
        };
        Ok(collateral::collateral_state(
            vault.collateral_amount,
            vault.short_amount,
            position.as_ref(),
            &ctx,
        ))
    }
}
