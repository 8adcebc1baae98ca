//! In-memory collaborators for tests and offline use.

use super::{
    HistorySource, LiquidityPositionSource, OracleError, QuoteOracle, StrategySource, TwapOracle,
};
use crate::domain::{Address, BuyQuote, Decimal, LiquidityPosition, Quote, TransactionRecord, Vault};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock implementing every collaborator trait from predefined data.
///
/// Quotes are linear: selling `x` derivative tokens returns
/// `x * derivative_price` and buying `x` costs `x * derivative_price`.
#[derive(Debug, Clone)]
pub struct MockOracle {
    derivative_price: Decimal,
    price_impact_pct: Decimal,
    quotes_fail: bool,
    quote_calls: Arc<AtomicUsize>,
    vaults: HashMap<u64, Vault>,
    share_supply: Decimal,
    twap: Option<Decimal>,
    positions: HashMap<u64, LiquidityPosition>,
    history: HashMap<Address, Vec<TransactionRecord>>,
}

impl MockOracle {
    /// Create a mock with no data; quotes price the derivative at 0.
    pub fn new() -> Self {
        Self {
            derivative_price: Decimal::zero(),
            price_impact_pct: Decimal::zero(),
            quotes_fail: false,
            quote_calls: Arc::new(AtomicUsize::new(0)),
            vaults: HashMap::new(),
            share_supply: Decimal::zero(),
            twap: None,
            positions: HashMap::new(),
            history: HashMap::new(),
        }
    }

    /// Set the derivative price in the base asset used for quotes.
    pub fn with_derivative_price(mut self, price: Decimal) -> Self {
        self.derivative_price = price;
        self
    }

    pub fn with_price_impact(mut self, price_impact_pct: Decimal) -> Self {
        self.price_impact_pct = price_impact_pct;
        self
    }

    /// Make every quote fail with [`OracleError::Unavailable`].
    pub fn with_failing_quotes(mut self) -> Self {
        self.quotes_fail = true;
        self
    }

    pub fn with_vault(mut self, vault: Vault) -> Self {
        self.vaults.insert(vault.id, vault);
        self
    }

    pub fn with_share_supply(mut self, supply: Decimal) -> Self {
        self.share_supply = supply;
        self
    }

    /// Set the TWAP price; without one, TWAP lookups are unavailable.
    pub fn with_twap(mut self, price: Decimal) -> Self {
        self.twap = Some(price);
        self
    }

    pub fn with_liquidity_position(mut self, position_id: u64, position: LiquidityPosition) -> Self {
        self.positions.insert(position_id, position);
        self
    }

    pub fn with_history(mut self, account: Address, records: Vec<TransactionRecord>) -> Self {
        self.history.entry(account).or_default().extend(records);
        self
    }

    /// Number of sell and buy quotes served so far.
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    fn record_quote(&self) -> Result<(), OracleError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.quotes_fail {
            return Err(OracleError::Unavailable("quoter offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteOracle for MockOracle {
    async fn sell_quote(&self, amount_in: Decimal, slippage: Decimal) -> Result<Quote, OracleError> {
        self.record_quote()?;
        Ok(Quote::with_slippage(
            amount_in * self.derivative_price,
            slippage,
            self.price_impact_pct,
        ))
    }

    async fn buy_quote(
        &self,
        amount_out: Decimal,
        slippage: Decimal,
    ) -> Result<BuyQuote, OracleError> {
        self.record_quote()?;
        Ok(BuyQuote::with_slippage(
            amount_out * self.derivative_price,
            slippage,
            self.price_impact_pct,
        ))
    }
}

#[async_trait]
impl StrategySource for MockOracle {
    async fn get_vault(&self, vault_id: u64) -> Result<Option<Vault>, OracleError> {
        Ok(self.vaults.get(&vault_id).cloned())
    }

    async fn share_supply(&self) -> Result<Decimal, OracleError> {
        Ok(self.share_supply)
    }
}

#[async_trait]
impl TwapOracle for MockOracle {
    async fn get_twap_price(
        &self,
        _pool: &Address,
        _base: &Address,
        _quote: &Address,
        period_secs: u32,
    ) -> Result<Decimal, OracleError> {
        self.twap.ok_or_else(|| {
            OracleError::Unavailable(format!("no observations for {}s window", period_secs))
        })
    }
}

#[async_trait]
impl LiquidityPositionSource for MockOracle {
    async fn get_liquidity_position(
        &self,
        position_id: u64,
    ) -> Result<LiquidityPosition, OracleError> {
        self.positions
            .get(&position_id)
            .copied()
            .ok_or_else(|| OracleError::NotFound(format!("liquidity position {}", position_id)))
    }
}

#[async_trait]
impl HistorySource for MockOracle {
    async fn get_transaction_history(
        &self,
        account: &Address,
    ) -> Result<Vec<TransactionRecord>, OracleError> {
        Ok(self.history.get(account).cloned().unwrap_or_default())
    }
}
