//! External collaborators the engine reads from: pool quotes, vault state,
//! TWAP prices, liquidity positions and transaction history.
//!
//! Implementations own transport, retry and backoff. The engine never
//! retries; a failed call aborts the computation that made it.

use crate::domain::{Address, BuyQuote, Decimal, LiquidityPosition, Quote, TransactionRecord, Vault};
use async_trait::async_trait;
use std::fmt;

pub mod mock;

pub use mock::MockOracle;

/// Swap pricing on the derivative/base pool.
#[async_trait]
pub trait QuoteOracle: Send + Sync + fmt::Debug {
    /// Quote selling exactly `amount_in` derivative tokens for the base asset.
    async fn sell_quote(&self, amount_in: Decimal, slippage: Decimal) -> Result<Quote, OracleError>;

    /// Quote buying exactly `amount_out` derivative tokens with the base asset.
    async fn buy_quote(&self, amount_out: Decimal, slippage: Decimal)
        -> Result<BuyQuote, OracleError>;
}

/// Strategy contract and controller state.
#[async_trait]
pub trait StrategySource: Send + Sync + fmt::Debug {
    /// Vault by id, or `None` if it does not exist.
    async fn get_vault(&self, vault_id: u64) -> Result<Option<Vault>, OracleError>;

    /// Total strategy shares outstanding.
    async fn share_supply(&self) -> Result<Decimal, OracleError>;
}

/// Time-weighted average prices.
#[async_trait]
pub trait TwapOracle: Send + Sync + fmt::Debug {
    /// TWAP of `base` in `quote` on `pool` over `period_secs`.
    ///
    /// Fails with [`OracleError::Unavailable`] when the pool lacks enough
    /// observation history for the period.
    async fn get_twap_price(
        &self,
        pool: &Address,
        base: &Address,
        quote: &Address,
        period_secs: u32,
    ) -> Result<Decimal, OracleError>;
}

#[async_trait]
pub trait LiquidityPositionSource: Send + Sync + fmt::Debug {
    async fn get_liquidity_position(&self, position_id: u64)
        -> Result<LiquidityPosition, OracleError>;
}

/// Append-only strategy transaction history.
#[async_trait]
pub trait HistorySource: Send + Sync + fmt::Debug {
    /// Records for `account`, oldest first.
    async fn get_transaction_history(
        &self,
        account: &Address,
    ) -> Result<Vec<TransactionRecord>, OracleError>;
}

/// Error type for collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Price source cannot answer (e.g. insufficient TWAP observations).
    Unavailable(String),
    /// Answer is older than the caller accepts.
    Stale { age_secs: u64 },
    /// Requested object does not exist.
    NotFound(String),
    /// Transport-level failure.
    Transport(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Unavailable(msg) => write!(f, "Oracle unavailable: {}", msg),
            OracleError::Stale { age_secs } => write!(f, "Oracle data stale by {}s", age_secs),
            OracleError::NotFound(msg) => write!(f, "Not found: {}", msg),
            OracleError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for OracleError {}
