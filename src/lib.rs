pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod orchestration;

pub use config::EngineConfig;
pub use domain::{
    Address, BuyQuote, CollateralState, Decimal, LiquidityPosition, PositionShape,
    PositionSnapshot, Quote, StrategyParameters, TimeMs, TransactionKind, TransactionRecord, Vault,
};
pub use error::CoreError;
pub use oracle::{MockOracle, OracleError};
pub use orchestration::{CrabStrategy, DepositSizing, VersionedCache, WithdrawSizing};
