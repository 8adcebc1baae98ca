//! Domain types for the crab strategy engine.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeMs, Address
//! - Quotes, vaults, liquidity positions and transaction records
//! - Strategy parameters and derived collateral state

pub mod decimal;
pub mod primitives;
pub mod quote;
pub mod strategy;
pub mod transaction;
pub mod vault;

pub use decimal::Decimal;
pub use primitives::{Address, TimeMs};
pub use quote::{BuyQuote, Quote};
pub use strategy::{CollateralState, StrategyParameters};
pub use transaction::{PositionSnapshot, TransactionKind, TransactionRecord};
pub use vault::{LiquidityPosition, PositionShape, Vault};
