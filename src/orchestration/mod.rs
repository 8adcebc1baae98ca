//! Async wiring of external collaborators into the pure engine, plus the
//! caller-owned cache for live values.

pub mod cache;
pub mod strategy;

pub use cache::{CacheEntry, Generation, VersionedCache};
pub use strategy::{CrabStrategy, DepositSizing, WithdrawSizing};
