//! Strategy transaction history records and the snapshot derived from them.

use crate::domain::{Decimal, TimeMs};
use serde::{Deserialize, Serialize};

/// Kind of strategy transaction as reported by the history indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    FlashDeposit,
    FlashWithdraw,
    Deposit,
    Withdraw,
    /// Any kind this version does not know about.
    #[serde(other)]
    Unknown,
}

/// One recorded strategy transaction. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Base asset moved by the transaction.
    pub eth_amount: Decimal,
    /// Strategy shares minted or burned.
    pub lp_amount: Decimal,
    /// USD value of `eth_amount` at the time of the transaction.
    pub eth_usd_value: Decimal,
    pub timestamp: TimeMs,
}

impl TransactionRecord {
    pub fn new(
        kind: TransactionKind,
        eth_amount: Decimal,
        lp_amount: Decimal,
        eth_usd_value: Decimal,
        timestamp: TimeMs,
    ) -> Self {
        Self {
            kind,
            eth_amount,
            lp_amount,
            eth_usd_value,
            timestamp,
        }
    }
}

/// Net capital a user has in the strategy, derived from their history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub deposited_principal: Decimal,
    pub deposited_usd_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_indexer_record() {
        let json = r#"{
            "type": "FLASH_DEPOSIT",
            "ethAmount": 5,
            "lpAmount": 10,
            "ethUsdValue": 9000,
            "timestamp": 1650000000000
        }"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, TransactionKind::FlashDeposit);
        assert_eq!(record.lp_amount, Decimal::from(10u64));
        assert_eq!(record.timestamp, TimeMs::new(1_650_000_000_000));
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let kind: TransactionKind = serde_json::from_str("\"HEDGE_ON_UNISWAP\"").unwrap();
        assert_eq!(kind, TransactionKind::Unknown);
    }
}
