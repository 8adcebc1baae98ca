use crate::domain::{Decimal, PositionSnapshot, TransactionKind, TransactionRecord};
use serde::Serialize;

/// Whether the user currently holds strategy shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerPhase {
    /// No shares held; cost basis is zero.
    #[default]
    Closed,
    Open,
}

/// Running totals while folding a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerState {
    pub phase: LedgerPhase,
    pub principal: Decimal,
    pub lp_balance: Decimal,
    pub usd_value: Decimal,
    /// Number of times the share balance returned to exactly zero.
    pub closures: u32,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one record.
    ///
    /// Flash deposits add to every accumulator and flash withdrawals
    /// subtract; other kinds leave the totals alone. Whenever the share
    /// balance lands on exactly zero the position is closed and the
    /// principal and USD basis reset to zero.
    pub fn step(mut self, record: &TransactionRecord) -> Self {
        match record.kind {
            TransactionKind::FlashDeposit => {
                self.principal += record.eth_amount;
                self.lp_balance += record.lp_amount;
                self.usd_value += record.eth_usd_value;
            }
            TransactionKind::FlashWithdraw => {
                self.principal -= record.eth_amount;
                self.lp_balance -= record.lp_amount;
                self.usd_value -= record.eth_usd_value;
            }
            TransactionKind::Deposit | TransactionKind::Withdraw | TransactionKind::Unknown => {}
        }

        if self.lp_balance.is_zero() {
            if self.phase == LedgerPhase::Open {
                self.closures += 1;
            }
            self.phase = LedgerPhase::Closed;
            self.principal = Decimal::zero();
            self.usd_value = Decimal::zero();
        } else {
            self.phase = LedgerPhase::Open;
        }

        self
    }

    pub fn is_closed(&self) -> bool {
        self.phase == LedgerPhase::Closed
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            deposited_principal: self.principal,
            deposited_usd_value: self.usd_value,
        }
    }
}

/// Fold a history, oldest record first, into the final ledger state.
pub fn fold_ledger(history: &[TransactionRecord]) -> LedgerState {
    history.iter().fold(LedgerState::new(), LedgerState::step)
}

/// Net deposited principal and USD basis after the last record.
pub fn fold_history(history: &[TransactionRecord]) -> PositionSnapshot {
    fold_ledger(history).snapshot()
}

/// Current value of a position against its cost basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub deposited_eth: Decimal,
    pub deposited_usd: Decimal,
    pub current_eth: Decimal,
    pub current_usd: Decimal,
    pub pnl_usd: Decimal,
    /// `None` when nothing is deposited.
    pub pnl_pct: Option<Decimal>,
}

impl PositionReport {
    pub fn new(snapshot: PositionSnapshot, current_eth: Decimal, eth_index_price: Decimal) -> Self {
        let current_usd = current_eth * eth_index_price;
        let pnl_usd = current_usd - snapshot.deposited_usd_value;
        let pnl_pct = if snapshot.deposited_usd_value.is_zero() {
            None
        } else {
            pnl_usd
                .checked_div(snapshot.deposited_usd_value)
                .map(|ratio| ratio * Decimal::hundred())
        };

        Self {
            deposited_eth: snapshot.deposited_principal,
            deposited_usd: snapshot.deposited_usd_value,
            current_eth,
            current_usd,
            pnl_usd,
            pnl_pct,
        }
    }
}

/// ETH/USD price from the squared-ETH index.
pub fn eth_index_price(index: Decimal) -> Option<Decimal> {
    index.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeMs;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn record(kind: TransactionKind, eth: &str, lp: &str, usd: &str) -> TransactionRecord {
        TransactionRecord::new(kind, d(eth), d(lp), d(usd), TimeMs::new(0))
    }

    #[test]
    fn step_opens_and_closes() {
        let state = LedgerState::new()
            .step(&record(TransactionKind::FlashDeposit, "5", "10", "9000"));
        assert_eq!(state.phase, LedgerPhase::Open);
        assert_eq!(state.principal, d("5"));

        let state = state.step(&record(TransactionKind::FlashWithdraw, "4", "10", "8000"));
        assert!(state.is_closed());
        assert_eq!(state.principal, Decimal::zero());
        assert_eq!(state.usd_value, Decimal::zero());
        assert_eq!(state.closures, 1);
    }

    #[test]
    fn non_flash_kinds_are_ignored() {
        let state = LedgerState::new()
            .step(&record(TransactionKind::FlashDeposit, "1", "2", "3"))
            .step(&record(TransactionKind::Deposit, "100", "100", "100"))
            .step(&record(TransactionKind::Unknown, "100", "100", "100"));
        assert_eq!(state.principal, d("1"));
        assert_eq!(state.lp_balance, d("2"));
    }

    #[test]
    fn report_guards_zero_basis() {
        let report = PositionReport::new(PositionSnapshot::default(), d("1"), d("2000"));
        assert_eq!(report.current_usd, d("2000"));
        assert_eq!(report.pnl_pct, None);
    }

    #[test]
    fn report_computes_pnl() {
        let snapshot = PositionSnapshot {
            deposited_principal: d("5"),
            deposited_usd_value: d("10000"),
        };
        let report = PositionReport::new(snapshot, d("5.5"), d("2000"));
        assert_eq!(report.current_usd, d("11000"));
        assert_eq!(report.pnl_usd, d("1000"));
        assert_eq!(report.pnl_pct, Some(d("10")));
    }

    #[test]
    fn index_price_is_square_root() {
        let price = eth_index_price(d("4000000")).unwrap();
        assert!((price - d("2000")).abs() < d("0.000000001"));
        assert_eq!(eth_index_price(d("-1")), None);
    }
}
