//! Pure computation engine(s) for strategy sizing and position accounting.
//!
//! Nothing in here performs I/O; every function is a deterministic function
//! of its inputs and returns a defined empty state instead of failing on
//! zero divisors.

pub mod collateral;
pub mod guard;
pub mod ledger;
pub mod lp_math;
pub mod solver;
pub mod valuation;

pub use collateral::{collateral_state, debt_in_base, short_amount_from_debt, PricingContext};
pub use guard::{evaluate, Advisory, FundingSnapshot, GuardError, GuardInputs, GuardOutcome, HedgeSignal};
pub use ledger::{eth_index_price, fold_history, fold_ledger, LedgerPhase, LedgerState, PositionReport};
pub use solver::{
    clamp_borrow_to_cap, solve_borrow_amount, BorrowSearch, BorrowSolution, Candidate,
    SolverSettings,
};
