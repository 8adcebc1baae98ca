//! Flash-loan borrow sizing.
//!
//! A deposit is levered by flash-borrowing `deposit * m` of the base asset,
//! minting derivative debt against `deposit + borrow` at the vault's current
//! debt/collateral ratio, and selling that debt to repay the loan. The
//! multiplier `m` is found by bisection until the sale's minimum proceeds
//! cover the borrow by at most `tolerance`.

use crate::domain::{Decimal, Quote, Vault};
use rust_decimal_macros::dec;
use serde::Serialize;

/// Lowest borrow multiplier the search considers.
pub const MIN_BORROW_MULTIPLIER: Decimal = Decimal::new(dec!(0.25));
/// Highest borrow multiplier the search considers.
pub const MAX_BORROW_MULTIPLIER: Decimal = Decimal::new(dec!(3));
/// Accepted excess of proceeds over borrow (1 basis point).
pub const DEFAULT_TOLERANCE: Decimal = Decimal::new(dec!(0.0001));
/// Interval width, in multiplier units, at which the search gives up
/// narrowing; about 15 halvings of the initial range.
pub const DEFAULT_MIN_STEP: Decimal = Decimal::new(dec!(0.0001));
/// Safety stop; the interval closes well before this.
pub const DEFAULT_MAX_ITERATIONS: u32 = 128;

const TWO: Decimal = Decimal::new(dec!(2));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverSettings {
    pub tolerance: Decimal,
    pub min_step: Decimal,
    pub max_iterations: u32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            min_step: DEFAULT_MIN_STEP,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Outcome of a borrow search.
///
/// `converged` is false when the search ran out of room or iterations and
/// `borrow_amount` is only the closest candidate seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSolution {
    pub borrow_amount: Decimal,
    pub multiplier: Decimal,
    pub quote: Quote,
    pub converged: bool,
    pub iterations: u32,
}

impl BorrowSolution {
    /// Result for a zero deposit or an unusable vault.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// A multiplier the search wants priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub multiplier: Decimal,
    pub borrow: Decimal,
    /// Derivative tokens minted for `deposit + borrow` collateral; the
    /// amount to quote for sale.
    pub debt_to_mint: Decimal,
}

/// Bisection state, driven by a caller that prices each [`Candidate`].
///
/// Holds no references to the oracle so a superseded search can simply be
/// dropped.
#[derive(Debug, Clone)]
pub struct BorrowSearch {
    deposit: Decimal,
    debt_per_collateral: Decimal,
    lower: Decimal,
    upper: Decimal,
    settings: SolverSettings,
    pending: Option<Candidate>,
    best: BorrowSolution,
    done: bool,
}

impl BorrowSearch {
    /// Start a search. Returns `None` when there is nothing to size: a
    /// non-positive deposit or a vault without collateral.
    pub fn new(deposit: Decimal, vault: &Vault, settings: SolverSettings) -> Option<Self> {
        if !deposit.is_positive() {
            return None;
        }
        let debt_per_collateral = vault.debt_per_collateral()?;

        Some(Self {
            deposit,
            debt_per_collateral,
            lower: MIN_BORROW_MULTIPLIER,
            upper: MAX_BORROW_MULTIPLIER,
            settings,
            pending: None,
            best: BorrowSolution::zero(),
            done: false,
        })
    }

    /// Next multiplier to price, or `None` once the search has finished.
    pub fn next_candidate(&mut self) -> Option<Candidate> {
        if let Some(pending) = self.pending {
            return Some(pending);
        }
        if self.done
            || self.upper - self.lower < self.settings.min_step
            || self.best.iterations >= self.settings.max_iterations
        {
            self.done = true;
            return None;
        }

        let multiplier = self.lower + (self.upper - self.lower) / TWO;
        let Some(candidate) = self.price_candidate(multiplier) else {
            tracing::warn!(
                deposit = %self.deposit,
                multiplier = %multiplier,
                "borrow candidate overflowed decimal range"
            );
            self.done = true;
            return None;
        };
        self.pending = Some(candidate);
        Some(candidate)
    }

    fn price_candidate(&self, multiplier: Decimal) -> Option<Candidate> {
        let borrow = self.deposit.checked_mul(multiplier)?;
        let debt_to_mint = borrow
            .checked_add(self.deposit)?
            .checked_mul(self.debt_per_collateral)?;
        Some(Candidate {
            multiplier,
            borrow,
            debt_to_mint,
        })
    }

    /// Feed the sell quote for the last candidate.
    pub fn observe(&mut self, quote: Quote) {
        let Some(candidate) = self.pending.take() else {
            return;
        };
        let iteration = self.best.iterations + 1;

        if quote.minimum_amount_out == self.best.quote.minimum_amount_out {
            // Proceeds no longer move; a zero quote on the first pass means
            // the pool gave us nothing to work with.
            self.best.iterations = iteration;
            self.best.converged = iteration > 1;
            self.done = true;
            return;
        }

        self.best = BorrowSolution {
            borrow_amount: candidate.borrow,
            multiplier: candidate.multiplier,
            quote,
            converged: false,
            iterations: iteration,
        };

        // Proceeds too large to divide by the borrow are far above it.
        let ratio = quote
            .minimum_amount_out
            .checked_div(candidate.borrow)
            .map(|cover| cover - Decimal::one());
        let under_sized = ratio.map_or(true, |ratio| ratio.is_positive());
        if ratio.is_some_and(|ratio| ratio.is_positive() && ratio <= self.settings.tolerance) {
            self.best.converged = true;
            self.done = true;
        } else if under_sized {
            self.lower = candidate.multiplier;
        } else {
            self.upper = candidate.multiplier;
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Best candidate seen so far.
    pub fn finish(self) -> BorrowSolution {
        if !self.best.converged {
            tracing::warn!(
                deposit = %self.deposit,
                borrow = %self.best.borrow_amount,
                iterations = self.best.iterations,
                "borrow search ended without converging; using closest candidate"
            );
        }
        self.best
    }
}

/// Size the flash borrow for `deposit` using a synchronous quote function
/// `sell_quote(debt_to_sell, slippage)`.
///
/// A failing quote aborts the search and its error is returned as-is.
pub fn solve_borrow_amount<F, E>(
    deposit: Decimal,
    vault: &Vault,
    slippage: Decimal,
    settings: SolverSettings,
    mut sell_quote: F,
) -> Result<BorrowSolution, E>
where
    F: FnMut(Decimal, Decimal) -> Result<Quote, E>,
{
    let Some(mut search) = BorrowSearch::new(deposit, vault, settings) else {
        return Ok(BorrowSolution::zero());
    };

    while let Some(candidate) = search.next_candidate() {
        let quote = sell_quote(candidate.debt_to_mint, slippage)?;
        search.observe(quote);
    }

    let solution = search.finish();
    tracing::debug!(
        deposit = %deposit,
        borrow = %solution.borrow_amount,
        multiplier = %solution.multiplier,
        iterations = solution.iterations,
        converged = solution.converged,
        "solved flash borrow"
    );
    Ok(solution)
}

/// Clamp a solved borrow so `deposit + vault_collateral + borrow` stays
/// within `max_capacity`. Never returns a negative borrow.
pub fn clamp_borrow_to_cap(
    deposit: Decimal,
    vault_collateral: Decimal,
    max_capacity: Decimal,
    borrow: Decimal,
) -> Decimal {
    let headroom = deposit
        .checked_add(vault_collateral)
        .and_then(|committed| max_capacity.checked_sub(committed))
        .map_or(Decimal::zero(), Decimal::clamp_non_negative);
    if borrow > headroom {
        tracing::warn!(
            borrow = %borrow,
            headroom = %headroom,
            "flash borrow clamped to strategy cap"
        );
    }
    borrow.min(headroom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn linear_quote(price: Decimal) -> impl FnMut(Decimal, Decimal) -> Result<Quote, Infallible> {
        move |amount, slippage| Ok(Quote::with_slippage(amount * price, slippage, Decimal::zero()))
    }

    #[test]
    fn zero_deposit_skips_the_oracle() {
        let vault = Vault::new(1, d("100"), d("50"));
        let mut calls = 0;
        let solution = solve_borrow_amount(
            Decimal::zero(),
            &vault,
            d("0.005"),
            SolverSettings::default(),
            |_, _| {
                calls += 1;
                Ok::<_, Infallible>(Quote::zero())
            },
        )
        .unwrap();
        assert_eq!(solution, BorrowSolution::zero());
        assert_eq!(calls, 0);
    }

    #[test]
    fn empty_vault_yields_zero_state() {
        let vault = Vault::new(1, Decimal::zero(), Decimal::zero());
        let solution =
            solve_borrow_amount(d("1"), &vault, d("0"), SolverSettings::default(), linear_quote(d("1")))
                .unwrap();
        assert_eq!(solution.borrow_amount, Decimal::zero());
    }

    #[test]
    fn first_candidate_is_interval_midpoint() {
        let vault = Vault::new(1, d("100"), d("50"));
        let mut search = BorrowSearch::new(d("10"), &vault, SolverSettings::default()).unwrap();
        let candidate = search.next_candidate().unwrap();
        assert_eq!(candidate.multiplier, d("1.625"));
        assert_eq!(candidate.borrow, d("16.25"));
        assert_eq!(candidate.debt_to_mint, d("13.125"));
        // Asking again before observing returns the same candidate.
        assert_eq!(search.next_candidate(), Some(candidate));
    }

    #[test]
    fn converges_within_one_basis_point() {
        let vault = Vault::new(1, d("100"), d("50"));
        let solution =
            solve_borrow_amount(d("10"), &vault, d("0"), SolverSettings::default(), linear_quote(d("1")))
                .unwrap();

        assert!(solution.converged);
        let ratio = solution.quote.minimum_amount_out / solution.borrow_amount - Decimal::one();
        assert!(ratio.is_positive());
        assert!(ratio <= DEFAULT_TOLERANCE);
        assert!(solution.multiplier >= MIN_BORROW_MULTIPLIER);
        assert!(solution.multiplier <= MAX_BORROW_MULTIPLIER);
        assert!(solution.iterations <= 20, "took {} iterations", solution.iterations);
    }

    #[test]
    fn quote_errors_abort_the_search() {
        let vault = Vault::new(1, d("100"), d("50"));
        let result = solve_borrow_amount(d("10"), &vault, d("0"), SolverSettings::default(), |_, _| {
            Err::<Quote, _>("pool unavailable")
        });
        assert_eq!(result, Err("pool unavailable"));
    }

    #[test]
    fn stagnant_quotes_stop_the_search() {
        let vault = Vault::new(1, d("100"), d("50"));
        let solution = solve_borrow_amount(
            d("10"),
            &vault,
            d("0"),
            SolverSettings::default(),
            |_, _| Ok::<_, Infallible>(Quote::new(d("7"), d("7"), Decimal::zero())),
        )
        .unwrap();
        assert_eq!(solution.iterations, 2);
        assert_eq!(solution.quote.minimum_amount_out, d("7"));
        assert_eq!(solution.multiplier, d("1.625"));
    }

    #[test]
    fn zero_quote_on_first_pass_is_not_converged() {
        let vault = Vault::new(1, d("100"), d("50"));
        let solution = solve_borrow_amount(
            d("10"),
            &vault,
            d("0"),
            SolverSettings::default(),
            |_, _| Ok::<_, Infallible>(Quote::zero()),
        )
        .unwrap();
        assert!(!solution.converged);
        assert_eq!(solution.borrow_amount, Decimal::zero());
    }

    #[test]
    fn clamp_respects_headroom() {
        assert_eq!(clamp_borrow_to_cap(d("10"), d("100"), d("200"), d("30")), d("30"));
        assert_eq!(clamp_borrow_to_cap(d("10"), d("100"), d("120"), d("30")), d("10"));
        assert_eq!(clamp_borrow_to_cap(d("10"), d("100"), d("105"), d("30")), Decimal::zero());
        assert_eq!(clamp_borrow_to_cap(Decimal::MAX, d("100"), d("200"), d("30")), Decimal::zero());
    }
}
