//! Annualised IRR over irregularly dated cash flows.
//!
//! Solves Σ amount_i / (1 + r)^(days_i / 365) = 0 for `r`, where `days_i` is
//! counted from the earliest flow. Newton-Raphson runs first from the
//! configured guess; when it leaves the rate domain, hits a flat derivative
//! or exhausts its budget, bisection takes over on a bracketed interval.
//! Every step is bounded to `[min_rate, max_rate]`.

use chrono::NaiveDate;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::{CashFlow, IrrMethod};
use crate::errors::NonConvergenceError;
use crate::utils::time_utils::year_fraction;

/// Default relative tolerance: |NPV| must fall below this share of Σ|amount|.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default cap on total iterations (Newton and bisection together).
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Default Newton starting point (10% a year).
pub const DEFAULT_INITIAL_GUESS: f64 = 0.1;

/// Lowest admissible rate (-99.99%).
pub const MIN_RATE: f64 = -0.9999;

/// Highest admissible rate (+1000%).
pub const MAX_RATE: f64 = 10.0;

/// Share of Σ|amount| under which a flow counts as zero.
const DUST_THRESHOLD: f64 = 1e-9;

/// Slope under which a Newton step is not attempted.
const MIN_SLOPE: f64 = 1e-12;

/// Newton gets at most this many iterations before bisection takes over.
const NEWTON_BUDGET: u32 = 50;

/// Interior points probed when looking for a bisection bracket.
const BRACKET_PROBES: [f64; 13] = [
    -0.99, -0.95, -0.9, -0.75, -0.5, -0.25, 0.0, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0,
];

/// Configuration for the IRR solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverConfig {
    /// Relative tolerance for convergence.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// Newton starting point.
    pub initial_guess: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            initial_guess: DEFAULT_INITIAL_GUESS,
            min_rate: MIN_RATE,
            max_rate: MAX_RATE,
        }
    }
}

impl SolverConfig {
    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the Newton starting point.
    #[must_use]
    pub fn with_initial_guess(mut self, initial_guess: f64) -> Self {
        self.initial_guess = initial_guess;
        self
    }
}

/// A solved rate and how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrrSolution {
    pub rate: f64,
    pub iterations: u32,
    pub method: IrrMethod,
    /// NPV at `rate`.
    pub residual: f64,
}

/// Flows as (years since the earliest flow, amount).
fn to_series(flows: &[(NaiveDate, f64)]) -> Vec<(f64, f64)> {
    let Some(start) = flows.iter().map(|(date, _)| *date).min() else {
        return Vec::new();
    };
    flows
        .iter()
        .map(|(date, amount)| (year_fraction(start, *date), *amount))
        .collect()
}

fn series_npv(rate: f64, series: &[(f64, f64)]) -> f64 {
    let base = 1.0 + rate;
    series
        .iter()
        .map(|(years, amount)| amount / base.powf(*years))
        .sum()
}

fn series_npv_derivative(rate: f64, series: &[(f64, f64)]) -> f64 {
    let base = 1.0 + rate;
    series
        .iter()
        .map(|(years, amount)| -years * amount / base.powf(years + 1.0))
        .sum()
}

/// Net present value of dated flows at an annual rate, discounted to the
/// earliest flow date on an actual/365 basis.
pub fn npv(rate: f64, flows: &[(NaiveDate, f64)]) -> f64 {
    series_npv(rate, &to_series(flows))
}

/// First derivative of [`npv`] with respect to the rate.
pub fn npv_derivative(rate: f64, flows: &[(NaiveDate, f64)]) -> f64 {
    series_npv_derivative(rate, &to_series(flows))
}

/// Converts decimal cash flows to the solver's `f64` representation.
pub fn to_f64_flows(flows: &[CashFlow]) -> Vec<(NaiveDate, f64)> {
    flows
        .iter()
        .map(|flow| (flow.date, flow.amount.to_f64().unwrap_or(0.0)))
        .collect()
}

/// Solves for the annual IRR of dated flows (investor perspective).
///
/// Fewer than two flows, flows that never change sign, or a root outside
/// the configured domain produce a `NonConvergenceError`. A series whose
/// flows are all effectively zero solves to 0%.
pub fn solve_irr(
    flows: &[(NaiveDate, f64)],
    config: &SolverConfig,
) -> Result<IrrSolution, NonConvergenceError> {
    if flows.len() < 2 {
        return Err(NonConvergenceError::InsufficientCashFlows { count: flows.len() });
    }

    let series = to_series(flows);
    let scale: f64 = series.iter().map(|(_, amount)| amount.abs()).sum();
    if scale <= DUST_THRESHOLD {
        return Ok(IrrSolution {
            rate: 0.0,
            iterations: 0,
            method: IrrMethod::Flat,
            residual: 0.0,
        });
    }

    let dust = scale * DUST_THRESHOLD;
    let has_inflow = series.iter().any(|(_, amount)| *amount > dust);
    let has_outflow = series.iter().any(|(_, amount)| *amount < -dust);
    if !(has_inflow && has_outflow) {
        return Err(NonConvergenceError::NoSignChange);
    }

    let target = config.tolerance * scale;
    let newton_budget = config.max_iterations.min(NEWTON_BUDGET);

    match newton(&series, config, newton_budget, target) {
        Ok(solution) => Ok(solution),
        Err(used) => {
            log::debug!("Newton stopped after {} iterations, falling back to bisection", used);
            bisection(&series, config, used, target)
        }
    }
}

/// Convenience wrapper over [`solve_irr`] for decimal cash flows.
pub fn solve_cash_flows(
    flows: &[CashFlow],
    config: &SolverConfig,
) -> Result<IrrSolution, NonConvergenceError> {
    solve_irr(&to_f64_flows(flows), config)
}

/// Newton-Raphson inside the rate domain. On failure returns the number of
/// iterations spent.
fn newton(
    series: &[(f64, f64)],
    config: &SolverConfig,
    budget: u32,
    target: f64,
) -> Result<IrrSolution, u32> {
    let mut rate = config.initial_guess.clamp(config.min_rate, config.max_rate);

    for iteration in 0..budget {
        let value = series_npv(rate, series);
        if !value.is_finite() {
            return Err(iteration);
        }
        if value.abs() <= target {
            return Ok(IrrSolution {
                rate,
                iterations: iteration,
                method: IrrMethod::Newton,
                residual: value,
            });
        }

        let slope = series_npv_derivative(rate, series);
        if !slope.is_finite() || slope.abs() < MIN_SLOPE {
            return Err(iteration + 1);
        }

        let next = rate - value / slope;
        if !next.is_finite() || next < config.min_rate || next > config.max_rate {
            return Err(iteration + 1);
        }
        rate = next;
    }

    Err(budget)
}

/// Sign of the NPV, treating non-finite values by their sign.
fn npv_sign(rate: f64, series: &[(f64, f64)]) -> Option<f64> {
    let value = series_npv(rate, series);
    if value.is_nan() {
        None
    } else {
        Some(value.signum())
    }
}

/// Finds the bracketing interval with a sign change nearest the guess.
fn find_bracket(series: &[(f64, f64)], config: &SolverConfig) -> Option<(f64, f64)> {
    let mut points = vec![config.min_rate];
    points.extend(
        BRACKET_PROBES
            .iter()
            .copied()
            .filter(|p| *p > config.min_rate && *p < config.max_rate),
    );
    points.push(config.max_rate);

    let mut best: Option<(f64, f64)> = None;
    for pair in points.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let (Some(s_lo), Some(s_hi)) = (npv_sign(lo, series), npv_sign(hi, series)) else {
            continue;
        };
        if s_lo * s_hi > 0.0 {
            continue;
        }
        let distance = |(a, b): (f64, f64)| ((a + b) / 2.0 - config.initial_guess).abs();
        if best.map_or(true, |current| distance((lo, hi)) < distance(current)) {
            best = Some((lo, hi));
        }
    }
    best
}

fn bisection(
    series: &[(f64, f64)],
    config: &SolverConfig,
    used: u32,
    target: f64,
) -> Result<IrrSolution, NonConvergenceError> {
    let (mut lo, mut hi) =
        find_bracket(series, config).ok_or(NonConvergenceError::NoRootInDomain {
            min_rate: config.min_rate,
            max_rate: config.max_rate,
        })?;
    let mut f_lo = series_npv(lo, series);

    let mut iterations = used;
    let mut mid = (lo + hi) / 2.0;
    let mut f_mid = series_npv(mid, series);
    while iterations < config.max_iterations {
        iterations += 1;
        mid = (lo + hi) / 2.0;
        f_mid = series_npv(mid, series);

        if f_mid.abs() <= target || (hi - lo) / 2.0 <= f64::EPSILON * mid.abs().max(1.0) {
            return Ok(IrrSolution {
                rate: mid,
                iterations,
                method: IrrMethod::Bisection,
                residual: f_mid,
            });
        }

        if f_lo.signum() * f_mid.signum() <= 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    log::debug!("Bisection exhausted at rate {} with residual {}", mid, f_mid);
    Err(NonConvergenceError::IterationLimit {
        iterations,
        residual: f_mid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::date;

    #[test]
    fn test_one_year_ten_percent() {
        let flows = vec![(date(2023, 1, 1), -100.0), (date(2024, 1, 1), 110.0)];
        let solution = solve_irr(&flows, &SolverConfig::default()).unwrap();
        assert!((solution.rate - 0.10).abs() < 1e-5);
        assert!(npv(solution.rate, &flows).abs() < 1e-4);
    }

    #[test]
    fn test_insufficient_flows() {
        let err = solve_irr(&[(date(2023, 1, 1), -100.0)], &SolverConfig::default()).unwrap_err();
        assert_eq!(err, NonConvergenceError::InsufficientCashFlows { count: 1 });
        let err = solve_irr(&[], &SolverConfig::default()).unwrap_err();
        assert_eq!(err, NonConvergenceError::InsufficientCashFlows { count: 0 });
    }

    #[test]
    fn test_same_sign_flows_do_not_converge() {
        let positive = vec![(date(2023, 1, 1), 100.0), (date(2024, 1, 1), 110.0)];
        assert_eq!(
            solve_irr(&positive, &SolverConfig::default()).unwrap_err(),
            NonConvergenceError::NoSignChange
        );
        let negative = vec![(date(2023, 1, 1), -100.0), (date(2024, 1, 1), -5.0)];
        assert_eq!(
            solve_irr(&negative, &SolverConfig::default()).unwrap_err(),
            NonConvergenceError::NoSignChange
        );
    }

    #[test]
    fn test_near_zero_flows_are_flat() {
        let flows = vec![(date(2023, 1, 1), 1e-12), (date(2024, 1, 1), -1e-12)];
        let solution = solve_irr(&flows, &SolverConfig::default()).unwrap();
        assert_eq!(solution.rate, 0.0);
        assert_eq!(solution.method, IrrMethod::Flat);
    }

    #[test]
    fn test_total_loss_hits_lower_bound() {
        // Everything lost within a month: the root is below -99.99%.
        let flows = vec![(date(2023, 1, 1), -100.0), (date(2023, 2, 1), 1e-6)];
        let err = solve_irr(&flows, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, NonConvergenceError::NoRootInDomain { .. }));
    }

    #[test]
    fn test_bisection_finds_root_inside_bracket() {
        let flows = vec![(date(2023, 1, 1), -100.0), (date(2023, 7, 1), 300.0)];
        let series = to_series(&flows);
        let config = SolverConfig::default();

        let solution = bisection(&series, &config, 0, 1e-6 * 400.0).unwrap();

        assert_eq!(solution.method, IrrMethod::Bisection);
        assert!(npv(solution.rate, &flows).abs() <= 1e-6 * 400.0);
        assert!(solution.rate > 5.0 && solution.rate < MAX_RATE);
    }

    #[test]
    fn test_newton_recovers_from_poor_guess() {
        let flows = vec![(date(2023, 1, 1), -100.0), (date(2023, 7, 1), 300.0)];
        let config = SolverConfig::default().with_initial_guess(-0.99);
        let solution = solve_irr(&flows, &config).unwrap();
        assert!(npv(solution.rate, &flows).abs() <= 1e-6 * 400.0);
    }

    #[test]
    fn test_multiple_contributions_and_withdrawals() {
        let flows = vec![
            (date(2020, 1, 15), -10_000.0),
            (date(2020, 7, 1), -2_500.0),
            (date(2021, 3, 10), 1_000.0),
            (date(2022, 11, 30), -4_000.0),
            (date(2024, 6, 30), 19_750.0),
        ];
        let solution = solve_irr(&flows, &SolverConfig::default()).unwrap();
        let scale: f64 = flows.iter().map(|(_, a)| f64::abs(*a)).sum();
        assert!(npv(solution.rate, &flows).abs() <= DEFAULT_TOLERANCE * scale);
        assert!(solution.iterations <= DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_negative_rate() {
        let flows = vec![(date(2023, 1, 1), -100.0), (date(2024, 1, 1), 80.0)];
        let solution = solve_irr(&flows, &SolverConfig::default()).unwrap();
        assert!((solution.rate + 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let flows = vec![
            (date(2023, 1, 1), -100.0),
            (date(2023, 9, 1), -50.0),
            (date(2024, 6, 1), 170.0),
        ];
        let h = 1e-6;
        let numeric = (npv(0.05 + h, &flows) - npv(0.05 - h, &flows)) / (2.0 * h);
        assert!((npv_derivative(0.05, &flows) - numeric).abs() < 1e-3);
    }

    #[test]
    fn test_flow_order_does_not_matter() {
        let ordered = vec![(date(2023, 1, 1), -100.0), (date(2024, 1, 1), 110.0)];
        let reversed = vec![(date(2024, 1, 1), 110.0), (date(2023, 1, 1), -100.0)];
        let a = solve_irr(&ordered, &SolverConfig::default()).unwrap();
        let b = solve_irr(&reversed, &SolverConfig::default()).unwrap();
        assert!((a.rate - b.rate).abs() < 1e-9);
    }
}
