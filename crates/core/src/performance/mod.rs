//! Performance module - flow classification, IRR solver and IRR service.

mod flow_classifier;
mod irr_solver;
mod performance_model;
mod performance_service;
mod performance_traits;


pub use flow_classifier::{
    classify_flow, external_cash_flows, is_external_flow, FlowScope, FlowType, FlowWindow,
};
pub use irr_solver::{
    npv, npv_derivative, solve_cash_flows, solve_irr, to_f64_flows, IrrSolution, SolverConfig,
    DEFAULT_INITIAL_GUESS, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, MAX_RATE, MIN_RATE,
};
pub use performance_model::*;
pub use performance_service::{merge_flows, IrrCalculator};
pub use performance_traits::IrrResultRepositoryTrait;
