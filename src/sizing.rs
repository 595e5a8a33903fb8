//! Sizing of a solar array and battery to serve an hourly load at minimum capital cost.
//!
//! The optimisation is split into two stages:
//!
//! 1. [`build_model`] turns the load and capacity factor profiles plus the technology parameters
//!    into a [`SizingModel`]: a plain description of the decision variables, constraints and
//!    objective. No solving happens here.
//! 2. [`solve_model`] hands the model to a [`Solver`] backend and extracts a [`Solution`], or
//!    reports why no sizing could be found.
use crate::parameters::{FormulationOptions, TechnoEconomicParameters};
use crate::time_series::{CapacityFactorProfile, LoadProfile};
use log::{debug, info};
use thiserror::Error;

pub mod constraints;
pub mod model;
pub use model::{SizingModel, build_model};
pub mod solution;
pub use solution::Solution;
pub mod solver;
pub use solver::{HighsSolver, RawSolution, Solver, SolverBackend};

/// The reasons why sizing can fail.
///
/// Any of these means there is no sizing recommendation: no partial values are ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingError {
    /// The profiles or parameters are malformed or inconsistent
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The requested solver backend cannot be used
    #[error("Solver backend unavailable: {0}")]
    SolverUnavailable(String),
    /// No sizing can satisfy every constraint
    #[error("The sizing problem is infeasible")]
    Infeasible,
    /// The objective can be decreased without limit
    #[error("The sizing problem is unbounded")]
    Unbounded,
    /// The backend failed for some other reason (numerical trouble, time limit etc.)
    #[error("Solver error: {0}")]
    Solver(String),
}

/// Solve a previously built model with the given backend.
///
/// # Arguments
///
/// * `model` - The sizing model
/// * `solver` - The backend used to solve the model
///
/// # Returns
///
/// The optimal sizing and dispatch, or the reason why none could be found.
pub fn solve_model(model: &SizingModel, solver: &dyn Solver) -> Result<Solution, SizingError> {
    debug!("Solving sizing model with {} backend", solver.name());
    let raw = solver.solve(model)?;
    let solution = Solution::from_raw(model, raw)?;
    info!(
        "Optimal sizing found: solar capacity = {:.2} kW, battery capacity = {:.2} kWh, cost = {:.2}",
        solution.solar_capacity, solution.battery_energy_capacity, solution.objective_value
    );

    Ok(solution)
}

/// Build and solve the sizing problem in one step.
///
/// # Arguments
///
/// * `load` - Energy demand in each hour
/// * `capacity_factor` - Fraction of solar capacity available in each hour
/// * `parameters` - Technology costs and characteristics
/// * `options` - Extensions to the basic formulation
/// * `solver` - The backend used to solve the model
pub fn size_system(
    load: &LoadProfile,
    capacity_factor: &CapacityFactorProfile,
    parameters: &TechnoEconomicParameters,
    options: &FormulationOptions,
    solver: &dyn Solver,
) -> Result<Solution, SizingError> {
    let model = build_model(load, capacity_factor, parameters, options)?;
    solve_model(&model, solver)
}
