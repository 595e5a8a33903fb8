//! Solver backends for the sizing problem.
//!
//! The model builder knows nothing about any particular LP engine. A backend only has to accept a
//! [`SizingModel`] (minimisation over continuous variables with linear rows) and either return an
//! optimal column assignment or say why it couldn't.
use super::SizingError;
use super::model::SizingModel;
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use std::str::FromStr;
use std::time::Duration;
use strum::VariantNames;

/// The raw output of a successful solve
#[derive(Debug, Clone, PartialEq)]
pub struct RawSolution {
    /// The value of every column, in column order
    pub columns: Vec<f64>,
    /// The value of the objective function
    pub objective_value: f64,
}

/// A backend capable of solving a [`SizingModel`]
pub trait Solver {
    /// A human-readable name for the backend
    fn name(&self) -> &str;

    /// Minimise the model's objective subject to its constraints.
    ///
    /// This blocks until the backend finishes.
    fn solve(&self, model: &SizingModel) -> Result<RawSolution, SizingError>;
}

/// Solves models with the HiGHS LP solver
#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    /// Stop the solve after this long, reporting a solver error
    pub time_limit: Option<Duration>,
    /// Whether to let HiGHS print its own output to the console
    pub log_output: bool,
}

/// A decision variable in the HiGHS problem
type Variable = highs::Col;

impl HighsSolver {
    /// Create the HiGHS problem equivalent to the given model
    fn to_problem(model: &SizingModel) -> Problem {
        let mut problem = Problem::default();
        let vars: Vec<Variable> = model
            .columns()
            .iter()
            .map(|def| problem.add_column(def.cost, def.min..=def.max))
            .collect();

        for constraint in model.constraints() {
            problem.add_row(
                constraint.min..=constraint.max,
                constraint
                    .terms
                    .iter()
                    .map(|&(var, coeff)| (vars[var.index()], coeff)),
            );
        }

        problem
    }
}

impl Solver for HighsSolver {
    fn name(&self) -> &str {
        "HiGHS"
    }

    fn solve(&self, model: &SizingModel) -> Result<RawSolution, SizingError> {
        let mut highs_model = Self::to_problem(model).optimise(Sense::Minimise);
        highs_model.set_option("output_flag", self.log_output);
        if let Some(time_limit) = self.time_limit {
            highs_model.set_option("time_limit", time_limit.as_secs_f64());
        }

        let solved = highs_model.solve();
        match solved.status() {
            HighsModelStatus::Optimal => {
                let columns = solved.get_solution().columns().to_vec();
                let objective_value = model.objective_value(&columns);
                Ok(RawSolution {
                    columns,
                    objective_value,
                })
            }
            HighsModelStatus::Infeasible => Err(SizingError::Infeasible),
            HighsModelStatus::Unbounded => Err(SizingError::Unbounded),
            // Presolve can't always tell these apart, but an objective which is bounded below
            // can't be unbounded
            HighsModelStatus::UnboundedOrInfeasible => {
                if model.is_objective_bounded_below() {
                    Err(SizingError::Infeasible)
                } else {
                    Err(SizingError::Unbounded)
                }
            }
            HighsModelStatus::ReachedTimeLimit => Err(SizingError::Solver(format!(
                "Time limit of {:?} reached",
                self.time_limit.unwrap_or_default()
            ))),
            status => Err(SizingError::Solver(format!("Could not solve: {status:?}"))),
        }
    }
}

/// The solver backends which can be selected in the program settings
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SolverBackend {
    /// The HiGHS open-source LP solver
    #[default]
    Highs,
}

impl SolverBackend {
    /// Look up a backend by name.
    ///
    /// Returns [`SizingError::SolverUnavailable`] if no backend with this name is available.
    pub fn from_name(name: &str) -> Result<Self, SizingError> {
        Self::from_str(name).map_err(|_| {
            SizingError::SolverUnavailable(format!(
                "Unknown solver backend \"{name}\" (available: {})",
                Self::VARIANTS.join(", ")
            ))
        })
    }

    /// Create a solver for this backend
    ///
    /// # Arguments
    ///
    /// * `time_limit` - Maximum time to spend solving
    /// * `log_output` - Whether the backend should print its own log output
    pub fn create(self, time_limit: Option<Duration>, log_output: bool) -> Box<dyn Solver> {
        match self {
            Self::Highs => Box::new(HighsSolver {
                time_limit,
                log_output,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::model::{ConstraintKind, ModelBuilder, VariableKind, VariableMap};
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// A model with a single capacity variable and a single output variable.
    ///
    /// The output must be at least `demand` and can't exceed the capacity, which costs `cost` per
    /// unit.
    fn single_variable_model(cost: f64, demand: f64, max_capacity: f64) -> SizingModel {
        let mut builder = ModelBuilder::default();
        let capacity =
            builder.add_variable(VariableKind::SolarCapacity, None, cost, max_capacity);
        let battery = builder.add_variable(VariableKind::BatteryEnergyCapacity, None, 0.0, 0.0);
        let output = builder.add_variable(VariableKind::SolarOutput, Some(0), 0.0, f64::INFINITY);
        builder.add_constraint(
            ConstraintKind::EnergyBalance,
            Some(0),
            demand,
            f64::INFINITY,
            [(output, 1.0)],
        );
        builder.add_upper_bound(
            ConstraintKind::SolarAvailability,
            Some(0),
            0.0,
            [(output, 1.0), (capacity, -1.0)],
        );

        let variables = VariableMap {
            solar_capacity: capacity,
            battery_energy_capacity: battery,
            solar_output: vec![output],
            state_of_charge: Vec::new(),
            charge_power: Vec::new(),
            discharge_power: Vec::new(),
            unserved_load: None,
        };
        builder.finish(1, variables)
    }

    #[test]
    fn test_highs_optimal() {
        let model = single_variable_model(2.0, 5.0, f64::INFINITY);
        let solution = HighsSolver::default().solve(&model).unwrap();

        assert_eq!(solution.columns.len(), 3);
        assert_approx_eq!(f64, solution.columns[0], 5.0, epsilon = 1e-9);
        assert_approx_eq!(f64, solution.objective_value, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_highs_infeasible() {
        let model = single_variable_model(2.0, 5.0, 4.0);
        assert_eq!(
            HighsSolver::default().solve(&model),
            Err(SizingError::Infeasible)
        );
    }

    #[test]
    fn test_highs_unbounded() {
        // A negative cost rewards building unlimited capacity
        let model = single_variable_model(-1.0, 5.0, f64::INFINITY);
        assert_eq!(
            HighsSolver::default().solve(&model),
            Err(SizingError::Unbounded)
        );
    }

    #[rstest]
    #[case("highs", Some(SolverBackend::Highs))]
    #[case("HiGHS", Some(SolverBackend::Highs))]
    #[case("gurobi", None)]
    #[case("", None)]
    fn test_solver_backend_from_name(#[case] name: &str, #[case] expected: Option<SolverBackend>) {
        match expected {
            Some(backend) => assert_eq!(SolverBackend::from_name(name), Ok(backend)),
            None => assert!(matches!(
                SolverBackend::from_name(name),
                Err(SizingError::SolverUnavailable(_))
            )),
        }
    }

    #[test]
    fn test_solver_backend_create() {
        let solver = SolverBackend::Highs.create(Some(Duration::from_secs(10)), false);
        assert_eq!(solver.name(), "HiGHS");
    }
}
