//! The description of the sizing optimisation problem.
//!
//! A [`SizingModel`] holds the columns (decision variables with their objective coefficient and
//! bounds) and rows (linear constraints) of a linear program. It is independent of any particular
//! solver backend.
use super::SizingError;
use super::constraints::add_constraints;
use crate::parameters::{FormulationOptions, TechnoEconomicParameters};
use crate::time_series::{CapacityFactorProfile, LoadProfile, check_profiles};
use log::debug;
use std::fmt;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(usize);

impl Variable {
    /// The index of the column this variable refers to
    pub fn index(self) -> usize {
        self.0
    }
}

/// The quantity a decision variable represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum VariableKind {
    /// Installed solar capacity (kW)
    SolarCapacity,
    /// Battery energy capacity (kWh)
    BatteryEnergyCapacity,
    /// Energy delivered by solar in an hour
    SolarOutput,
    /// Stored energy at the start of an hour
    StateOfCharge,
    /// Energy moved into storage during an hour
    ChargePower,
    /// Energy moved out of storage during an hour
    DischargePower,
    /// Load left unserved in an hour
    UnservedLoad,
}

/// The definition of a variable to be optimised.
///
/// The cost is the multiplying factor in the objective function to minimise, i.e. the Cs in:
///
/// f = c1*x1 + c2*x2 + ...
///
/// with x1, x2... taking values between min and max.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    /// What the variable represents
    pub kind: VariableKind,
    /// The hour the variable applies to, for dispatch variables
    pub hour: Option<usize>,
    /// The coefficient of the variable in the objective
    pub cost: f64,
    /// The variable's minimum value
    pub min: f64,
    /// The variable's maximum value
    pub max: f64,
}

impl fmt::Display for VariableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_indexed(f, self.kind.into(), self.hour)
    }
}

/// The physical relationship a constraint encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintKind {
    /// Supply must equal the load in each hour
    EnergyBalance,
    /// Solar output is limited by capacity and capacity factor
    SolarAvailability,
    /// Stored energy cannot exceed the battery's energy capacity
    StorageCapacity,
    /// Charging is limited by the battery's rated power
    ChargeRate,
    /// Discharging is limited by the battery's rated power
    DischargeRate,
    /// Links the state of charge in consecutive hours
    StorageContinuity,
    /// The battery starts the horizon fully charged
    InitialCharge,
}

/// A constraint for an optimisation.
///
/// Each constraint adds an inequality of the form:
///
/// min <= a1*x1 + a2*x2 + ... <= max
///
/// Equalities have `min == max`; one-sided constraints set the other bound to infinity.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// What the constraint represents
    pub kind: ConstraintKind,
    /// The hour the constraint applies to, if any
    pub hour: Option<usize>,
    /// The minimum value for the constraint
    pub min: f64,
    /// The maximum value for the constraint
    pub max: f64,
    /// The non-zero coefficients of the constraint
    pub terms: Vec<(Variable, f64)>,
}

impl Constraint {
    /// Evaluate the left-hand side of the constraint for a column assignment
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coeff)| coeff * values[var.index()])
            .sum()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_indexed(f, self.kind.into(), self.hour)
    }
}

fn fmt_indexed(f: &mut fmt::Formatter<'_>, name: &str, hour: Option<usize>) -> fmt::Result {
    match hour {
        Some(hour) => write!(f, "{name}[{hour}]"),
        None => write!(f, "{name}"),
    }
}

/// Locations of the decision variables in the problem
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMap {
    /// Installed solar capacity
    pub solar_capacity: Variable,
    /// Battery energy capacity
    pub battery_energy_capacity: Variable,
    /// Solar output in each hour
    pub solar_output: Vec<Variable>,
    /// State of charge at the start of each hour
    pub state_of_charge: Vec<Variable>,
    /// Energy charged in each hour
    pub charge_power: Vec<Variable>,
    /// Energy discharged in each hour
    pub discharge_power: Vec<Variable>,
    /// Unserved load in each hour, if lost load is allowed
    pub unserved_load: Option<Vec<Variable>>,
}

/// A way in which a column assignment fails to satisfy a [`SizingModel`]
#[derive(Debug, Clone, PartialEq)]
pub enum Violation<'a> {
    /// A variable lies outside its bounds
    Bound {
        /// The variable's definition
        definition: &'a VariableDefinition,
        /// The value assigned to the variable
        value: f64,
    },
    /// A constraint is not satisfied
    Constraint {
        /// The violated constraint
        constraint: &'a Constraint,
        /// The value of the constraint's left-hand side
        activity: f64,
    },
}

impl fmt::Display for Violation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bound { definition, value } => write!(
                f,
                "{definition} = {value} is outside [{}, {}]",
                definition.min, definition.max
            ),
            Self::Constraint {
                constraint,
                activity,
            } => write!(
                f,
                "{constraint} has activity {activity} outside [{}, {}]",
                constraint.min, constraint.max
            ),
        }
    }
}

/// Whether `value` lies within `[min, max]`, allowing a tolerance relative to the bound magnitude
fn within_bounds(value: f64, min: f64, max: f64, tolerance: f64) -> bool {
    let slack = |bound: f64| tolerance * bound.abs().max(1.0);
    (min == f64::NEG_INFINITY || value >= min - slack(min))
        && (max == f64::INFINITY || value <= max + slack(max))
}

/// The linear program for sizing the solar array and battery.
///
/// Built once by [`build_model`] and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingModel {
    horizon: usize,
    variables: VariableMap,
    columns: Vec<VariableDefinition>,
    constraints: Vec<Constraint>,
}

impl SizingModel {
    /// The number of hours in the horizon
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// The locations of the decision variables
    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// The definitions of all columns, in column order
    pub fn columns(&self) -> &[VariableDefinition] {
        &self.columns
    }

    /// All constraints, in row order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    fn check_values_len(&self, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.columns.len(),
            "Wrong number of values for model"
        );
    }

    /// Evaluate the objective for a column assignment.
    ///
    /// # Panics
    ///
    /// If `values` doesn't have exactly one entry per column.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.check_values_len(values);
        self.columns
            .iter()
            .zip(values)
            .map(|(def, value)| def.cost * value)
            .sum()
    }

    /// Whether the objective is bounded below over the non-negative orthant.
    ///
    /// This holds when every column has a finite lower bound and a non-negative cost.
    pub fn is_objective_bounded_below(&self) -> bool {
        self.columns
            .iter()
            .all(|def| def.min.is_finite() && def.cost >= 0.0)
    }

    /// Find every bound and constraint which a column assignment violates.
    ///
    /// # Arguments
    ///
    /// * `values` - One value per column, in column order
    /// * `tolerance` - Relative tolerance used when comparing against bounds
    ///
    /// # Panics
    ///
    /// If `values` doesn't have exactly one entry per column.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<Violation<'_>> {
        self.check_values_len(values);

        let bounds = self
            .columns
            .iter()
            .zip(values.iter().copied())
            .filter(|(def, value)| !within_bounds(*value, def.min, def.max, tolerance))
            .map(|(definition, value)| Violation::Bound { definition, value });
        let rows = self.constraints.iter().filter_map(|constraint| {
            let activity = constraint.activity(values);
            (!within_bounds(activity, constraint.min, constraint.max, tolerance))
                .then_some(Violation::Constraint {
                    constraint,
                    activity,
                })
        });

        bounds.chain(rows).collect()
    }

    /// Create a copy of the model with every column fixed to the given value.
    ///
    /// Re-solving the result checks that an assignment is feasible using the backend's own
    /// tolerances.
    ///
    /// # Panics
    ///
    /// If `values` doesn't have exactly one entry per column.
    pub fn with_fixed_values(&self, values: &[f64]) -> SizingModel {
        self.check_values_len(values);

        let mut model = self.clone();
        for (def, &value) in model.columns.iter_mut().zip(values) {
            def.min = value;
            def.max = value;
        }

        model
    }
}

/// Accumulates the columns and rows of a [`SizingModel`].
///
/// The builder is consumed by [`ModelBuilder::finish`], so a model can't be modified once built.
#[derive(Default)]
pub(crate) struct ModelBuilder {
    columns: Vec<VariableDefinition>,
    constraints: Vec<Constraint>,
}

impl ModelBuilder {
    /// Add a column to the problem
    pub(crate) fn add_variable(
        &mut self,
        kind: VariableKind,
        hour: Option<usize>,
        cost: f64,
        max: f64,
    ) -> Variable {
        let var = Variable(self.columns.len());
        self.columns.push(VariableDefinition {
            kind,
            hour,
            cost,
            min: 0.0,
            max,
        });

        var
    }

    /// Add one zero-cost column per hour, with no upper bound
    fn add_hourly_variables(&mut self, kind: VariableKind, horizon: usize) -> Vec<Variable> {
        self.add_hourly_variables_with_cost(kind, horizon, 0.0)
    }

    /// Add one column per hour with no upper bound, each with the given cost
    fn add_hourly_variables_with_cost(
        &mut self,
        kind: VariableKind,
        horizon: usize,
        cost: f64,
    ) -> Vec<Variable> {
        (0..horizon)
            .map(|hour| self.add_variable(kind, Some(hour), cost, f64::INFINITY))
            .collect()
    }

    /// Add a row to the problem
    pub(crate) fn add_constraint<I>(
        &mut self,
        kind: ConstraintKind,
        hour: Option<usize>,
        min: f64,
        max: f64,
        terms: I,
    ) where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let terms = terms.into_iter().filter(|(_, coeff)| *coeff != 0.0).collect();
        self.constraints.push(Constraint {
            kind,
            hour,
            min,
            max,
            terms,
        });
    }

    /// Add an equality row (`terms == rhs`)
    pub(crate) fn add_equality<I>(
        &mut self,
        kind: ConstraintKind,
        hour: Option<usize>,
        rhs: f64,
        terms: I,
    ) where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.add_constraint(kind, hour, rhs, rhs, terms);
    }

    /// Add an upper-bounded row (`terms <= rhs`)
    pub(crate) fn add_upper_bound<I>(
        &mut self,
        kind: ConstraintKind,
        hour: Option<usize>,
        rhs: f64,
        terms: I,
    ) where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.add_constraint(kind, hour, f64::NEG_INFINITY, rhs, terms);
    }

    /// Add the decision variables for the sizing problem
    fn add_variables(
        &mut self,
        horizon: usize,
        parameters: &TechnoEconomicParameters,
        options: &FormulationOptions,
    ) -> VariableMap {
        let solar_capacity = self.add_variable(
            VariableKind::SolarCapacity,
            None,
            parameters.cost_per_kw_solar.value(),
            options
                .max_solar_capacity
                .map_or(f64::INFINITY, |max| max.value()),
        );
        let battery_energy_capacity = self.add_variable(
            VariableKind::BatteryEnergyCapacity,
            None,
            parameters.cost_per_kwh_battery.value(),
            options
                .max_battery_energy_capacity
                .map_or(f64::INFINITY, |max| max.value()),
        );

        let solar_output = self.add_hourly_variables(VariableKind::SolarOutput, horizon);
        let state_of_charge = self.add_hourly_variables(VariableKind::StateOfCharge, horizon);
        let charge_power = self.add_hourly_variables(VariableKind::ChargePower, horizon);
        let discharge_power = self.add_hourly_variables(VariableKind::DischargePower, horizon);
        let unserved_load = options.value_of_lost_load.map(|cost| {
            self.add_hourly_variables_with_cost(VariableKind::UnservedLoad, horizon, cost.value())
        });

        VariableMap {
            solar_capacity,
            battery_energy_capacity,
            solar_output,
            state_of_charge,
            charge_power,
            discharge_power,
            unserved_load,
        }
    }

    /// Finish building, returning the completed model
    pub(crate) fn finish(self, horizon: usize, variables: VariableMap) -> SizingModel {
        SizingModel {
            horizon,
            variables,
            columns: self.columns,
            constraints: self.constraints,
        }
    }
}

/// Build the linear program for sizing a solar array and battery.
///
/// All inputs are validated before anything is built.
///
/// # Arguments
///
/// * `load` - Energy demand in each hour (kWh)
/// * `capacity_factor` - Fraction of solar capacity available in each hour
/// * `parameters` - Technology costs and characteristics
/// * `options` - Extensions to the basic formulation
///
/// # Returns
///
/// The sizing model, or [`SizingError::InvalidInput`] if the inputs are malformed.
pub fn build_model(
    load: &LoadProfile,
    capacity_factor: &CapacityFactorProfile,
    parameters: &TechnoEconomicParameters,
    options: &FormulationOptions,
) -> Result<SizingModel, SizingError> {
    let horizon = check_profiles(load, capacity_factor)?;
    parameters.validate()?;
    options.validate()?;

    let mut builder = ModelBuilder::default();
    let variables = builder.add_variables(horizon, parameters, options);
    add_constraints(
        &mut builder,
        &variables,
        load,
        capacity_factor,
        parameters,
        options.storage_boundary,
    );

    let model = builder.finish(horizon, variables);
    debug!(
        "Built sizing model for {horizon} hours: {} variables, {} constraints",
        model.columns().len(),
        model.constraints().len()
    );

    Ok(model)
}
