//! Code for adding constraints to the sizing optimisation problem.
//!
//! Constraints are added one family at a time, so rows for the same relationship are contiguous
//! and ordered by hour.
use super::model::{ConstraintKind, ModelBuilder, VariableMap};
use crate::parameters::{StorageBoundary, TechnoEconomicParameters};
use crate::time_series::{CapacityFactorProfile, LoadProfile};

/// Add every constraint of the sizing problem.
///
/// # Arguments
///
/// * `builder` - The model being built
/// * `variables` - The variables in the problem
/// * `load` - Energy demand in each hour
/// * `capacity_factor` - Fraction of solar capacity available in each hour
/// * `parameters` - Technology costs and characteristics
/// * `storage_boundary` - How the state of charge is constrained at the edges of the horizon
pub(crate) fn add_constraints(
    builder: &mut ModelBuilder,
    variables: &VariableMap,
    load: &LoadProfile,
    capacity_factor: &CapacityFactorProfile,
    parameters: &TechnoEconomicParameters,
    storage_boundary: StorageBoundary,
) {
    add_energy_balance_constraints(builder, variables, load);
    add_solar_availability_constraints(builder, variables, capacity_factor);
    add_storage_capacity_constraints(builder, variables);
    add_rated_power_constraints(builder, variables, parameters);
    add_storage_continuity_constraints(builder, variables, parameters, storage_boundary);
}

/// Add energy balance constraints.
///
/// For every hour, solar output plus discharge minus charge (plus unserved load, if allowed) must
/// exactly equal the load.
fn add_energy_balance_constraints(
    builder: &mut ModelBuilder,
    variables: &VariableMap,
    load: &LoadProfile,
) {
    for (hour, demand) in load.iter().enumerate() {
        let mut terms = vec![
            (variables.solar_output[hour], 1.0),
            (variables.discharge_power[hour], 1.0),
            (variables.charge_power[hour], -1.0),
        ];
        if let Some(unserved_load) = &variables.unserved_load {
            terms.push((unserved_load[hour], 1.0));
        }

        builder.add_equality(
            ConstraintKind::EnergyBalance,
            Some(hour),
            demand.value(),
            terms,
        );
    }
}

/// Add solar availability constraints.
///
/// Solar output in each hour can't exceed the installed capacity scaled by the capacity factor:
///
/// solar_output[t] - capacity_factor[t] * solar_capacity <= 0
fn add_solar_availability_constraints(
    builder: &mut ModelBuilder,
    variables: &VariableMap,
    capacity_factor: &CapacityFactorProfile,
) {
    for (hour, factor) in capacity_factor.iter().enumerate() {
        builder.add_upper_bound(
            ConstraintKind::SolarAvailability,
            Some(hour),
            0.0,
            [
                (variables.solar_output[hour], 1.0),
                (variables.solar_capacity, -factor.value()),
            ],
        );
    }
}

/// Add storage capacity constraints.
///
/// The state of charge can never exceed the battery's energy capacity.
fn add_storage_capacity_constraints(builder: &mut ModelBuilder, variables: &VariableMap) {
    for (hour, &soc) in variables.state_of_charge.iter().enumerate() {
        builder.add_upper_bound(
            ConstraintKind::StorageCapacity,
            Some(hour),
            0.0,
            [(soc, 1.0), (variables.battery_energy_capacity, -1.0)],
        );
    }
}

/// Add rated power constraints for charging and discharging.
///
/// The rated power is derived from the energy capacity, so these rows couple the dispatch limits to
/// the sizing decision:
///
/// charge_power[t] - battery_energy_capacity / charge_duration_hours <= 0
fn add_rated_power_constraints(
    builder: &mut ModelBuilder,
    variables: &VariableMap,
    parameters: &TechnoEconomicParameters,
) {
    let ratio = parameters.power_to_energy_ratio();
    for (hour, &charge) in variables.charge_power.iter().enumerate() {
        builder.add_upper_bound(
            ConstraintKind::ChargeRate,
            Some(hour),
            0.0,
            [(charge, 1.0), (variables.battery_energy_capacity, -ratio)],
        );
    }
    for (hour, &discharge) in variables.discharge_power.iter().enumerate() {
        builder.add_upper_bound(
            ConstraintKind::DischargeRate,
            Some(hour),
            0.0,
            [(discharge, 1.0), (variables.battery_energy_capacity, -ratio)],
        );
    }
}

/// Add constraints linking the state of charge across hours.
///
/// Charging is derated by the charge efficiency and discharging inflated by the discharge
/// efficiency, so both conversion losses reduce the stored energy:
///
/// soc[t+1] = soc[t] + charge_efficiency * charge[t] - discharge[t] / discharge_efficiency
///
/// With [`StorageBoundary::FullAtStart`] the first hour starts with `soc[0]` equal to the energy
/// capacity and the energy flows of the last hour are not carried anywhere. With
/// [`StorageBoundary::Cyclic`] the last hour flows into `soc[0]` instead.
fn add_storage_continuity_constraints(
    builder: &mut ModelBuilder,
    variables: &VariableMap,
    parameters: &TechnoEconomicParameters,
    storage_boundary: StorageBoundary,
) {
    let charge_coeff = -parameters.charge_efficiency.value();
    let discharge_coeff = 1.0 / parameters.discharge_efficiency.value();
    let soc = &variables.state_of_charge;
    let horizon = soc.len();

    // Hour `from` flows into hour `to`
    let transitions = (0..horizon - 1).map(|hour| (hour, hour + 1));
    let wrap_around = (storage_boundary == StorageBoundary::Cyclic).then_some((horizon - 1, 0));
    for (from, to) in transitions.chain(wrap_around) {
        builder.add_equality(
            ConstraintKind::StorageContinuity,
            Some(from),
            0.0,
            [
                (soc[to], 1.0),
                (soc[from], -1.0),
                (variables.charge_power[from], charge_coeff),
                (variables.discharge_power[from], discharge_coeff),
            ],
        );
    }

    if storage_boundary == StorageBoundary::FullAtStart {
        builder.add_equality(
            ConstraintKind::InitialCharge,
            None,
            0.0,
            [(soc[0], 1.0), (variables.battery_energy_capacity, -1.0)],
        );
    }
}
