//! The optimal sizing and dispatch extracted from a solved model.
use super::SizingError;
use super::model::{SizingModel, Variable};
use super::solver::RawSolution;
use crate::time_series::TimeSeries;
use crate::units::{Energy, Money, Power};

/// The optimal sizing and the corresponding hourly dispatch.
///
/// Every hourly quantity is the energy moved during (or, for the state of charge, stored at the
/// start of) that hour. As the timestep is one hour, charge and discharge energies are numerically
/// equal to the average power over the hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Installed solar capacity
    pub solar_capacity: Power,
    /// Battery energy capacity
    pub battery_energy_capacity: Energy,
    /// Total capital cost (plus the cost of any unserved load)
    pub objective_value: Money,
    /// Energy delivered by solar in each hour
    pub solar_output: TimeSeries<Energy>,
    /// Stored energy at the start of each hour
    pub state_of_charge: TimeSeries<Energy>,
    /// Energy moved into storage in each hour
    pub charge_power: TimeSeries<Energy>,
    /// Energy moved out of storage in each hour
    pub discharge_power: TimeSeries<Energy>,
    /// Load left unserved in each hour, if lost load was allowed
    pub unserved_load: Option<TimeSeries<Energy>>,
    /// The raw column values, in the model's column order
    column_values: Vec<f64>,
}

/// The values of a single hour of the dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchHour {
    /// The hour of the horizon
    pub hour: usize,
    /// Energy delivered by solar
    pub solar_output: Energy,
    /// Stored energy at the start of the hour
    pub state_of_charge: Energy,
    /// Energy moved into storage
    pub charge_power: Energy,
    /// Energy moved out of storage
    pub discharge_power: Energy,
    /// Load left unserved (zero if lost load is not allowed)
    pub unserved_load: Energy,
}

impl Solution {
    /// Extract the solution from the raw output of a solver.
    ///
    /// Extraction is all-or-nothing: if the backend didn't return exactly one finite value per
    /// column and a finite objective, the whole result is rejected.
    pub fn from_raw(model: &SizingModel, raw: RawSolution) -> Result<Self, SizingError> {
        if raw.columns.len() != model.columns().len() {
            return Err(SizingError::Solver(format!(
                "Expected {} values from solver but got {}",
                model.columns().len(),
                raw.columns.len()
            )));
        }

        if let Some((def, value)) = model
            .columns()
            .iter()
            .zip(&raw.columns)
            .find(|(_, value)| !value.is_finite())
        {
            return Err(SizingError::Solver(format!(
                "Solver returned non-finite value {value} for {def}"
            )));
        }

        if !raw.objective_value.is_finite() {
            return Err(SizingError::Solver(format!(
                "Solver returned non-finite objective value {}",
                raw.objective_value
            )));
        }

        let values = &raw.columns;
        let energy = |var: Variable| Energy(values[var.index()]);
        let series = |vars: &[Variable]| -> TimeSeries<Energy> {
            vars.iter().copied().map(energy).collect()
        };
        let vars = model.variables();

        Ok(Self {
            solar_capacity: Power(values[vars.solar_capacity.index()]),
            battery_energy_capacity: energy(vars.battery_energy_capacity),
            objective_value: Money(raw.objective_value),
            solar_output: series(&vars.solar_output),
            state_of_charge: series(&vars.state_of_charge),
            charge_power: series(&vars.charge_power),
            discharge_power: series(&vars.discharge_power),
            unserved_load: vars.unserved_load.as_deref().map(series),
            column_values: raw.columns,
        })
    }

    /// The number of hours in the dispatch
    pub fn horizon(&self) -> usize {
        self.solar_output.len()
    }

    /// The raw column values, in the order of the model the solution came from
    pub fn column_values(&self) -> &[f64] {
        &self.column_values
    }

    /// The total load left unserved over the horizon
    pub fn total_unserved_load(&self) -> Energy {
        self.unserved_load
            .as_ref()
            .map_or(Energy(0.0), |unserved| unserved.iter().copied().sum())
    }

    /// Iterate over the dispatch hour by hour
    pub fn iter_hours(&self) -> impl Iterator<Item = DispatchHour> + '_ {
        (0..self.horizon()).map(move |hour| DispatchHour {
            hour,
            solar_output: self.solar_output[hour],
            state_of_charge: self.state_of_charge[hour],
            charge_power: self.charge_power[hour],
            discharge_power: self.discharge_power[hour],
            unserved_load: self
                .unserved_load
                .as_ref()
                .map_or(Energy(0.0), |unserved| unserved[hour]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_factor, load, technology};
    use crate::parameters::{FormulationOptions, TechnoEconomicParameters};
    use crate::sizing::build_model;
    use rstest::rstest;

    fn model(technology: &TechnoEconomicParameters) -> SizingModel {
        build_model(
            &load(&[1.0, 2.0]),
            &capacity_factor(&[0.5, 0.5]),
            technology,
            &FormulationOptions::default(),
        )
        .unwrap()
    }

    #[rstest]
    fn test_from_raw(technology: TechnoEconomicParameters) {
        let model = model(&technology);
        let vars = model.variables();
        let mut columns = vec![0.0; model.columns().len()];
        columns[vars.solar_capacity.index()] = 6.0;
        columns[vars.solar_output[0].index()] = 1.0;
        columns[vars.solar_output[1].index()] = 2.0;

        let solution = Solution::from_raw(
            &model,
            RawSolution {
                columns: columns.clone(),
                objective_value: 15000.0,
            },
        )
        .unwrap();

        assert_eq!(solution.solar_capacity, Power(6.0));
        assert_eq!(solution.battery_energy_capacity, Energy(0.0));
        assert_eq!(solution.objective_value, Money(15000.0));
        assert_eq!(solution.solar_output.as_slice(), [Energy(1.0), Energy(2.0)]);
        assert_eq!(solution.horizon(), 2);
        assert_eq!(solution.unserved_load, None);
        assert_eq!(solution.total_unserved_load(), Energy(0.0));
        assert_eq!(solution.column_values(), columns.as_slice());

        let hours: Vec<_> = solution.iter_hours().collect();
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[1].hour, 1);
        assert_eq!(hours[1].solar_output, Energy(2.0));
    }

    #[rstest]
    fn test_from_raw_wrong_length(technology: TechnoEconomicParameters) {
        let model = model(&technology);
        let result = Solution::from_raw(
            &model,
            RawSolution {
                columns: vec![0.0; 3],
                objective_value: 0.0,
            },
        );
        assert!(matches!(result, Err(SizingError::Solver(_))));
    }

    #[rstest]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn test_from_raw_non_finite(
        technology: TechnoEconomicParameters,
        #[case] column_value: f64,
        #[case] objective_value: f64,
    ) {
        let model = model(&technology);
        let mut columns = vec![0.0; model.columns().len()];
        columns[model.variables().state_of_charge[1].index()] = column_value;
        let result = Solution::from_raw(
            &model,
            RawSolution {
                columns,
                objective_value,
            },
        );
        assert!(matches!(result, Err(SizingError::Solver(_))));
    }
}
