//! Techno-economic parameters and options controlling how the sizing problem is formulated.
use crate::sizing::SizingError;
use crate::units::{Dimensionless, Energy, Hours, MoneyPerEnergy, MoneyPerPower, Power};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

/// Costs and physical characteristics of the solar and battery technologies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TechnoEconomicParameters {
    /// Capital cost of solar capacity (currency/kW)
    pub cost_per_kw_solar: MoneyPerPower,
    /// Capital cost of battery energy capacity (currency/kWh)
    pub cost_per_kwh_battery: MoneyPerEnergy,
    /// Fraction of energy sent to the battery which is actually stored
    pub charge_efficiency: Dimensionless,
    /// Fraction of energy drawn from storage which is delivered to the load
    pub discharge_efficiency: Dimensionless,
    /// Hours needed to fully charge or discharge the battery at rated power
    pub charge_duration_hours: Hours,
}

impl TechnoEconomicParameters {
    /// Check that every parameter is within its valid range
    pub fn validate(&self) -> Result<(), SizingError> {
        check_positive("cost_per_kw_solar", self.cost_per_kw_solar.value())?;
        check_positive("cost_per_kwh_battery", self.cost_per_kwh_battery.value())?;
        check_efficiency("charge_efficiency", self.charge_efficiency)?;
        check_efficiency("discharge_efficiency", self.discharge_efficiency)?;
        check_positive("charge_duration_hours", self.charge_duration_hours.value())?;

        Ok(())
    }

    /// The rated charge/discharge power per unit of battery energy capacity (1/h)
    pub fn power_to_energy_ratio(&self) -> f64 {
        1.0 / self.charge_duration_hours.value()
    }

    /// The rated power of a battery with the given energy capacity
    pub fn rated_power(&self, battery_energy_capacity: Energy) -> Power {
        battery_energy_capacity / self.charge_duration_hours
    }
}

/// How the state of charge at the edges of the horizon is constrained
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBoundary {
    /// The battery starts the horizon fully charged and the final state is left free
    #[default]
    #[string = "full_at_start"]
    FullAtStart,
    /// The horizon repeats, so the last hour flows into the first
    #[string = "cyclic"]
    Cyclic,
}

/// Optional extensions to the basic sizing formulation.
///
/// The default values give the basic formulation: the battery starts full, load must be met
/// exactly and capacities are unbounded.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormulationOptions {
    /// How the state of charge is constrained at the edges of the horizon
    #[serde(default)]
    pub storage_boundary: StorageBoundary,
    /// If set, load may go unserved at this price (currency/kWh)
    #[serde(default)]
    pub value_of_lost_load: Option<MoneyPerEnergy>,
    /// Upper bound for installed solar capacity (kW)
    #[serde(default)]
    pub max_solar_capacity: Option<Power>,
    /// Upper bound for battery energy capacity (kWh)
    #[serde(default)]
    pub max_battery_energy_capacity: Option<Energy>,
}

impl FormulationOptions {
    /// Check that the options are valid
    pub fn validate(&self) -> Result<(), SizingError> {
        if let Some(value) = self.value_of_lost_load {
            check_positive("value_of_lost_load", value.value())?;
        }
        if let Some(value) = self.max_solar_capacity {
            check_non_negative("max_solar_capacity", value.value())?;
        }
        if let Some(value) = self.max_battery_energy_capacity {
            check_non_negative("max_battery_energy_capacity", value.value())?;
        }

        Ok(())
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), SizingError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SizingError::InvalidInput(format!(
            "{name} must be a finite number greater than zero (got {value})"
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), SizingError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SizingError::InvalidInput(format!(
            "{name} must be a finite, non-negative number (got {value})"
        )))
    }
}

fn check_efficiency(name: &str, value: Dimensionless) -> Result<(), SizingError> {
    if value.value() > 0.0 && value.value() <= 1.0 {
        Ok(())
    } else {
        Err(SizingError::InvalidInput(format!(
            "{name} must be greater than zero and at most one (got {value})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::technology;
    use rstest::rstest;

    #[rstest]
    fn test_validate_ok(technology: TechnoEconomicParameters) {
        assert!(technology.validate().is_ok());
    }

    #[rstest]
    #[case(0.0, false)] // Invalid: exactly zero
    #[case(-1.0, false)] // Invalid: negative
    #[case(f64::NAN, false)] // Invalid: NaN
    #[case(f64::INFINITY, false)] // Invalid: infinite
    #[case(1e-9, true)] // Valid: very small
    fn test_validate_cost(
        mut technology: TechnoEconomicParameters,
        #[case] value: f64,
        #[case] expected_valid: bool,
    ) {
        technology.cost_per_kw_solar = MoneyPerPower(value);
        assert_eq!(technology.validate().is_ok(), expected_valid);
    }

    #[rstest]
    #[case(1.0, true)] // Valid: lossless
    #[case(0.5, true)]
    #[case(0.0, false)] // Invalid: zero would divide by zero
    #[case(1.01, false)] // Invalid: creates energy
    #[case(f64::NAN, false)]
    fn test_validate_efficiency(
        mut technology: TechnoEconomicParameters,
        #[case] value: f64,
        #[case] expected_valid: bool,
    ) {
        technology.discharge_efficiency = Dimensionless(value);
        assert_eq!(technology.validate().is_ok(), expected_valid);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-4.0)]
    fn test_validate_charge_duration(mut technology: TechnoEconomicParameters, #[case] value: f64) {
        technology.charge_duration_hours = Hours(value);
        let err = technology.validate().unwrap_err();
        assert!(err.to_string().contains("charge_duration_hours"));
    }

    #[rstest]
    fn test_rated_power(technology: TechnoEconomicParameters) {
        assert_eq!(technology.rated_power(Energy(100.0)), Power(25.0));
        assert_eq!(technology.power_to_energy_ratio(), 0.25);
    }

    #[test]
    fn test_formulation_options_validate() {
        assert!(FormulationOptions::default().validate().is_ok());

        let options = FormulationOptions {
            value_of_lost_load: Some(MoneyPerEnergy(0.0)),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = FormulationOptions {
            max_battery_energy_capacity: Some(Energy(0.0)),
            ..Default::default()
        };
        assert!(options.validate().is_ok());

        let options = FormulationOptions {
            max_solar_capacity: Some(Power(-1.0)),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_formulation_options_deserialise() {
        let options: FormulationOptions =
            toml::from_str("storage_boundary = \"cyclic\"\nvalue_of_lost_load = 1e6").unwrap();
        assert_eq!(options.storage_boundary, StorageBoundary::Cyclic);
        assert_eq!(options.value_of_lost_load, Some(MoneyPerEnergy(1e6)));
        assert_eq!(options.max_solar_capacity, None);
    }
}
