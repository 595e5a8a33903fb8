//! Fixtures for tests

use crate::parameters::TechnoEconomicParameters;
use crate::time_series::{CapacityFactorProfile, LoadProfile};
use crate::units::{Dimensionless, Energy, Hours, MoneyPerEnergy, MoneyPerPower};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Technology parameters for the example scenario
#[fixture]
pub fn technology() -> TechnoEconomicParameters {
    TechnoEconomicParameters {
        cost_per_kw_solar: MoneyPerPower(2500.0),
        cost_per_kwh_battery: MoneyPerEnergy(1000.0),
        charge_efficiency: Dimensionless(0.95),
        discharge_efficiency: Dimensionless(0.95),
        charge_duration_hours: Hours(4.0),
    }
}

/// Create a load profile from raw values
pub fn load(values: &[f64]) -> LoadProfile {
    values.iter().copied().map(Energy).collect()
}

/// Create a capacity factor profile from raw values
pub fn capacity_factor(values: &[f64]) -> CapacityFactorProfile {
    values.iter().copied().map(Dimensionless).collect()
}
