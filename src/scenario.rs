//! A scenario represents the static input data provided by the user.
use crate::input::{input_err_msg, read_time_series, read_toml};
use crate::parameters::{FormulationOptions, TechnoEconomicParameters};
use crate::sizing::{SizingError, SizingModel, build_model};
use crate::time_series::{CapacityFactorProfile, LoadProfile, check_profiles};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const SCENARIO_FILE_NAME: &str = "scenario.toml";

/// Represents the contents of the scenario TOML file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    /// Technology costs and characteristics
    technology: TechnoEconomicParameters,
    /// Optional extensions to the formulation
    #[serde(default)]
    formulation: FormulationOptions,
}

impl ScenarioFile {
    /// Read a scenario file from the specified directory.
    fn from_path(scenario_dir: &Path) -> Result<ScenarioFile> {
        let file_path = scenario_dir.join(SCENARIO_FILE_NAME);
        let scenario_file: ScenarioFile = read_toml(&file_path)?;
        scenario_file
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(scenario_file)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<(), SizingError> {
        self.technology.validate()?;
        self.formulation.validate()
    }
}

/// Scenario definition
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Path to scenario folder
    pub scenario_path: PathBuf,
    /// Technology costs and characteristics
    pub technology: TechnoEconomicParameters,
    /// Optional extensions to the formulation
    pub formulation: FormulationOptions,
    /// Energy demand in each hour
    pub load: LoadProfile,
    /// Fraction of solar capacity available in each hour
    pub capacity_factor: CapacityFactorProfile,
}

impl Scenario {
    /// Read a scenario from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `scenario_dir` - Folder containing scenario configuration files
    pub fn from_path<P: AsRef<Path>>(scenario_dir: P) -> Result<Scenario> {
        let scenario_dir = scenario_dir.as_ref();
        let scenario_file = ScenarioFile::from_path(scenario_dir)?;
        let (load, capacity_factor) = read_time_series(scenario_dir)?;
        check_profiles(&load, &capacity_factor).context("Invalid time series")?;

        Ok(Scenario {
            scenario_path: scenario_dir.to_path_buf(),
            technology: scenario_file.technology,
            formulation: scenario_file.formulation,
            load,
            capacity_factor,
        })
    }

    /// The number of hours covered by the scenario
    pub fn horizon(&self) -> usize {
        self.load.len()
    }

    /// Build the sizing model for this scenario
    pub fn build_model(&self) -> Result<SizingModel, SizingError> {
        build_model(
            &self.load,
            &self.capacity_factor,
            &self.technology,
            &self.formulation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::StorageBoundary;
    use crate::units::{Hours, MoneyPerEnergy};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const TECHNOLOGY: &str = "[technology]
cost_per_kw_solar = 2500.0
cost_per_kwh_battery = 1000.0
charge_efficiency = 0.95
discharge_efficiency = 0.95
charge_duration_hours = 4
";

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    fn write_time_series(dir: &Path) {
        write_file(
            dir,
            "time_series.csv",
            "hour,load,capacity_factor\n0,10,0\n1,10,1\n2,10,0\n",
        );
    }

    #[test]
    fn test_scenario_from_path() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), SCENARIO_FILE_NAME, TECHNOLOGY);
        write_time_series(dir.path());

        let scenario = Scenario::from_path(dir.path()).unwrap();
        assert_eq!(scenario.horizon(), 3);
        assert_eq!(scenario.technology.charge_duration_hours, Hours(4.0));
        assert_eq!(scenario.formulation, FormulationOptions::default());
        assert_eq!(scenario.build_model().unwrap().horizon(), 3);
    }

    #[test]
    fn test_scenario_from_path_with_formulation() {
        let dir = tempdir().unwrap();
        let contents = format!(
            "{TECHNOLOGY}\n[formulation]\nstorage_boundary = \"cyclic\"\nvalue_of_lost_load = 5000\n"
        );
        write_file(dir.path(), SCENARIO_FILE_NAME, &contents);
        write_time_series(dir.path());

        let scenario = Scenario::from_path(dir.path()).unwrap();
        assert_eq!(
            scenario.formulation.storage_boundary,
            StorageBoundary::Cyclic
        );
        assert_eq!(
            scenario.formulation.value_of_lost_load,
            Some(MoneyPerEnergy(5000.0))
        );
    }

    #[test]
    fn test_scenario_from_path_invalid_parameters() {
        let dir = tempdir().unwrap();
        let contents = TECHNOLOGY.replace("\ncharge_efficiency = 0.95", "\ncharge_efficiency = 1.5");
        write_file(dir.path(), SCENARIO_FILE_NAME, &contents);
        write_time_series(dir.path());

        let err = Scenario::from_path(dir.path()).unwrap_err();
        assert!(format!("{err:?}").contains("charge_efficiency"));
    }

    #[test]
    fn test_scenario_from_path_invalid_time_series() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), SCENARIO_FILE_NAME, TECHNOLOGY);
        write_file(
            dir.path(),
            "time_series.csv",
            "hour,load,capacity_factor\n0,10,0\n1,10,1.5\n",
        );

        assert!(Scenario::from_path(dir.path()).is_err());
    }
}
