//! The module responsible for writing output data to disk.
use crate::scenario::Scenario;
use crate::sizing::{SizingModel, Solution};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;
pub use metadata::write_metadata;

/// The root folder in which scenario-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "solarsizer_results";

/// The output file name for the optimal sizing
const SIZING_FILE_NAME: &str = "sizing.csv";

/// The output file name for the hourly dispatch
const DISPATCH_FILE_NAME: &str = "dispatch.csv";

/// The output file name for constraint activities
const CONSTRAINTS_FILE_NAME: &str = "debug_constraints.csv";

/// Get the default output directory for the scenario at the specified path
pub fn get_output_dir(scenario_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let scenario_dir = scenario_dir
        .canonicalize()
        .context("Could not resolve path to scenario")?;

    let scenario_name = scenario_dir
        .file_name()
        .context("Scenario cannot be in root folder")?
        .to_str()
        .context("Invalid chars in scenario dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, scenario_name].iter().collect())
}

/// Create a new output directory, deleting the old one if requested.
///
/// An existing empty directory is reused as is.
///
/// # Returns
///
/// Whether an existing non-empty directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents the single row of the sizing CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SizingRow {
    solar_capacity: f64,
    battery_energy_capacity: f64,
    objective_value: f64,
}

/// Represents a row of the dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DispatchRow {
    hour: usize,
    load: f64,
    capacity_factor: f64,
    solar_output: f64,
    state_of_charge: f64,
    charge_power: f64,
    discharge_power: f64,
    unserved_load: f64,
}

/// Represents a row of the constraints CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ConstraintRow {
    kind: String,
    hour: Option<usize>,
    lower: f64,
    upper: f64,
    activity: f64,
}

/// Write the optimal sizing to a CSV file
fn write_sizing(output_path: &Path, solution: &Solution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(SIZING_FILE_NAME))?;
    writer.serialize(SizingRow {
        solar_capacity: solution.solar_capacity.value(),
        battery_energy_capacity: solution.battery_energy_capacity.value(),
        objective_value: solution.objective_value.value(),
    })?;
    writer.flush()?;

    Ok(())
}

/// Write the hourly dispatch, alongside the inputs for each hour, to a CSV file
fn write_dispatch(output_path: &Path, scenario: &Scenario, solution: &Solution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(DISPATCH_FILE_NAME))?;
    for dispatch in solution.iter_hours() {
        writer.serialize(DispatchRow {
            hour: dispatch.hour,
            load: scenario.load[dispatch.hour].value(),
            capacity_factor: scenario.capacity_factor[dispatch.hour].value(),
            solar_output: dispatch.solar_output.value(),
            state_of_charge: dispatch.state_of_charge.value(),
            charge_power: dispatch.charge_power.value(),
            discharge_power: dispatch.discharge_power.value(),
            unserved_load: dispatch.unserved_load.value(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write every constraint's bounds and activity at the optimum to a CSV file
fn write_constraints(output_path: &Path, model: &SizingModel, solution: &Solution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(CONSTRAINTS_FILE_NAME))?;
    for constraint in model.constraints() {
        let kind: &str = constraint.kind.into();
        writer.serialize(ConstraintRow {
            kind: kind.to_string(),
            hour: constraint.hour,
            lower: constraint.min,
            upper: constraint.max,
            activity: constraint.activity(solution.column_values()),
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the results of a sizing run to the output folder.
///
/// # Arguments
///
/// * `output_path` - Folder where files will be saved
/// * `scenario` - The scenario which was sized
/// * `model` - The model the solution was obtained from
/// * `solution` - The optimal sizing and dispatch
/// * `save_debug_info` - Whether to include extra CSV files for debugging the model
pub fn write_results(
    output_path: &Path,
    scenario: &Scenario,
    model: &SizingModel,
    solution: &Solution,
    save_debug_info: bool,
) -> Result<()> {
    write_sizing(output_path, solution)?;
    write_dispatch(output_path, scenario, solution)?;
    if save_debug_info {
        write_constraints(output_path, model, solution)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_factor, load, technology};
    use crate::parameters::{FormulationOptions, TechnoEconomicParameters};
    use crate::sizing::RawSolution;
    use crate::sizing::model::ConstraintKind;
    use itertools::Itertools;
    use rstest::{fixture, rstest};
    use serde::de::DeserializeOwned;
    use tempfile::tempdir;

    #[fixture]
    fn scenario(technology: TechnoEconomicParameters) -> Scenario {
        Scenario {
            scenario_path: PathBuf::from("test"),
            technology,
            formulation: FormulationOptions::default(),
            load: load(&[1.0, 2.0]),
            capacity_factor: capacity_factor(&[0.5, 0.5]),
        }
    }

    /// A solution which serves the load directly from solar
    fn solve_by_hand(model: &SizingModel) -> Solution {
        let vars = model.variables();
        let mut columns = vec![0.0; model.columns().len()];
        columns[vars.solar_capacity.index()] = 4.0;
        columns[vars.solar_output[0].index()] = 1.0;
        columns[vars.solar_output[1].index()] = 2.0;
        let objective_value = model.objective_value(&columns);

        Solution::from_raw(
            model,
            RawSolution {
                columns,
                objective_value,
            },
        )
        .unwrap()
    }

    fn read_rows<T: DeserializeOwned>(file_path: &Path) -> Vec<T> {
        csv::Reader::from_path(file_path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[rstest]
    fn test_write_results(scenario: Scenario) {
        let model = scenario.build_model().unwrap();
        let solution = solve_by_hand(&model);
        let dir = tempdir().unwrap();
        write_results(dir.path(), &scenario, &model, &solution, false).unwrap();

        let sizing: Vec<SizingRow> = read_rows(&dir.path().join(SIZING_FILE_NAME));
        assert_eq!(
            sizing,
            [SizingRow {
                solar_capacity: 4.0,
                battery_energy_capacity: 0.0,
                objective_value: 10000.0,
            }]
        );

        let dispatch: Vec<DispatchRow> = read_rows(&dir.path().join(DISPATCH_FILE_NAME));
        assert_eq!(dispatch.len(), 2);
        assert_eq!(
            dispatch[1],
            DispatchRow {
                hour: 1,
                load: 2.0,
                capacity_factor: 0.5,
                solar_output: 2.0,
                state_of_charge: 0.0,
                charge_power: 0.0,
                discharge_power: 0.0,
                unserved_load: 0.0,
            }
        );

        assert!(!dir.path().join(CONSTRAINTS_FILE_NAME).exists());
    }

    #[rstest]
    fn test_write_results_debug(scenario: Scenario) {
        let model = scenario.build_model().unwrap();
        let solution = solve_by_hand(&model);
        let dir = tempdir().unwrap();
        write_results(dir.path(), &scenario, &model, &solution, true).unwrap();

        let rows: Vec<ConstraintRow> = read_rows(&dir.path().join(CONSTRAINTS_FILE_NAME));
        assert_eq!(rows.len(), model.constraints().len());

        let balance = rows
            .iter()
            .find(|row| row.kind == ConstraintKind::EnergyBalance.to_string() && row.hour == Some(1))
            .unwrap();
        assert_eq!(balance.lower, 2.0);
        assert_eq!(balance.upper, 2.0);
        assert_eq!(balance.activity, 2.0);
    }

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("results");

        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        assert!(!create_output_directory(temp_dir.path(), false).unwrap());
    }

    #[test]
    fn test_create_output_directory_existing_with_files() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join(SIZING_FILE_NAME);
        fs::write(&file_path, "data").unwrap();

        assert!(create_output_directory(temp_dir.path(), false).is_err());
        assert!(file_path.exists());

        assert!(create_output_directory(temp_dir.path(), true).unwrap());
        assert!(temp_dir.path().is_dir());
        assert!(!file_path.exists());
    }

    #[test]
    fn test_get_output_dir() {
        let temp_dir = tempdir().unwrap();
        let scenario_dir = temp_dir.path().join("my_scenario");
        fs::create_dir(&scenario_dir).unwrap();

        assert_eq!(
            get_output_dir(&scenario_dir).unwrap(),
            PathBuf::from("solarsizer_results/my_scenario")
        );
    }
}
