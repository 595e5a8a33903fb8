//! Code for reading the hourly load and capacity factor profiles from a CSV file.
use super::{input_err_msg, read_csv};
use crate::time_series::{CapacityFactorProfile, LoadProfile};
use crate::units::{Dimensionless, Energy};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const TIME_SERIES_FILE_NAME: &str = "time_series.csv";

/// A row of the time series CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct TimeSeriesRaw {
    hour: usize,
    load: f64,
    capacity_factor: f64,
}

/// Split raw records into load and capacity factor profiles.
///
/// Hours must start at zero and increase by one on each row.
fn read_time_series_from_iter<I>(iter: I) -> Result<(LoadProfile, CapacityFactorProfile)>
where
    I: IntoIterator<Item = TimeSeriesRaw>,
{
    let mut load = Vec::new();
    let mut capacity_factor = Vec::new();
    for (expected_hour, record) in iter.into_iter().enumerate() {
        ensure!(
            record.hour == expected_hour,
            "Hours must be consecutive and start at 0 (expected {expected_hour}, found {})",
            record.hour
        );

        load.push(Energy(record.load));
        capacity_factor.push(Dimensionless(record.capacity_factor));
    }

    Ok((load.into(), capacity_factor.into()))
}

/// Read the load and capacity factor profiles from the scenario directory.
///
/// The values themselves are validated when the sizing model is built.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario configuration files
pub fn read_time_series(scenario_dir: &Path) -> Result<(LoadProfile, CapacityFactorProfile)> {
    let file_path = scenario_dir.join(TIME_SERIES_FILE_NAME);
    let records = read_csv(&file_path)?;
    read_time_series_from_iter(records).with_context(|| input_err_msg(&file_path))
}
