//! Common functionality for solarsizer.
//!
//! solarsizer finds the cheapest combination of solar capacity and battery energy capacity that
//! meets an hourly load profile over a fixed horizon, by building and solving a linear program.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod input;
pub mod log;
pub mod output;
pub mod parameters;
pub mod scenario;
pub mod settings;
pub mod sizing;
pub mod time_series;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// Falls back on the current directory if the platform doesn't provide one.
pub fn get_solarsizer_config_dir() -> PathBuf {
    let Some(mut dir) = dirs::config_dir() else {
        return PathBuf::new();
    };

    dir.push("solarsizer");
    dir
}
