//! Code for loading program settings.
use crate::get_solarsizer_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::sizing::{Solver, SolverBackend};
use anyhow::{Context, Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for solarsizer
# Uncomment a line to override the default value
";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Default solver backend
fn default_solver() -> String {
    SolverBackend::default().to_string()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_solarsizer_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to write the model's constraints and their activities to a CSV file
    #[serde(default)]
    pub debug_model: bool,
    /// The LP solver backend to use
    #[serde(default = "default_solver")]
    pub solver: String,
    /// Maximum time (in seconds) the solver may run for before giving up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            debug_model: false,
            solver: default_solver(),
            time_limit_seconds: None,
        }
    }
}

impl Settings {
    /// Read the contents of a settings file from the config directory.
    ///
    /// If the file is not present, default values for settings will be used
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if the file is invalid
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, falling back on defaults if the file doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// The solver time limit, if one was set
    pub fn time_limit(&self) -> Result<Option<Duration>> {
        let Some(seconds) = self.time_limit_seconds else {
            return Ok(None);
        };

        ensure!(
            seconds.is_finite() && seconds > 0.0,
            "time_limit_seconds must be a positive number, got {seconds}"
        );

        let time_limit = Duration::try_from_secs_f64(seconds)
            .with_context(|| format!("time_limit_seconds is too large, got {seconds}"))?;

        Ok(Some(time_limit))
    }

    /// Create the solver named in these settings.
    ///
    /// # Arguments
    ///
    /// * `log_output` - Whether the solver should write its own progress messages
    pub fn create_solver(&self, log_output: bool) -> Result<Box<dyn Solver>> {
        let backend = SolverBackend::from_name(&self.solver)?;
        let time_limit = self.time_limit().context("Invalid solver settings")?;

        Ok(backend.create(time_limit, log_output))
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> String {
        // Settings object with default values set by serde
        let settings: Settings =
            toml::from_str("").expect("Cannot create settings from empty TOML file");

        // Convert to TOML
        let settings_raw = toml::to_string(&settings).expect("Could not convert settings to TOML");

        // Comment out each line of the generated TOML, preceded by the field's docs
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            let Some((field, _)) = line.split_once('=') else {
                continue;
            };

            // All fields should have doc comments
            let docs = Settings::get_field_docs(field.trim()).expect("Missing doc comment for field");
            for doc_line in docs.lines() {
                write!(&mut out, "\n# # {}\n", doc_line.trim()).unwrap();
            }

            writeln!(&mut out, "# {}", line.trim()).unwrap();
        }

        out
    }
}
