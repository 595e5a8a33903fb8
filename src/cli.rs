//! The command line interface for solarsizer.
use crate::log;
use crate::output::{create_output_directory, get_output_dir, write_metadata, write_results};
use crate::scenario::Scenario;
use crate::settings::Settings;
use crate::sizing::solve_model;
use crate::units::Energy;
use ::log::{Level, info, log_enabled, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for solarsizer.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write the model's constraints and their activities to a CSV file
    #[arg(long)]
    pub debug_model: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Find the optimal solar and battery sizing for a scenario.
    Run {
        /// Path to the scenario directory.
        scenario_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example scenarios.
    Example {
        /// The available subcommands for managing example scenarios.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a scenario without solving it.
    Validate {
        /// The path to the scenario directory.
        scenario_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { scenario_dir, opts } => handle_run_command(&scenario_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { scenario_dir } => handle_validate_command(&scenario_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start solarsizer
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ solarsizer --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Unserved load (kWh) below this is treated as solver round-off
const UNSERVED_LOAD_TOLERANCE: f64 = 1e-6;

/// The unserved load worth warning about, if any
fn significant_unserved_load(unserved: Energy) -> Option<Energy> {
    (unserved.value() > UNSERVED_LOAD_TOLERANCE).then_some(unserved)
}

/// Load the program settings if the caller didn't provide any
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `run` command.
pub fn handle_run_command(
    scenario_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;

    // These settings can be overridden by command-line arguments
    settings.debug_model |= opts.debug_model;
    settings.overwrite |= opts.overwrite;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(scenario_path)?;
        &pathbuf
    };

    let overwritten =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(&settings.log_level, Some(output_path)).context("Failed to initialise logging.")?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwritten {
        warn!("Output folder will be overwritten");
    }

    let scenario = Scenario::from_path(scenario_path).context("Failed to load scenario.")?;
    info!("Loaded scenario from {}", scenario_path.display());
    info!("Output folder: {}", output_path.display());

    let solver = settings.create_solver(log_enabled!(Level::Debug))?;
    let model = scenario
        .build_model()
        .context("Failed to build sizing model.")?;
    let solution = solve_model(&model, solver.as_ref()).context("Failed to size system.")?;

    if let Some(unserved) = significant_unserved_load(solution.total_unserved_load()) {
        warn!("{unserved:.2} kWh of load is left unserved over the horizon");
    }

    write_results(
        output_path,
        &scenario,
        &model,
        &solution,
        settings.debug_model,
    )
    .context("Failed to write results.")?;
    write_metadata(output_path, scenario_path, solver.name())
        .context("Failed to save metadata.")?;
    info!("Sizing complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(scenario_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    validate_scenario(scenario_path, &settings)?;
    info!("Scenario validation successful!");

    Ok(())
}

/// Check the solver settings and the scenario in the same way a run would, without solving
fn validate_scenario(scenario_path: &Path, settings: &Settings) -> Result<()> {
    settings.create_solver(false)?;
    let scenario = Scenario::from_path(scenario_path).context("Failed to validate scenario.")?;
    scenario
        .build_model()
        .context("Failed to validate scenario.")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::SizingError;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, None)]
    #[case(1e-12, None)]
    #[case(5.0, Some(Energy(5.0)))]
    fn test_significant_unserved_load(#[case] unserved: f64, #[case] expected: Option<Energy>) {
        assert_eq!(significant_unserved_load(Energy(unserved)), expected);
    }

    #[test]
    fn test_validate_scenario() {
        let scenario_path = PathBuf::from("demos/simple");
        validate_scenario(&scenario_path, &Settings::default()).unwrap();

        // Bad solver settings are reported even though validation never solves
        let settings = Settings {
            solver: "cplex".into(),
            ..Settings::default()
        };
        let err = validate_scenario(&scenario_path, &settings).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SizingError>(),
            Some(SizingError::SolverUnavailable(_))
        ));

        let settings = Settings {
            time_limit_seconds: Some(-1.0),
            ..Settings::default()
        };
        assert!(validate_scenario(&scenario_path, &settings).is_err());
    }
}
