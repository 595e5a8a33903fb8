//! Code for writing metadata about a run to file
use anyhow::{Result, anyhow};
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata,
    platform: PlatformMetadata,
}

/// Information about the sizing run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the scenario which was sized
    scenario_path: &'a Path,
    /// The solver backend used
    solver: &'a str,
    /// The date and time on which the run started
    datetime: String,
}

#[derive(Serialize)]
struct ProgramMetadata {
    /// The program name
    name: &'static str,
    /// The program version as specified in Cargo.toml
    version: &'static str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'static str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used to compile solarsizer
    rustc_version: &'static str,
    /// When solarsizer was built
    build_time_utc: &'static str,
    /// The git commit hash for this version (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform on which solarsizer is running.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info =
            PlatformInfo::new().map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;

        Ok(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata to the specified output path in TOML format
///
/// # Arguments
///
/// * `output_path` - Folder where the file will be saved
/// * `scenario_path` - Path to the scenario which was sized
/// * `solver` - Name of the solver backend used
pub fn write_metadata(output_path: &Path, scenario_path: &Path, solver: &str) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            scenario_path,
            solver,
            datetime: Local::now().to_rfc2822(),
        },
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::new()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_metadata() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), Path::new("scenario"), "HiGHS").unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let metadata: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(metadata["run"]["scenario_path"].as_str(), Some("scenario"));
        assert_eq!(metadata["run"]["solver"].as_str(), Some("HiGHS"));
        assert_eq!(metadata["program"]["name"].as_str(), Some("solarsizer"));
    }
}
