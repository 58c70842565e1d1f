//! # Girder CLI
//!
//! Runs a project file through the analysis engine and prints the results as
//! JSON on stdout. Logs go to stderr; set `RUST_LOG` to change the level.
//!
//! ```text
//! girder_cli run bridge.json --criteria lrfd9.toml --interval 4
//! girder_cli intervals bridge.json
//! girder_cli check bridge.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use girder_core::timeline::IntervalIndex;
use girder_core::{AnalysisCriteria, BridgeProject, EngineError, EngineResult};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Time-step analysis of prestressed concrete girders.
#[derive(Debug, Parser)]
#[command(name = "girder_cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Replace the project's criteria with a TOML criteria file
    #[arg(short, long, global = true)]
    criteria: Option<PathBuf>,

    /// Print compact instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyse every POI and rate every vehicle
    Run {
        project: PathBuf,
        /// Interval to report capacities in (1-based, default: last)
        #[arg(short, long)]
        interval: Option<usize>,
    },

    /// List the analysis intervals of a project
    Intervals { project: PathBuf },

    /// Build the project without running it
    Check { project: PathBuf },
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    code: &'a str,
    message: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), "{}", e);
            let report = ErrorReport {
                code: e.error_code(),
                message: e.to_string(),
            };
            if let Ok(json) = serde_json::to_string_pretty(&report) {
                println!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> EngineResult<()> {
    match &cli.command {
        Command::Run { project, interval } => {
            let project = load(project, cli)?;
            let interval = interval.map(to_index).transpose()?;
            let report = project.build()?.run(interval)?;
            if report.diagnostics.is_empty() {
                info!(pois = report.pois.len(), "run complete");
            } else {
                info!(pois = report.pois.len(), warnings = report.diagnostics.len(), "run complete with warnings");
            }
            emit(&report, cli.compact)
        }
        Command::Intervals { project } => {
            let project = load(project, cli)?;
            let analysis = project.build()?;
            emit(analysis.timeline().intervals(), cli.compact)
        }
        Command::Check { project } => {
            let project = load(project, cli)?;
            let analysis = project.build()?;
            info!(
                intervals = analysis.timeline().interval_count(),
                pois = analysis.pois().len(),
                vehicles = analysis.vehicles().len(),
                "project is valid"
            );
            Ok(())
        }
    }
}

fn load(path: &Path, cli: &Cli) -> EngineResult<BridgeProject> {
    let mut project = BridgeProject::load(path)?;
    if let Some(criteria) = &cli.criteria {
        project.criteria = AnalysisCriteria::from_toml_file(criteria)?;
        info!(path = %criteria.display(), edition = %project.criteria.edition, "criteria overridden");
    }
    Ok(project)
}

fn to_index(interval: usize) -> EngineResult<IntervalIndex> {
    interval
        .checked_sub(1)
        .map(IntervalIndex)
        .ok_or_else(|| EngineError::invalid_input("interval", interval.to_string(), "intervals are numbered from 1"))
}

fn emit<T: Serialize + ?Sized>(value: &T, compact: bool) -> EngineResult<()> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_numbering_is_one_based() {
        assert_eq!(to_index(1).unwrap(), IntervalIndex(0));
        assert!(to_index(0).is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::parse_from(["girder_cli", "run", "bridge.json", "--interval", "3", "--compact"]);
        assert!(cli.compact);
        match cli.command {
            Command::Run { project, interval } => {
                assert_eq!(project, PathBuf::from("bridge.json"));
                assert_eq!(interval, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
