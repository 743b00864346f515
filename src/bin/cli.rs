//! `kigali-sim-engine run|validate` (§6 ADDED "CLI surface"). Thin: all of
//! the actual work lives in the library crate, this binary only parses
//! flags, wires up an [`EngineConfig`], and maps results to exit codes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use kigali_sim_engine::command::Command;
use kigali_sim_engine::config::EngineConfig;
use kigali_sim_engine::error::EngineError;
use kigali_sim_engine::report;
use kigali_sim_engine::scenario::Scenario;
use kigali_sim_engine::scenario::runner::ScenarioRunner;
use kigali_sim_engine::script::ScriptFile;
use kigali_sim_engine::validate::validate_commands;

#[derive(Parser)]
#[command(name = "kigali-sim-engine", about = "Kigali-Amendment HFC phase-down simulation engine")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Simulates one or all declared scenarios and writes CSV rows.
    Run {
        script: PathBuf,
        #[arg(long)]
        scenario: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long, value_parser = parse_seconds)]
        deadline: Option<Duration>,
    },
    /// Loads and validates the command list without simulating.
    Validate { script: PathBuf },
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    raw.parse::<u64>().map(Duration::from_secs).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprint!("{e}");
            return ExitCode::from(3);
        }
    };
    match run(cli.command) {
        Ok(()) => ExitCode::from(0),
        Err(EngineError::Script(e)) => {
            tracing::error!(error = %e, "script error");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!(error = %e, "runtime error");
            ExitCode::from(2)
        }
    }
}

fn run(cmd: Cmd) -> Result<(), EngineError> {
    match cmd {
        Cmd::Run { script, scenario, output, seed, jobs, deadline } => {
            let file = ScriptFile::load(&script)?;
            let scenarios = file.scenarios_matching(scenario.as_deref());
            validate_commands_for_scenarios(&file.commands, &scenarios)?;

            let config = EngineConfig {
                seed,
                jobs,
                deadline,
            };
            let runner = ScenarioRunner::new(&config).with_progress(output.is_some());
            let rows = runner.run(&file.commands, &scenarios)?;

            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path).map_err(|source| kigali_sim_engine::error::IoError::Open {
                        path: path.display().to_string(),
                        source,
                    })?;
                    report::write_rows(file, &rows)?;
                }
                None => {
                    report::write_rows(std::io::stdout(), &rows)?;
                }
            }
            Ok(())
        }
        Cmd::Validate { script } => {
            let file = ScriptFile::load(&script)?;
            validate_commands_for_scenarios(&file.commands, &file.scenarios)?;
            println!("ok: {} commands across {} scenarios", file.commands.len(), file.scenarios.len());
            Ok(())
        }
    }
}

/// Validates the command list once per scenario, since I2-I4 are checked
/// over the `[scenario_start, scenario_end]` window each scenario declares.
fn validate_commands_for_scenarios(commands: &[Command], scenarios: &[Scenario]) -> Result<(), EngineError> {
    for scenario in scenarios {
        validate_commands(commands, scenario.start_year, scenario.end_year)?;
    }
    Ok(())
}
