//! IAT CLI - Command-line interface for the IAT engine
//!
//! Commands:
//! - score: Score a response log and print the D-score result
//! - simulate: Run a seeded synthetic session and print the session record
//! - plan: Print the block plan for a counterbalancing model
//! - doctor: Diagnose engine health and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use iat_engine::catalog::StimulusCatalog;
use iat_engine::planner::{block_spec, expected_trial_count, BLOCK_COUNT};
use iat_engine::schema::{ResponseLog, SCHEMA_VERSION};
use iat_engine::scoring::compute_d_score;
use iat_engine::session::simulate_session;
use iat_engine::types::TestModel;
use iat_engine::{EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// IAT - Trial sequencing and D-score scoring engine for Implicit Association Tests
#[derive(Parser)]
#[command(name = "iat")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score and simulate Implicit Association Test sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a response log and print the D-score result
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Test model for NDJSON input (JSON input carries its own)
        #[arg(long, default_value = "a")]
        model: ModelArg,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Run a seeded synthetic session and print the full session record
    Simulate {
        /// Counterbalancing model
        #[arg(long, default_value = "a")]
        model: ModelArg,

        /// RNG seed for shuffling and latencies
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the block plan (mappings and trial counts) for a model
    Plan {
        /// Counterbalancing model
        #[arg(long, default_value = "a")]
        model: ModelArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine health and configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Single JSON object (iat.response_log.v1)
    Json,
    /// Newline-delimited JSON (one response per line)
    Ndjson,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    A,
    B,
}

impl From<ModelArg> for TestModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::A => TestModel::A,
            ModelArg::B => TestModel::B,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), IatCliError> {
    match cli.command {
        Commands::Score {
            input,
            input_format,
            model,
            pretty,
        } => cmd_score(&input, input_format, model.into(), pretty),

        Commands::Simulate {
            model,
            seed,
            pretty,
        } => cmd_simulate(model.into(), seed, pretty),

        Commands::Plan { model, json } => cmd_plan(model.into(), json),

        Commands::Doctor { json } => cmd_doctor(json),
    }
}

fn cmd_score(
    input: &PathBuf,
    input_format: InputFormat,
    model: TestModel,
    pretty: bool,
) -> Result<(), IatCliError> {
    // Read input
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let log = match input_format {
        InputFormat::Json => ResponseLog::from_json(&input_data)?,
        InputFormat::Ndjson => ResponseLog::from_ndjson(&input_data, model)?,
    };

    if log.responses.is_empty() {
        return Err(IatCliError::NoResponses);
    }

    let result = compute_d_score(&log.responses);
    let output = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", output);

    Ok(())
}

fn cmd_simulate(model: TestModel, seed: u64, pretty: bool) -> Result<(), IatCliError> {
    let record = simulate_session(StimulusCatalog::builtin(), model, seed)?;

    let output = if pretty {
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string(&record)?
    };
    println!("{}", output);

    Ok(())
}

fn cmd_plan(model: TestModel, json: bool) -> Result<(), IatCliError> {
    let catalog = StimulusCatalog::builtin();

    if json {
        let mut blocks = Vec::new();
        for block in 1..=BLOCK_COUNT {
            let spec = block_spec(block, model)?;
            blocks.push(serde_json::json!({
                "block": spec.block,
                "effective_block": spec.effective_block,
                "trials": expected_trial_count(&catalog, block, model),
                "key_mapping": spec
                    .categories()
                    .iter()
                    .map(|c| (c.as_str().to_string(), spec.key_for(*c)))
                    .collect::<std::collections::HashMap<_, _>>(),
            }));
        }
        println!("{}", serde_json::to_string_pretty(&blocks)?);
    } else {
        println!("Block plan (model {})", model.as_str());
        println!("====================");
        for block in 1..=BLOCK_COUNT {
            let spec = block_spec(block, model)?;
            println!(
                "Block {} (effective {}): {} trials",
                spec.block,
                spec.effective_block,
                expected_trial_count(&catalog, block, model)
            );
            for category in spec.categories() {
                if let Some(side) = spec.key_for(category) {
                    println!("  {:24} -> {:?}", category.as_str(), side);
                }
            }
        }
    }

    Ok(())
}

fn cmd_doctor(json: bool) -> Result<(), IatCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    // Built-in catalog balance
    let catalog = StimulusCatalog::builtin();
    match catalog.validate() {
        Ok(()) => checks.push(DoctorCheck {
            name: "catalog".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Built-in catalog valid ({} stimuli, {} per category)",
                catalog.items().len(),
                catalog.per_category_count()
            ),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "catalog".to_string(),
            status: CheckStatus::Error,
            message: format!("Built-in catalog invalid: {}", e),
        }),
    }

    // Check stdin (for piping logs into `score -i -`)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (log streaming ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("IAT Doctor Report");
        println!("=================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(IatCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum IatCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoResponses,
    DoctorFailed,
}

impl From<io::Error> for IatCliError {
    fn from(e: io::Error) -> Self {
        IatCliError::Io(e)
    }
}

impl From<EngineError> for IatCliError {
    fn from(e: EngineError) -> Self {
        IatCliError::Engine(e)
    }
}

impl From<serde_json::Error> for IatCliError {
    fn from(e: serde_json::Error) -> Self {
        IatCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<IatCliError> for CliError {
    fn from(e: IatCliError) -> Self {
        match e {
            IatCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            IatCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            IatCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            IatCliError::NoResponses => CliError {
                code: "NO_RESPONSES".to_string(),
                message: "No responses found in input".to_string(),
                hint: Some("Ensure the log is not empty".to_string()),
            },
            IatCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Error,
}
