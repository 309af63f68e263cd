mod config;
mod render;
mod serve;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use statescope_interchange::{
    decode_initial_input_value, parse_history, InitialInput, InterchangeError, PrimitiveEvent,
};
use statescope_replay::{
    list_workflows, reconstruct, reconstruct_log, show_workflow, ExecutionStatus,
    ReconstructError, Reconstruction,
};
use statescope_storage::{DirectoryHistorySource, ExecutionHistoryRecord};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Inspect iWF executions as state-level histories.
#[derive(Parser)]
#[command(
    name = "statescope",
    version,
    about = "Reconstruct and browse iWF execution histories"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Log filter, e.g. `debug` or `statescope_replay=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Path to statescope.toml (default: ./statescope.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a primitive event log file
    Replay {
        /// JSON array of primitive events, or an exported execution record
        log: PathBuf,
        /// Initial input JSON; defaults to the log's ExecutionStarted input
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Show the reconstructed history of one execution
    Show {
        /// Execution id
        execution_id: String,
        /// Run id (default: the most recently started run)
        #[arg(long)]
        run_id: Option<String>,
        /// Directory of exported execution histories
        #[arg(long)]
        history_dir: Option<PathBuf>,
    },

    /// List known executions, latest first
    List {
        /// Directory of exported execution histories
        #[arg(long)]
        history_dir: Option<PathBuf>,
    },

    /// Map a native execution status code or string
    Status {
        /// e.g. `7` or `WORKFLOW_EXECUTION_STATUS_TIMED_OUT`
        code: String,
    },

    /// Start the statescope HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Directory of exported execution histories
        #[arg(long)]
        history_dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e, "Config", cli.output);
            process::exit(1);
        }
    };
    init_tracing(cli.log_level.as_deref(), &config);

    match cli.command {
        Commands::Replay { log, input } => {
            cmd_replay(&log, input.as_deref(), cli.output);
        }
        Commands::Show {
            execution_id,
            run_id,
            history_dir,
        } => {
            let source = history_source(history_dir, &config);
            cmd_show(&source, &execution_id, run_id.as_deref(), cli.output);
        }
        Commands::List { history_dir } => {
            let source = history_source(history_dir, &config);
            cmd_list(&source, cli.output);
        }
        Commands::Status { code } => {
            cmd_status(&code, cli.output);
        }
        Commands::Serve {
            port,
            bind,
            history_dir,
        } => {
            let source = history_source(history_dir, &config);
            let options = serve::ServeOptions {
                bind: bind.unwrap_or(config.server.bind),
                port: port.unwrap_or(config.server.port),
                rate_limit: config.server.rate_limit,
                api_key: config.server.api_key,
            };
            tracing::info!(history_dir = %source.root().display(), "serving histories");
            if let Err(e) = runtime().block_on(serve::start_server(Arc::new(source), options)) {
                report_error(&format!("server error: {}", e), "Server", cli.output);
                process::exit(1);
            }
        }
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for `--output json`.
fn init_tracing(flag: Option<&str>, config: &Config) {
    let filter = match flag {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.logging.level.as_deref().unwrap_or("warn"))
        }),
    };
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {}", e);
            process::exit(1);
        }
    }
}

fn history_source(flag: Option<PathBuf>, config: &Config) -> DirectoryHistorySource {
    DirectoryHistorySource::new(flag.unwrap_or_else(|| config.history.dir.clone()))
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_replay(log_path: &Path, input_path: Option<&Path>, output: OutputFormat) {
    let log = match read_log(log_path) {
        Ok(log) => log,
        Err(msg) => {
            report_error(&msg, "InvalidLog", output);
            process::exit(1);
        }
    };

    let result = match input_path {
        Some(path) => match read_initial_input(path) {
            Ok(initial) => reconstruct(&initial, &log),
            Err((msg, kind)) => {
                report_error(&msg, kind, output);
                process::exit(1);
            }
        },
        None => reconstruct_log(&log),
    };

    match result {
        Ok(reconstruction) => print_reconstruction(&reconstruction, output),
        Err(e) => {
            report_error(&e.to_string(), reconstruct_error_kind(&e), output);
            process::exit(1);
        }
    }
}

/// Accepts a bare event array or an exported `ExecutionHistoryRecord`.
fn read_log(path: &Path) -> Result<Vec<PrimitiveEvent>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    if content.trim_start().starts_with('[') {
        parse_history(&content).map_err(|e| format!("{}: {}", path.display(), e))
    } else {
        serde_json::from_str::<ExecutionHistoryRecord>(&content)
            .map(|record| record.events)
            .map_err(|e| format!("{}: invalid execution record: {}", path.display(), e))
    }
}

/// Errors carry the kind reported alongside the message.
fn read_initial_input(path: &Path) -> Result<InitialInput, (String, &'static str)> {
    let invalid = |e: &dyn std::fmt::Display| {
        (
            format!("{}: invalid initial input: {}", path.display(), e),
            "InvalidInput",
        )
    };
    let content = std::fs::read_to_string(path).map_err(|e| {
        (
            format!("could not read '{}': {}", path.display(), e),
            "InvalidInput",
        )
    })?;
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| invalid(&e))?;
    decode_initial_input_value(value).map_err(|e| match e {
        InterchangeError::NotStateWorkflow { missing } => (
            format!(
                "unsupported execution: initial input carries no '{}' marker",
                missing
            ),
            "UnsupportedExecution",
        ),
        other => invalid(&other),
    })
}

fn reconstruct_error_kind(err: &ReconstructError) -> &'static str {
    match err {
        ReconstructError::MalformedHistory { .. } => "MalformedHistory",
        ReconstructError::UnsupportedExecution { .. } => "UnsupportedExecution",
    }
}

fn print_reconstruction(reconstruction: &Reconstruction, output: OutputFormat) {
    let pending = reconstruction.pending.summary();
    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "historyEvents": reconstruction.events,
                "pendingStates": pending,
                "failedTasks": reconstruction.failed_tasks,
            });
            print_json(&value);
        }
        OutputFormat::Text => {
            print!(
                "{}",
                render::render_history(
                    &reconstruction.events,
                    &pending,
                    &reconstruction.failed_tasks
                )
            );
        }
    }
}

fn cmd_show(
    source: &DirectoryHistorySource,
    execution_id: &str,
    run_id: Option<&str>,
    output: OutputFormat,
) {
    match runtime().block_on(show_workflow(source, execution_id, run_id)) {
        Ok(view) => match output {
            OutputFormat::Json => print_json(&view),
            OutputFormat::Text => print!("{}", render::render_view(&view)),
        },
        Err(e) => {
            report_error(&e.to_string(), e.kind(), output);
            process::exit(1);
        }
    }
}

fn cmd_list(source: &DirectoryHistorySource, output: OutputFormat) {
    match runtime().block_on(list_workflows(source)) {
        Ok(rows) => match output {
            OutputFormat::Json => print_json(&serde_json::json!({ "executions": rows })),
            OutputFormat::Text => print!("{}", render::render_summaries(&rows)),
        },
        Err(e) => {
            report_error(&e.to_string(), e.kind(), output);
            process::exit(1);
        }
    }
}

fn cmd_status(code: &str, output: OutputFormat) {
    match ExecutionStatus::from_native(code) {
        Ok(status) => match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "raw": code,
                "status": status,
                "closed": status.is_closed(),
            })),
            OutputFormat::Text => println!("{}", status),
        },
        Err(e) => {
            report_error(&e.to_string(), "UnknownStatus", output);
            process::exit(1);
        }
    }
}

// ── Output helpers ────────────────────────────────────────────────────────────

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("error: serialization failed: {}", e);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, kind: &str, output: OutputFormat) {
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg, "kind": kind }));
        }
    }
}
