//! codeflow CLI.
//!
//! Provides the `codeflow` binary. `codeflow run <FILE>` executes a script
//! under the trace recorder, prints what the script printed, and writes the
//! run's event log and call tree as JSON (and optionally as a Graphviz DOT
//! call graph).
//!
//! Runner settings are read from `CODEFLOW_*` environment variables first;
//! command-line flags override them.

mod dot;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use codeflow_core::RunResult;
use codeflow_runner::{Runner, RunnerConfig};

/// Execution tracer for codeflow scripts.
#[derive(Debug, Parser)]
#[command(name = "codeflow", about = "Trace a script's execution and build its call tree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a script and record its trace.
    Run {
        /// Script to run.
        file: PathBuf,

        /// Where to write the JSON trace (default: <FILE>.trace.json).
        #[arg(long)]
        json: Option<PathBuf>,

        /// Also write the call graph in Graphviz DOT format.
        #[arg(long)]
        dot: Option<PathBuf>,

        /// Include the <module> frame in the DOT graph.
        #[arg(long)]
        show_module: bool,

        /// Longest rendered value, in characters.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_repr_len: Option<u32>,

        /// Log progress and print trace counts.
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            json,
            dot,
            show_module,
            max_repr_len,
            verbose,
        } => {
            init_logging(verbose);
            let mut config = RunnerConfig::from_env();
            if let Some(len) = max_repr_len {
                config.max_repr_len = len as usize;
            }
            let outputs = Outputs {
                json: json.unwrap_or_else(|| default_json_path(&file)),
                dot,
                show_module,
            };
            let exit_code = run_trace(&file, config, &outputs, verbose);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Outputs {
    json: PathBuf,
    dot: Option<PathBuf>,
    show_module: bool,
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = success, 1 = the script raised or failed to
/// parse, 3 = I/O error.
fn run_trace(file: &Path, config: RunnerConfig, outputs: &Outputs, verbose: bool) -> i32 {
    let runner = Runner::new(config);
    let result = match runner.run_file(file) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };

    for line in result.output() {
        println!("{}", line);
    }

    if let Err(msg) = write_outputs(&result, outputs) {
        eprintln!("Error: {}", msg);
        return 3;
    }

    let summary = result.summary();
    if verbose {
        eprintln!(
            "nodes={} edges={} events={} (calls={} lines={} returns={} exceptions={})",
            summary.nodes,
            summary.edges,
            result.events().len(),
            summary.calls,
            summary.lines,
            summary.returns,
            summary.exceptions
        );
    }

    match result.error() {
        None => {
            eprintln!("ok: {} call(s) traced -> {}", summary.nodes, outputs.json.display());
            0
        }
        Some(error) => {
            eprintln!("{}", error);
            eprintln!(
                "runtime_error: partial trace of {} call(s) -> {}",
                summary.nodes,
                outputs.json.display()
            );
            1
        }
    }
}

fn write_outputs(result: &RunResult, outputs: &Outputs) -> Result<(), String> {
    let json = result
        .to_json_pretty()
        .map_err(|e| format!("failed to serialize trace: {}", e))?;
    fs::write(&outputs.json, json)
        .map_err(|e| format!("failed to write '{}': {}", outputs.json.display(), e))?;
    info!(path = %outputs.json.display(), "trace written");

    if let Some(path) = &outputs.dot {
        fs::write(path, dot::render(result, outputs.show_module))
            .map_err(|e| format!("failed to write '{}': {}", path.display(), e))?;
        info!(path = %path.display(), "call graph written");
    }
    Ok(())
}

/// `<file>.trace.json`, next to the script.
fn default_json_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".trace.json");
    PathBuf::from(name)
}
