//! The run orchestrator.
//!
//! One run: create a recorder for the unit's display name, install it in a
//! fresh hook slot, execute the unit, release the slot, and package the
//! recorder's log, nodes and edges with the outcome. The slot is released
//! on every exit path because the guard that holds it is scoped to the
//! execution; the recorder is only read after that scope has closed.
//!
//! Execution happens on a dedicated thread whose stack is sized for the
//! configured recursion depth.

use std::path::Path;
use std::thread;

use tracing::{debug, info, warn};

use codeflow_core::{HookSlot, RecordedTrace, RunResult, TraceRecorder, ValueRenderer};
use codeflow_script::{parse, Environment, Interpreter, InterpreterConfig, ParseError, Raised};

use crate::config::RunnerConfig;
use crate::error::RunError;
use crate::traceback::{format_syntax_error, format_traceback};

/// Stack reserved per allowed frame of the traced unit.
const STACK_PER_FRAME: usize = 64 * 1024;
const MIN_STACK: usize = 8 * 1024 * 1024;

/// What happened on the execution thread.
enum Execution {
    Syntax(ParseError),
    Finished {
        outcome: Result<(), Raised>,
        output: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Runner { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Reads `path` and runs it, using the path as the display name.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<RunResult, RunError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RunError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.run(&source, &path.to_string_lossy())
    }

    /// Executes `source` as the unit `display_name` and returns its trace.
    ///
    /// Failures of the unit itself come back as an `Ok` result with status
    /// `runtime_error`; `Err` is reserved for the host.
    pub fn run(&self, source: &str, display_name: &str) -> Result<RunResult, RunError> {
        if display_name.is_empty() {
            return Err(RunError::EmptyDisplayName);
        }

        let mut recorder = TraceRecorder::new(
            display_name,
            ValueRenderer::new(self.config.max_repr_len),
        );
        let stack_size = MIN_STACK.max(self.config.max_recursion_depth.saturating_mul(STACK_PER_FRAME));

        let execution = thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name("codeflow-run".into())
                .stack_size(stack_size)
                .spawn_scoped(scope, || self.execute(source, display_name, &mut recorder))
                .map_err(RunError::Spawn)?;
            match handle.join() {
                Ok(execution) => Ok(execution),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })?;

        let result = match execution {
            Execution::Syntax(error) => {
                let description = format_syntax_error(&error, display_name);
                warn!(file = display_name, error = %description, "unit failed to parse");
                RunResult::runtime_error(RecordedTrace::default(), description, Vec::new())
            }
            Execution::Finished {
                outcome: Ok(()),
                output,
            } => RunResult::ok(recorder.finish(), output),
            Execution::Finished {
                outcome: Err(raised),
                output,
            } => {
                let description =
                    format_traceback(&raised, display_name, source, self.config.traceback_limit);
                warn!(file = display_name, error = %raised, "unit raised");
                RunResult::runtime_error(recorder.finish(), description, output)
            }
        };

        let summary = result.summary();
        info!(
            file = display_name,
            status = ?result.status(),
            events = result.events().len(),
            nodes = summary.nodes,
            edges = summary.edges,
            "run finished"
        );
        Ok(result)
    }

    fn execute(&self, source: &str, display_name: &str, recorder: &mut TraceRecorder) -> Execution {
        let module = match parse(source) {
            Ok(module) => module,
            Err(error) => return Execution::Syntax(error),
        };

        let mut interpreter = Interpreter::new(InterpreterConfig {
            max_recursion_depth: self.config.max_recursion_depth,
        });
        let mut globals = Environment::for_unit(display_name);

        let outcome = {
            let mut hooks = HookSlot::new();
            let mut guard = hooks.install(recorder);
            debug!(file = display_name, "trace hook installed");
            interpreter.execute(&module, display_name, &mut globals, &mut guard)
        };
        debug!(file = display_name, "trace hook released");

        Execution::Finished {
            outcome,
            output: interpreter.take_output(),
        }
    }
}
