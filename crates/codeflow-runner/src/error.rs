use std::io;
use std::path::PathBuf;

/// Failures of the host around a run.
///
/// Anything that goes wrong inside the traced unit, syntax errors included,
/// is reported through a `runtime_error` [`codeflow_core::RunResult`]
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("display name must not be empty")]
    EmptyDisplayName,

    #[error("cannot start the execution thread: {0}")]
    Spawn(#[source] io::Error),
}
