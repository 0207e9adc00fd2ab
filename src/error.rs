use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("too many arguments for `{program}` (limit {limit})")]
    ArgumentOverflow { program: String, limit: usize },
}

/// Failures of the parent side of execution. `Pipe` and `Fork` are resource
/// exhaustion; what happens next is decided by the exhaustion policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("pipe failed: {}", .0.desc())]
    Pipe(Errno),
    #[error("fork failed: {}", .0.desc())]
    Fork(Errno),
    #[error("wait failed: {}", .0.desc())]
    Wait(Errno),
}

impl ExecError {
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, ExecError::Pipe(_) | ExecError::Fork(_))
    }
}

/// A stage that could not be started. Recoverable: the rest of the pipeline runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("command not found: {0}")]
    NotFound(String),
    #[error("exec failed: argument of `{0}` contains a nul byte")]
    Nul(String),
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}
