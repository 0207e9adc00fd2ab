//! tsh: a small line-oriented shell.
//!
//! A line is split on spaces, `;` and `|` into a [`Pipeline`] of
//! [`Command`]s. The [`Executor`] then runs every stage as a child process,
//! connecting `|`-joined stages with OS pipes and waiting at the end of each
//! pipe chain. The word `quit` in command position ends the session.

pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod parser;
pub mod pipe;
pub mod shell;
pub mod spawn;

pub use command::{Command, Pipeline, QUIT_TOKEN};
pub use config::Config;
pub use error::{ExecError, LaunchError, ParseError, SpawnError};
pub use executor::{Executor, ExhaustionPolicy, Outcome};
pub use parser::{parse, OverflowPolicy, ParseOptions};
pub use pipe::Pipe;
pub use shell::{SessionEnd, Shell};
pub use spawn::{ForkSpawner, ProcessHandle, Spawner};
