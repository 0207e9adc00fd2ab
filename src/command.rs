use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::pipe::Pipe;

/// First argument that ends pipeline processing and the session.
pub const QUIT_TOKEN: &str = "quit";

/// One pipeline stage.
#[derive(Debug)]
pub struct Command {
    /// Raw bytes as typed; they reach `execvp` unchanged.
    pub arguments: Vec<OsString>,
    pub reads_from_pipe: bool,
    pub writes_to_pipe: bool,
    // allocated by the executor, only for stages that write to a pipe
    pipe: Option<Pipe>,
}

impl Command {
    pub fn new(arguments: Vec<OsString>, reads_from_pipe: bool, writes_to_pipe: bool) -> Self {
        Command { arguments, reads_from_pipe, writes_to_pipe, pipe: None }
    }

    pub fn program(&self) -> &OsStr {
        self.arguments.first().map(OsString::as_os_str).unwrap_or_default()
    }

    pub fn is_quit(&self) -> bool {
        self.program().as_bytes() == QUIT_TOKEN.as_bytes()
    }

    pub fn pipe(&self) -> Option<&Pipe> {
        self.pipe.as_ref()
    }

    pub fn attach_pipe(&mut self, pipe: Pipe) {
        self.pipe = Some(pipe);
    }

    /// Closes both ends of this stage's pipe, if it has one.
    pub fn close_pipe(&mut self) {
        if let Some(mut pipe) = self.pipe.take() {
            pipe.close();
        }
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.arguments == other.arguments
            && self.reads_from_pipe == other.reads_from_pipe
            && self.writes_to_pipe == other.writes_to_pipe
    }
}

/// Commands of one input line, in execution order.
#[derive(Debug, Default, PartialEq)]
pub struct Pipeline {
    commands: Vec<Command>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl IntoIterator for Pipeline {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl FromIterator<Command> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Pipeline { commands: iter.into_iter().collect() }
    }
}
