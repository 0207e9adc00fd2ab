use nix::sys::wait::WaitStatus;
use tracing::{debug, warn};

use crate::command::{Command, Pipeline};
use crate::error::{ExecError, SpawnError};
use crate::pipe::Pipe;
use crate::spawn::{ForkSpawner, ProcessHandle, Spawner};

/// What to do when a pipe or a process cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Return the error right away; the shell reports it and terminates.
    #[default]
    Fatal,
    /// Close open pipes and reap the children already started before
    /// returning the error; the shell reports it and keeps prompting.
    Recover,
}

#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    pub quit: bool,
    pub spawned: usize,
    /// Wait statuses in spawn order, for every child reaped.
    pub statuses: Vec<WaitStatus>,
}

pub struct Executor<S = ForkSpawner> {
    spawner: S,
    policy: ExhaustionPolicy,
}

impl Executor<ForkSpawner> {
    pub fn with_policy(policy: ExhaustionPolicy) -> Self {
        Executor::new(ForkSpawner, policy)
    }
}

impl<S: Spawner> Executor<S> {
    pub fn new(spawner: S, policy: ExhaustionPolicy) -> Self {
        Executor { spawner, policy }
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn policy(&self) -> ExhaustionPolicy {
        self.policy
    }

    /// Runs every stage of `pipeline` in order.
    ///
    /// A stage that does not write to a pipe blocks until all children
    /// started so far have exited. A `quit` stage closes the previous pipe
    /// and stops without waiting for anything still running.
    pub fn execute(&mut self, pipeline: Pipeline) -> Result<Outcome, ExecError> {
        let mut outcome = Outcome::default();
        let mut pending: Vec<ProcessHandle> = Vec::new();
        let mut prev: Option<Command> = None;

        for mut command in pipeline {
            if command.is_quit() {
                debug!(spawned = outcome.spawned, "quit sentinel reached");
                outcome.quit = true;
                if let Some(p) = prev.as_mut() {
                    p.close_pipe();
                }
                return Ok(outcome);
            }
            if let Err(e) = self.run_stage(&mut command, prev.as_mut(), &mut pending, &mut outcome) {
                // release every descriptor before reaping, so no writer blocks forever
                drop(command);
                drop(prev);
                return Err(self.abort(e, &mut pending, &mut outcome));
            }
            prev = Some(command);
        }

        // only a dangling `|` at the end of the line leaves anything pending
        drop(prev);
        self.reap_pending(&mut pending, &mut outcome)?;
        Ok(outcome)
    }

    fn run_stage(
        &mut self,
        command: &mut Command,
        mut prev: Option<&mut Command>,
        pending: &mut Vec<ProcessHandle>,
        outcome: &mut Outcome,
    ) -> Result<(), ExecError> {
        if command.writes_to_pipe {
            command.attach_pipe(self.spawner.open_pipe()?);
        }

        let stdin = if command.reads_from_pipe {
            prev.as_deref().and_then(Command::pipe).and_then(Pipe::read_end)
        } else {
            None
        };
        let stdout = command.pipe().and_then(Pipe::write_end);
        match self.spawner.spawn_stage(command, stdin, stdout) {
            Ok(handle) => {
                pending.push(handle);
                outcome.spawned += 1;
            }
            Err(SpawnError::Launch(e)) => {
                eprintln!("tsh: {e}");
                debug!(program = %command.program().to_string_lossy(), "stage not started");
            }
            Err(SpawnError::Exec(e)) => return Err(e),
        }

        if command.reads_from_pipe {
            if let Some(p) = prev.as_deref_mut() {
                p.close_pipe();
            }
        }
        if !command.writes_to_pipe {
            self.reap_pending(pending, outcome)?;
        }
        Ok(())
    }

    fn reap_pending(&mut self, pending: &mut Vec<ProcessHandle>, outcome: &mut Outcome) -> Result<(), ExecError> {
        for handle in pending.drain(..) {
            outcome.statuses.push(self.spawner.wait(handle)?);
        }
        Ok(())
    }

    fn abort(&mut self, err: ExecError, pending: &mut Vec<ProcessHandle>, outcome: &mut Outcome) -> ExecError {
        debug!(error = %err, policy = ?self.policy, running = pending.len(), "pipeline aborted");
        if self.policy == ExhaustionPolicy::Recover {
            if let Err(e) = self.reap_pending(pending, outcome) {
                warn!(error = %e, "could not reap children of aborted pipeline");
            }
        }
        err
    }
}
