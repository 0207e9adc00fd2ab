use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::error::ExecError;
use crate::executor::{Executor, ExhaustionPolicy};
use crate::parser::{parse, ParseOptions};
use crate::spawn::{ForkSpawner, Spawner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    EndOfInput,
}

/// Prompt, read a line, run it; until `quit` or end of input.
///
/// The prompt goes to `output`; children write straight to the process's
/// own stdout, so `output` is flushed before anything is spawned.
pub struct Shell<R, W, S = ForkSpawner> {
    input: R,
    output: W,
    prompt: String,
    parse: ParseOptions,
    executor: Executor<S>,
}

impl<R: BufRead, W: Write> Shell<R, W, ForkSpawner> {
    pub fn new(input: R, output: W, config: &Config) -> Self {
        Shell::with_spawner(input, output, config, ForkSpawner)
    }
}

impl<R: BufRead, W: Write, S: Spawner> Shell<R, W, S> {
    pub fn with_spawner(input: R, output: W, config: &Config, spawner: S) -> Self {
        Shell {
            input,
            output,
            prompt: config.prompt.clone(),
            parse: config.parse,
            executor: Executor::new(spawner, config.exhaustion),
        }
    }

    pub fn run(&mut self) -> Result<SessionEnd> {
        loop {
            self.display_prompt()?;
            let Some(line) = self.read_line()? else {
                return Ok(SessionEnd::EndOfInput);
            };
            match self.run_line(&line) {
                Ok(true) => return Ok(SessionEnd::Quit),
                Ok(false) => {}
                Err(e) if e.is_resource_exhaustion() && self.executor.policy() == ExhaustionPolicy::Recover => {
                    eprintln!("tsh: {e}")
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn display_prompt(&mut self) -> io::Result<()> {
        self.output.write_all(self.prompt.as_bytes())?;
        self.output.flush()
    }

    /// One raw line, terminator included, or `None` at end of input. A last
    /// line that has no terminator is still returned.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf))
    }

    /// Parses and executes one line. `Ok(true)` means the quit sentinel was
    /// reached. A line that does not parse is reported and skipped.
    pub fn run_line(&mut self, line: &[u8]) -> Result<bool, ExecError> {
        let pipeline = match parse(line, &self.parse) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("tsh: {e}");
                return Ok(false);
            }
        };
        debug!(stages = pipeline.len(), "parsed line");
        // anything buffered must reach the terminal before the children do
        if let Err(e) = self.output.flush() {
            debug!(error = %e, "flushing output failed");
        }
        let outcome = self.executor.execute(pipeline)?;
        Ok(outcome.quit)
    }
}
