use std::env;
use std::io;
use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tsh_rs::config::USAGE;
use tsh_rs::{Config, Shell};

fn main() -> ExitCode {
    // stdout carries only the prompt and program output, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_ansi(atty::is(atty::Stream::Stderr)))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("tsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let config = Config::load(env::args().skip(1))?;
    if config.show_help {
        println!("{USAGE}");
        return Ok(ExitCode::SUCCESS);
    }
    tracing::debug!(?config, "starting");

    let stdin = io::stdin();
    let mut shell = Shell::new(stdin.lock(), io::stdout(), &config);
    if let Some(line) = config.command.as_deref() {
        shell.run_line(line.as_bytes())?;
        return Ok(ExitCode::SUCCESS);
    }
    let end = shell.run()?;
    tracing::debug!(?end, "session over");
    Ok(ExitCode::SUCCESS)
}
