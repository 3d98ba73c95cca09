use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;
use treelox::diagnostics::StderrSink;
use treelox::{Config, Session};

const USAGE: &str = "Usage: treelox [--no-resolver] [--max-depth N] [--allow-host] [script]";
const EXIT_USAGE: u8 = 64;

enum Mode {
    Script(String),
    Prompt,
    Help,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(Config, Mode)> {
    let mut config = Config::default();
    let mut script = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-resolver" => config.use_resolver = false,
            "--allow-host" => config.allow_host = true,
            "--max-depth" => {
                let depth = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing value after {arg}"))?;
                config.max_call_depth = depth
                    .parse()
                    .with_context(|| format!("Invalid call depth '{depth}'"))?;
            }
            "-h" | "--help" => return Ok((config, Mode::Help)),
            flag if flag.starts_with('-') => bail!("Unknown option '{flag}'"),
            _ => {
                if script.is_some() {
                    bail!("Only one script is supported");
                }
                script = Some(arg);
            }
        }
    }

    let mode = script.map_or(Mode::Prompt, Mode::Script);
    Ok((config, mode))
}

fn main() -> ExitCode {
    init_tracing();

    let (config, mode) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(error) => {
            eprintln!("{error:#}");
            eprintln!("{USAGE}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    debug!(?config, "starting");

    let result = match mode {
        Mode::Help => {
            println!("{USAGE}");
            Ok(ExitCode::SUCCESS)
        }
        Mode::Script(path) => run_file(&path, config),
        Mode::Prompt => run_prompt(config),
    };

    result.unwrap_or_else(|error| {
        eprintln!("error: {error:#}");
        ExitCode::FAILURE
    })
}

fn run_file(path: &str, config: Config) -> Result<ExitCode> {
    let source = fs::read_to_string(path).with_context(|| format!("Reading {path}"))?;
    let mut session = Session::new(config);
    match session.run(&source, &mut StderrSink) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => Ok(ExitCode::from(error.exit_code())),
    }
}

/// Each line is a separate run against the same session, so definitions
/// carry over. Errors are reported and the prompt continues.
fn run_prompt(config: Config) -> Result<ExitCode> {
    let mut session = Session::new(config);
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush().context("Flushing prompt")?;
        line.clear();
        if stdin.lock().read_line(&mut line).context("Reading stdin")? == 0 {
            println!();
            return Ok(ExitCode::SUCCESS);
        }
        if let Err(error) = session.run(&line, &mut StderrSink) {
            debug!(%error, "entry failed");
        }
    }
}

/// Installs a stderr `fmt` subscriber, but only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
