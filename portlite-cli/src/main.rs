//! Entry point for `portlite-expose`.

mod args;
mod cli;
mod config;
mod report;
mod signal;

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use portlite::{LogReporter, PortExposer, Reporter};
use report::InteractiveReporter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_from(args::normalize(std::env::args_os()));
    init_logging(cli.debug);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = anyhow::Error::new(e).context("failed to start runtime");
            report::failure(cli.interactive, &err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report::failure(cli.interactive, &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let file = config::load(cli.config.as_deref())?;
    let options = config::resolve(cli, &file)?;

    let shutdown = signal::install().context("failed to install signal handlers")?;

    let reporter: &dyn Reporter = if cli.interactive {
        &InteractiveReporter
    } else {
        &LogReporter
    };

    let mut exposer = PortExposer::new(options);
    exposer.run(reporter, shutdown).await?;

    tracing::info!("Forward released, exiting");
    Ok(())
}

/// Logs go to stderr so stdout stays free for the interactive `OK`.
///
/// `RUST_LOG` is honoured unless `--debug` is given.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if let Err(e) = tracing_subscriber::fmt()
        .with_target(debug)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(filter)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }
}
