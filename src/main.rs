use std::io;

use anyhow::Context;
use dotenvy::dotenv;
use gradebookd::{config::Config, ipc};
use tracing::metadata::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::from_env().context("reading gradebookd settings")?;

    // stdout carries responses; logs go to stderr.
    let fmt = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false);
    tracing_subscriber::registry()
        .with(fmt)
        .with(LevelFilter::from_level(config.log_level))
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        max_sessions = config.max_sessions,
        "gradebookd ready"
    );

    let mut state = ipc::AppState::new(config);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let answered = ipc::serve(stdin.lock(), &mut stdout.lock(), &mut state)
        .context("serving requests on stdin/stdout")?;

    tracing::info!(
        answered,
        open_sessions = state.sessions.len(),
        "stdin closed, exiting"
    );
    Ok(())
}
