//! `todo` - command-line front end for the todo sync core.
//!
//! Each invocation loads the list from the backend, applies one intent, and
//! prints the result. Without `SUPABASE_URL`/`SUPABASE_ANON_KEY` it runs in
//! local-only mode and nothing outlives the process.

mod cli;
mod render;
mod transport;

use std::process::ExitCode;

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use todo_core::{Reconciler, SyncMode, TodoId, Transport};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::transport::ReqwestTransport;

/// Priority: `--log-level`, then `RUST_LOG`, then WARN. Logs go to stderr so
/// they never mix with the rendered list.
fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let filter = match cli_log_level {
        Some(level) => EnvFilter::try_new(level.to_lowercase()).wrap_err_with(|| format!("invalid log level '{level}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| eyre!("failed to initialize logging: {e}"))
}

async fn apply<T: Transport>(reconciler: &mut Reconciler<T>, command: Command) {
    debug!(?command, "apply: dispatching");
    let outcome = match command {
        Command::List => None,
        Command::Add { text } => reconciler.add(&text.join(" ")).await,
        Command::Toggle { id } => reconciler.toggle(&TodoId::from(id.as_str())).await,
        Command::Edit { id, text } => reconciler.edit(&TodoId::from(id.as_str()), &text.join(" ")).await,
        Command::Rm { id } => reconciler.remove(&TodoId::from(id.as_str())).await,
    };
    debug!(?outcome, "apply: done");
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref())?;

    let mode = SyncMode::from_env();
    if !mode.is_configured() {
        warn!("remote sync not configured; running local-only, changes are not persisted");
    }

    let transport = ReqwestTransport::new().wrap_err("failed to build HTTP client")?;
    let mut reconciler = Reconciler::new(&mode, transport);
    reconciler.refresh().await;
    apply(&mut reconciler, cli.command.unwrap_or(Command::List)).await;

    print!("{}", render::render(reconciler.state(), cli.filter));
    if reconciler.state().error().is_some() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
