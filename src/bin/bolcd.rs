//! `bolcd` — the `recompute`/`writeback`/`bench` CLI entrypoint. Exit
//! codes follow spec §6: 0 on success, 1 on internal error, 2 on
//! validation failure.

use bolcd::cli::{run, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "bolcd command failed");
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
