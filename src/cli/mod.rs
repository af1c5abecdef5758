//! CLI surface (spec §6.1): `recompute` re-learns the graph from a raw
//! event log, `writeback` dry-runs (or applies) connector rule delivery,
//! `bench` measures learning-pipeline accuracy/latency on synthetic data.

pub mod bench;
pub mod recompute;
pub mod writeback;

use crate::error::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bolcd", version, about = "Event-implication graph learning and alert condensation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-learn the graph from an event log and write it out.
    Recompute(recompute::RecomputeArgs),

    /// Dry-run or apply connector rule writeback.
    Writeback(writeback::WritebackArgs),

    /// Measure FDR accuracy and latency on synthetic data.
    Bench(bench::BenchArgs),
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Recompute(args) => recompute::run(args).await,
        Commands::Writeback(args) => writeback::run(args).await,
        Commands::Bench(args) => bench::run(args).await,
    }
}
