//! `bolcd writeback` — dry-run (default) or apply connector-neutral
//! suppression rules against a named SIEM connector.

use crate::collab::{NeutralConnector, SIEMConnector};
use crate::error::{BolcdError, Result};
use crate::graph::Graph;
use crate::rules::{derive_rules, SuppressionRule};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ConnectorKind {
    Splunk,
    Sentinel,
    Opensearch,
}

impl ConnectorKind {
    fn label(self) -> &'static str {
        match self {
            ConnectorKind::Splunk => "splunk",
            ConnectorKind::Sentinel => "sentinel",
            ConnectorKind::Opensearch => "opensearch",
        }
    }
}

#[derive(Args)]
pub struct WritebackArgs {
    /// Target connector.
    pub connector: ConnectorKind,

    /// Pre-derived suppression rules JSON. Mutually exclusive with `--graph`.
    #[arg(long, conflicts_with = "graph")]
    pub rules: Option<PathBuf>,

    /// Canonical graph JSON to derive rules from. Mutually exclusive with `--rules`.
    #[arg(long, conflicts_with = "rules")]
    pub graph: Option<PathBuf>,

    /// Apply the writeback instead of dry-running it.
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

pub async fn run(args: WritebackArgs) -> Result<()> {
    let rules = load_rules(&args)?;
    let connector = NeutralConnector { label: args.connector.label() };

    info!(connector = connector.name(), n_rules = rules.len(), apply = args.apply, "writeback starting");
    let status = connector.writeback(&rules, args.apply).await?;

    let verb = if args.apply { "applied".green() } else { "dry-run".yellow() };
    println!(
        "{} {} {} rule(s) to {} ({} written)",
        "writeback:".bold(),
        verb,
        rules.len(),
        connector.name(),
        status.written
    );

    Ok(())
}

fn load_rules(args: &WritebackArgs) -> Result<Vec<SuppressionRule>> {
    if let Some(path) = &args.rules {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BolcdError::resource(format!("reading rules {path:?}: {e}")))?;
        return serde_json::from_str(&text).map_err(BolcdError::from);
    }
    if let Some(path) = &args.graph {
        let graph = Graph::load_json(path)?;
        return Ok(derive_rules(&graph.edges, &graph.edges_pre_tr));
    }
    Err(BolcdError::validation("writeback requires either --rules or --graph"))
}
