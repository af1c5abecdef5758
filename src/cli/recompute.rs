//! `bolcd recompute` — binarize -> pair statistics -> significance/FDR ->
//! transitive reduction, per segment, unioned into one canonical graph.

use crate::binarizer::binarize;
use crate::cancellation::CancellationToken;
use crate::config::{SegmentConfig, Thresholds};
use crate::error::{BolcdError, Result};
use crate::graph::{EdgeRecord, Graph};
use crate::pairstats::compute_all_pairs;
use crate::reduction::{transitive_reduce, Edge};
use crate::segmentation::{bucket_events, label_to_string};
use crate::significance::{accepts, test_pairs};
use crate::types::Event;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Args)]
pub struct RecomputeArgs {
    /// Path to a JSON array of events.
    #[arg(long)]
    pub events: PathBuf,

    /// Path to the per-metric threshold/margin JSON file.
    #[arg(long)]
    pub thresholds: PathBuf,

    /// Shared margin delta for binarization.
    #[arg(long)]
    pub margin_delta: f64,

    /// Benjamini-Hochberg target FDR `q`.
    #[arg(long)]
    pub fdr_q: f64,

    /// Rule-of-Three acceptance ceiling for exact (`k=0`) pairs.
    #[arg(long)]
    pub epsilon: f64,

    /// Path to the segmentation key/allowlist JSON file.
    #[arg(long)]
    pub segments: PathBuf,

    /// Where to write the canonical graph JSON.
    #[arg(long)]
    pub out_json: PathBuf,

    /// Optional GraphML export path.
    #[arg(long)]
    pub out_graphml: Option<PathBuf>,
}

#[instrument(skip(args), fields(events = %args.events.display()))]
pub async fn run(args: RecomputeArgs) -> Result<()> {
    let events = load_events(&args.events)?;
    let thresholds = Thresholds::load_json(&args.thresholds)?;
    let segments = SegmentConfig::load_json(&args.segments)?;

    info!(n_events = events.len(), n_metrics = thresholds.thresholds.len(), "loaded recompute inputs");

    // Fresh per invocation: the CLI runs one batch to completion, but the
    // same pipeline is reachable from a long-running host that holds onto
    // a token across calls and cancels it from another task.
    let token = CancellationToken::new();

    let buckets = bucket_events(&events, &segments);
    let mut all_edges: Vec<EdgeRecord> = Vec::new();
    let mut all_edges_pre_tr: Vec<EdgeRecord> = Vec::new();
    let mut cycle_break_count = 0usize;

    for (label, segment_events) in &buckets {
        let segment_name = label_to_string(label);
        let owned: Vec<Event> = segment_events.iter().map(|e| (*e).clone()).collect();

        let bits = binarize(&owned, &thresholds.thresholds, args.margin_delta)?;
        token.checkpoint()?; // after binarization

        let pairs = compute_all_pairs(&bits);
        token.checkpoint()?; // after pair stats

        let tested = test_pairs(&pairs, args.epsilon);
        token.checkpoint()?; // after FDR

        let accepted: Vec<Edge> = tested
            .iter()
            .filter(|t| accepts(t, args.epsilon, args.fdr_q))
            .map(Edge::from)
            .collect();
        all_edges_pre_tr.extend(accepted.iter().map(|e| EdgeRecord::from_edge(e, segment_name.clone())));

        let reduced = transitive_reduce(accepted);
        token.checkpoint()?; // after transitive reduction
        cycle_break_count += reduced.cycle_breaks.len();

        info!(
            segment = %segment_name,
            n_events = segment_events.len(),
            n_accepted_pre_tr = all_edges_pre_tr.len(),
            n_reduced = reduced.reduced.len(),
            "segment learning complete"
        );

        all_edges.extend(
            reduced
                .reduced
                .iter()
                .map(|e| EdgeRecord::from_edge(e, segment_name.clone())),
        );
    }

    let graph = Graph::new(all_edges, all_edges_pre_tr);
    graph.save_json(&args.out_json)?;
    if let Some(graphml_path) = &args.out_graphml {
        if let Some(parent) = graphml_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(graphml_path, graph.to_graphml())?;
    }

    println!(
        "{} {} nodes, {} edges ({} cycle-breaks) across {} segment(s) -> {}",
        "recompute:".green().bold(),
        graph.nodes.len(),
        graph.edges.len(),
        cycle_break_count,
        buckets.len(),
        args.out_json.display()
    );

    Ok(())
}

fn load_events(path: &std::path::Path) -> Result<Vec<Event>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| BolcdError::resource(format!("reading events {path:?}: {e}")))?;
    serde_json::from_str(&text).map_err(BolcdError::from)
}
