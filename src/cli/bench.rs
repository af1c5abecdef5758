//! `bolcd bench` — measures the learning pipeline's empirical false
//! acceptance rate and latency on synthetic null data: `d` independent
//! random metrics carry no true implication, so any edge the pipeline
//! accepts is, by construction, a false positive. Rule-of-Three/BH are
//! rated by how close the observed rate tracks `epsilon`/`fdr_q` (spec's
//! own rationale: "Rule-of-Three controls false acceptance ... BH
//! controls expected false-discovery rate").

use crate::binarizer::binarize;
use crate::error::{BolcdError, Result};
use crate::pairstats::compute_all_pairs;
use crate::significance::{accepts, test_pairs};
use crate::types::Event;
use clap::Args;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Args)]
pub struct BenchArgs {
    /// Number of independent synthetic metrics.
    #[arg(long)]
    pub d: usize,

    /// Number of synthetic events per run.
    #[arg(long)]
    pub n: usize,

    /// Number of independent runs to aggregate over.
    #[arg(long)]
    pub runs: usize,

    /// Benjamini-Hochberg target FDR `q`.
    #[arg(long)]
    pub fdr_q: f64,

    /// Rule-of-Three acceptance ceiling for exact (`k=0`) pairs.
    #[arg(long)]
    pub epsilon: f64,

    /// Margin delta for binarization.
    #[arg(long)]
    pub delta: f64,

    /// Where to write the result JSON.
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Serialize)]
struct BenchResult {
    eps_mean: f64,
    eps_p95: f64,
    latency_ms_mean: f64,
    latency_ms_p95: f64,
    runs: usize,
}

pub async fn run(args: BenchArgs) -> Result<()> {
    if args.d < 2 {
        return Err(BolcdError::validation("bench requires --d >= 2"));
    }
    if args.runs == 0 {
        return Err(BolcdError::validation("bench requires --runs >= 1"));
    }

    let mut eps: Vec<f64> = Vec::with_capacity(args.runs);
    let mut latency_ms: Vec<f64> = Vec::with_capacity(args.runs);

    for run_idx in 0..args.runs {
        let mut rng = StdRng::seed_from_u64(run_idx as u64);
        let events = synthetic_null_events(args.d, args.n, &mut rng);
        let thresholds: HashMap<String, f64> = (0..args.d).map(|i| (metric_name(i), 0.5)).collect();

        let started = Instant::now();
        let bits = binarize(&events, &thresholds, args.delta)?;
        let pairs = compute_all_pairs(&bits);
        let tested = test_pairs(&pairs, args.epsilon);
        let elapsed = started.elapsed();

        let accepted = tested.iter().filter(|t| accepts(t, args.epsilon, args.fdr_q)).count();
        let rate = if tested.is_empty() { 0.0 } else { accepted as f64 / tested.len() as f64 };
        eps.push(rate);
        latency_ms.push(elapsed.as_secs_f64() * 1000.0);

        info!(run = run_idx, n_pairs = tested.len(), n_accepted = accepted, latency_ms = latency_ms[run_idx], "bench run complete");
    }

    let result = BenchResult {
        eps_mean: mean(&eps),
        eps_p95: percentile(&eps, 0.95),
        latency_ms_mean: mean(&latency_ms),
        latency_ms_p95: percentile(&latency_ms, 0.95),
        runs: args.runs,
    };

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.out, serde_json::to_string_pretty(&result)?)?;

    println!(
        "{} eps_mean={:.4} eps_p95={:.4} latency_ms_mean={:.2} latency_ms_p95={:.2} -> {}",
        "bench:".cyan().bold(),
        result.eps_mean,
        result.eps_p95,
        result.latency_ms_mean,
        result.latency_ms_p95,
        args.out.display()
    );

    Ok(())
}

fn metric_name(i: usize) -> String {
    format!("m{i}")
}

/// `d` independent Bernoulli(0.5) metrics over `n` events: no metric
/// implies any other, so every accepted edge is a false discovery.
fn synthetic_null_events(d: usize, n: usize, rng: &mut StdRng) -> Vec<Event> {
    (0..n)
        .map(|_| {
            let mut event = Event::new();
            for i in 0..d {
                let v = if rng.gen_bool(0.5) { 1.0 } else { 0.0 };
                event = event.with(metric_name(i), v);
            }
            event
        })
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn percentile(xs: &[f64], p: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
