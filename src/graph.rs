//! C6: Graph store & export — canonical in-memory DAG per segment, JSON
//! and GraphML serialization, and the atomic snapshot publish/read path
//! the decision engine relies on (spec §5: graph replacement is an
//! atomic pointer swap; old snapshots live until the last borrow ends).

use crate::error::{BolcdError, Result};
use crate::reduction::Edge;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// One accepted edge as stored/exported, matching the wire schema in
/// spec §6: `{"src","dst","n_src1","k_counterex","ci95_upper","q_value","segment"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src: String,
    pub dst: String,
    pub n_src1: u64,
    pub k_counterex: u64,
    pub ci95_upper: Option<f64>,
    pub q_value: Option<f64>,
    pub segment: String,
    pub lift: f64,
}

impl EdgeRecord {
    pub fn from_edge(e: &Edge, segment: impl Into<String>) -> Self {
        EdgeRecord {
            src: e.src.clone(),
            dst: e.dst.clone(),
            n_src1: e.n_src1,
            k_counterex: e.k_counterex,
            ci95_upper: e.ci95_upper,
            q_value: e.q_value,
            segment: segment.into(),
            lift: e.lift,
        }
    }
}

/// The canonical graph object: ordered node set, post-reduction edges,
/// and the pre-reduction edges (kept for rule derivation's triangle
/// check, spec §4.11).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: BTreeSet<String>,
    pub edges: Vec<EdgeRecord>,
    pub edges_pre_tr: Vec<EdgeRecord>,
}

impl Graph {
    pub fn new(edges: Vec<EdgeRecord>, edges_pre_tr: Vec<EdgeRecord>) -> Self {
        let mut nodes = BTreeSet::new();
        for e in edges.iter().chain(edges_pre_tr.iter()) {
            nodes.insert(e.src.clone());
            nodes.insert(e.dst.clone());
        }
        Graph {
            nodes,
            edges,
            edges_pre_tr,
        }
    }

    /// Edges whose destination is `rule_id`, restricted to `segment` (used
    /// by the decision engine's root-pass check, spec §4.7 step 2).
    pub fn incoming(&self, rule_id: &str, segment: &str) -> Vec<&EdgeRecord> {
        self.edges
            .iter()
            .filter(|e| e.dst == rule_id && e.segment == segment)
            .collect()
    }

    /// Looks up the accepted edge `src -> dst` within `segment`, if any.
    pub fn find_edge(&self, src: &str, dst: &str, segment: &str) -> Option<&EdgeRecord> {
        self.edges
            .iter()
            .find(|e| e.src == src && e.dst == dst && e.segment == segment)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(BolcdError::from)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(BolcdError::from)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BolcdError::resource(format!("reading graph {path:?}: {e}")))?;
        Self::from_json(&text)
    }

    /// GraphML export: one `<graph edgedefault="directed">` element, four
    /// edge attribute keys (spec §4.6).
    pub fn to_graphml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
        out.push_str("  <key id=\"n_src1\" for=\"edge\" attr.name=\"n_src1\" attr.type=\"int\"/>\n");
        out.push_str("  <key id=\"k_counterex\" for=\"edge\" attr.name=\"k_counterex\" attr.type=\"int\"/>\n");
        out.push_str("  <key id=\"ci95_upper\" for=\"edge\" attr.name=\"ci95_upper\" attr.type=\"double\"/>\n");
        out.push_str("  <key id=\"q_value\" for=\"edge\" attr.name=\"q_value\" attr.type=\"double\"/>\n");
        out.push_str("  <graph edgedefault=\"directed\">\n");
        for node in &self.nodes {
            out.push_str(&format!("    <node id=\"{}\"/>\n", xml_escape(node)));
        }
        for (i, e) in self.edges.iter().enumerate() {
            out.push_str(&format!(
                "    <edge id=\"e{i}\" source=\"{}\" target=\"{}\">\n",
                xml_escape(&e.src),
                xml_escape(&e.dst)
            ));
            out.push_str(&format!("      <data key=\"n_src1\">{}</data>\n", e.n_src1));
            out.push_str(&format!(
                "      <data key=\"k_counterex\">{}</data>\n",
                e.k_counterex
            ));
            if let Some(ci) = e.ci95_upper {
                out.push_str(&format!("      <data key=\"ci95_upper\">{ci}</data>\n"));
            }
            if let Some(q) = e.q_value {
                out.push_str(&format!("      <data key=\"q_value\">{q}</data>\n"));
            }
            out.push_str("    </edge>\n");
        }
        out.push_str("  </graph>\n");
        out.push_str("</graphml>\n");
        out
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Atomically swappable current-graph snapshot. `ArcSwap::load()` hands
/// out an `Arc<Graph>` guard that keeps the old snapshot alive for the
/// lifetime of any outstanding borrow, even across a subsequent `store`.
#[derive(Default)]
pub struct GraphSnapshot {
    inner: ArcSwap<Graph>,
}

impl GraphSnapshot {
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(graph)),
        }
    }

    pub fn load(&self) -> Arc<Graph> {
        self.inner.load_full()
    }

    pub fn publish(&self, graph: Graph) {
        self.inner.store(Arc::new(graph));
    }
}
