//! Persisted-state layout (spec §6): graphs as JSON files under
//! `graphs/<segment>.json`, reports as Markdown/JSON files under
//! `reports/`, and decisions/suppressions/late-replays/audit entries in
//! SQLite (§6.2's storage-shape decision, recorded in `DESIGN.md`).

pub mod sqlite;

use crate::error::Result;
use crate::graph::Graph;
use crate::segmentation::{label_to_string, SegmentLabel};
use std::path::{Path, PathBuf};

/// Root of the persisted-state directory tree.
#[derive(Debug, Clone)]
pub struct DataDir {
    pub root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn graphs_dir(&self) -> PathBuf {
        self.root.join("graphs")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn graph_path(&self, segment: &SegmentLabel) -> PathBuf {
        self.graphs_dir()
            .join(format!("{}.json", label_to_string(segment)))
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.root.join("bolcd.db")
    }

    pub fn save_graph(&self, segment: &SegmentLabel, graph: &Graph) -> Result<()> {
        graph.save_json(&self.graph_path(segment))
    }

    pub fn load_graph(&self, segment: &SegmentLabel) -> Result<Graph> {
        Graph::load_json(&self.graph_path(segment))
    }

    pub fn save_report(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.reports_dir().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}

pub fn ensure_layout(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root.join("graphs"))?;
    std::fs::create_dir_all(root.join("reports"))?;
    std::fs::create_dir_all(root.join("suppressed"))?;
    std::fs::create_dir_all(root.join("decisions"))?;
    Ok(())
}
