//! # BOL-CD - Event-Implication Graph & Alert Condensation Engine
//!
//! Learns a statistically-controlled causal-correlation graph over
//! boolean event metrics and uses it to condense a high-volume alert
//! stream: a learned A->B implication suppresses near-window repeats of
//! B, and suppressed alerts that later look dangerous are late-replayed.
//!
//! ## Pillars
//!
//! - Binarization + pairwise implication testing + BH FDR + transitive
//!   reduction: the graph-learning engine ([`binarizer`], [`pairstats`],
//!   [`significance`], [`reduction`], [`segmentation`], [`graph`]).
//! - Per-alert suppress/deliver decisions with safety guards
//!   ([`decision`], [`validator`]).
//! - Periodic late-replay reconciliation over quarantined suppressions
//!   ([`quarantine`]).
//! - A hash-chained, tamper-evident audit log ([`audit`]) and connector-
//!   neutral rule derivation ([`rules`]) on top of a SQLite-backed store
//!   ([`store`]).
//! - Class-based retention sweeps ([`retention`]) over the data directory.
//! - Cooperative cancellation ([`cancellation`]), collaborator traits a
//!   caller wires in ([`collab`]), and the `bolcd`/`bolcd-reconciler`
//!   binaries' CLI surface ([`cli`]).

pub mod audit;
pub mod binarizer;
pub mod cancellation;
pub mod cli;
pub mod clock;
pub mod collab;
pub mod config;
pub mod decision;
pub mod error;
pub mod graph;
pub mod pairstats;
pub mod quarantine;
pub mod reduction;
pub mod retention;
pub mod rules;
pub mod segmentation;
pub mod significance;
pub mod store;
pub mod types;
pub mod validator;

pub use error::{BolcdError, Result};

/// Re-export of the crate's most commonly used types, mirroring the
/// teacher's prelude convention.
pub mod prelude {
    pub use crate::binarizer::{binarize, Bitset, MetricBits};
    pub use crate::cancellation::CancellationToken;
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::collab::{AlertSink, EventSource, NeutralConnector, SIEMConnector, WritebackStatus};
    pub use crate::config::{Config, DecisionPolicy, SegmentConfig, Thresholds};
    pub use crate::decision::decide;
    pub use crate::error::{BolcdError, Result};
    pub use crate::graph::{EdgeRecord, Graph, GraphSnapshot};
    pub use crate::pairstats::{compute_all_pairs, PairStat};
    pub use crate::reduction::{transitive_reduce, Edge};
    pub use crate::rules::{derive_rules, SuppressionRule};
    pub use crate::significance::{test_pairs, TestedPair};
    pub use crate::types::{
        Alert, Decision, DecisionRecord, Event, LateReplay, Severity, Suppression,
        SuppressionStatus, ValidationLog,
    };
}
