//! C5: Segmentation — partitions the event stream by a configured
//! key-tuple, with allow-list folding of out-of-list values to `_other`.

use crate::config::SegmentConfig;
use crate::reduction::Edge;
use crate::types::Event;
use std::collections::BTreeMap;

/// The label attached to an event bucket: the ordered values of the
/// configured segment keys, each independently folded to `_other` if an
/// allow-list is configured for that key and the value isn't in it.
pub type SegmentLabel = Vec<String>;

/// Renders a segment label as a single string, e.g. `"prod/us-east"`.
pub fn label_to_string(label: &SegmentLabel) -> String {
    if label.is_empty() {
        "_all".to_string()
    } else {
        label.join("/")
    }
}

/// Buckets events by the configured key-tuple. A missing key value is
/// folded to `_other` the same as an out-of-allowlist one.
pub fn bucket_events<'a>(
    events: &'a [Event],
    config: &SegmentConfig,
) -> BTreeMap<SegmentLabel, Vec<&'a Event>> {
    let mut buckets: BTreeMap<SegmentLabel, Vec<&Event>> = BTreeMap::new();
    for event in events {
        let label = segment_label(event, config);
        buckets.entry(label).or_default().push(event);
    }
    buckets
}

fn segment_label(event: &Event, config: &SegmentConfig) -> SegmentLabel {
    config
        .keys
        .iter()
        .map(|key| {
            let raw = event
                .values
                .get(key)
                .map(|v| format_key_value(*v))
                .unwrap_or_else(|| "_other".to_string());
            match config.allowlist.get(key) {
                Some(allowed) if !allowed.contains(&raw) => "_other".to_string(),
                _ => raw,
            }
        })
        .collect()
}

/// Segment keys carry numeric event values (the event model is uniformly
/// `BTreeMap<String, f64>`); render deterministically for bucketing and
/// allow-list comparison.
fn format_key_value(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// A per-segment learned edge set, carrying its label for union-graph
/// filtering.
#[derive(Debug, Clone)]
pub struct SegmentEdges {
    pub label: SegmentLabel,
    pub edges: Vec<Edge>,
}

/// Builds the union graph across segments: the multiset union of edges,
/// with each edge's segment label preserved.
pub fn union_edges(segments: &[SegmentEdges]) -> Vec<(SegmentLabel, Edge)> {
    segments
        .iter()
        .flat_map(|s| s.edges.iter().map(move |e| (s.label.clone(), e.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn buckets_by_key_tuple_with_allowlist_folding() {
        let config = SegmentConfig {
            keys: vec!["region".to_string()],
            allowlist: {
                let mut m = HashMap::new();
                m.insert("region".to_string(), vec!["1".to_string(), "2".to_string()]);
                m
            },
        };
        let events = vec![
            Event::new().with("region", 1.0),
            Event::new().with("region", 2.0),
            Event::new().with("region", 99.0),
            Event::new(),
        ];
        let buckets = bucket_events(&events, &config);
        assert_eq!(buckets.get(&vec!["1".to_string()]).unwrap().len(), 1);
        assert_eq!(buckets.get(&vec!["2".to_string()]).unwrap().len(), 1);
        assert_eq!(buckets.get(&vec!["_other".to_string()]).unwrap().len(), 2);
    }

    #[test]
    fn no_keys_yields_single_bucket() {
        let config = SegmentConfig::default();
        let events = vec![Event::new(), Event::new()];
        let buckets = bucket_events(&events, &config);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets.get(&Vec::<String>::new()).unwrap().len(), 2);
    }

    #[test]
    fn union_graph_preserves_segment_label() {
        let e = Edge {
            src: "A".into(),
            dst: "B".into(),
            n_src1: 10,
            k_counterex: 0,
            ci95_upper: Some(0.3),
            q_value: None,
            lift: 2.0,
        };
        let segments = vec![SegmentEdges {
            label: vec!["prod".to_string()],
            edges: vec![e.clone()],
        }];
        let union = union_edges(&segments);
        assert_eq!(union.len(), 1);
        assert_eq!(union[0].0, vec!["prod".to_string()]);
        assert_eq!(union[0].1, e);
    }
}
