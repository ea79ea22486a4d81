//! Neighbor index rebuilt from the edge set
//!
//! Neighbor lists are sorted so every traversal that walks them visits
//! settlements in the same order on every run.

use std::collections::BTreeMap;

use crate::core::ids::{EdgeId, SettlementId};
use crate::map::graph::EdgeRecord;

/// Sorted neighbor lists keyed by settlement id.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    neighbors: BTreeMap<SettlementId, Vec<SettlementId>>,
}

impl AdjacencyIndex {
    pub fn build(edges: &BTreeMap<EdgeId, EdgeRecord>) -> Self {
        let mut neighbors: BTreeMap<SettlementId, Vec<SettlementId>> = BTreeMap::new();
        for edge in edges.values() {
            neighbors
                .entry(edge.a.clone())
                .or_default()
                .push(edge.b.clone());
            neighbors
                .entry(edge.b.clone())
                .or_default()
                .push(edge.a.clone());
        }
        for list in neighbors.values_mut() {
            list.sort();
            list.dedup();
        }
        Self { neighbors }
    }

    /// Neighbors of a settlement in sorted order; empty when unknown.
    pub fn neighbors(&self, sid: &str) -> &[SettlementId] {
        self.neighbors.get(sid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::edge_id_for;

    fn edge_map(pairs: &[(&str, &str)]) -> BTreeMap<EdgeId, EdgeRecord> {
        pairs
            .iter()
            .map(|(a, b)| {
                (
                    edge_id_for(a, b),
                    EdgeRecord {
                        a: a.to_string(),
                        b: b.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_neighbors_are_sorted() {
        let index = AdjacencyIndex::build(&edge_map(&[("m", "z"), ("a", "m"), ("k", "m")]));
        assert_eq!(index.neighbors("m"), ["a", "k", "z"]);
    }

    #[test]
    fn test_unknown_settlement_has_no_neighbors() {
        let index = AdjacencyIndex::build(&edge_map(&[("a", "b")]));
        assert!(index.neighbors("ghost").is_empty());
    }

    #[test]
    fn test_edges_are_bidirectional() {
        let index = AdjacencyIndex::build(&edge_map(&[("a", "b")]));
        assert_eq!(index.neighbors("a"), ["b"]);
        assert_eq!(index.neighbors("b"), ["a"]);
    }
}
