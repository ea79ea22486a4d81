//! Posture orders declared by factions on front edges

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::config::config;
use crate::core::ids::{EdgeId, FactionId};
use crate::map::graph::EdgeRecord;

/// Stance a faction declares on a front edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    /// Defensive stance, generates no intent
    #[default]
    Hold,
    /// Reconnaissance in force
    Probe,
    /// Deliberate offensive
    Push,
}

impl Posture {
    /// Intent multiplier applied to the assignment weight.
    pub fn multiplier(&self) -> u64 {
        let cfg = config();
        match self {
            Posture::Hold => cfg.hold_multiplier,
            Posture::Probe => cfg.probe_multiplier,
            Posture::Push => cfg.push_multiplier,
        }
    }
}

/// One faction's declared stance and weight on one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureEntry {
    pub posture: Posture,
    pub weight: u32,
}

/// All posture assignments of one faction, keyed by edge id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionPosture {
    pub assignments: BTreeMap<EdgeId, PostureEntry>,
}

/// Counts from posture normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostureNormalizeReport {
    pub weights_clamped: u32,
    pub entries_dropped: u32,
}

/// Clamps assignment weights into the allowed band and drops entries on
/// edges missing from the graph.
///
/// Assignments on real edges that are merely quiet this turn survive, so
/// a faction's standing orders persist while a front moves around.
pub fn normalize_front_postures(
    postures: &mut BTreeMap<FactionId, FactionPosture>,
    edges: &BTreeMap<EdgeId, EdgeRecord>,
) -> PostureNormalizeReport {
    let max_weight = config().max_posture_weight;
    let mut report = PostureNormalizeReport::default();

    for (faction, posture) in postures.iter_mut() {
        let mut dropped: Vec<EdgeId> = Vec::new();
        for (edge_id, entry) in posture.assignments.iter_mut() {
            if !edges.contains_key(edge_id) {
                dropped.push(edge_id.clone());
                continue;
            }
            if entry.weight > max_weight {
                entry.weight = max_weight;
                report.weights_clamped += 1;
            }
        }
        for edge_id in dropped {
            debug!(%faction, %edge_id, "dropping posture assignment on unknown edge");
            posture.assignments.remove(&edge_id);
            report.entries_dropped += 1;
        }
    }

    report
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
    fn test_overweight_assignments_clamped() {
        let edges = edge_map(&[("a", "b")]);
        let mut postures = BTreeMap::new();
        postures.insert(
            "red".to_string(),
            FactionPosture {
                assignments: BTreeMap::from([(
                    "a__b".to_string(),
                    PostureEntry {
                        posture: Posture::Push,
                        weight: 99,
                    },
                )]),
            },
        );

        let report = normalize_front_postures(&mut postures, &edges);
        assert_eq!(report.weights_clamped, 1);
        assert_eq!(postures["red"].assignments["a__b"].weight, 3);
    }

    #[test]
    fn test_assignments_on_unknown_edges_dropped() {
        let edges = edge_map(&[("a", "b")]);
        let mut postures = BTreeMap::new();
        postures.insert(
            "red".to_string(),
            FactionPosture {
                assignments: BTreeMap::from([(
                    "x__y".to_string(),
                    PostureEntry {
                        posture: Posture::Probe,
                        weight: 1,
                    },
                )]),
            },
        );

        let report = normalize_front_postures(&mut postures, &edges);
        assert_eq!(report.entries_dropped, 1);
        assert!(postures["red"].assignments.is_empty());
    }

    #[test]
    fn test_hold_generates_no_intent() {
        assert_eq!(Posture::Hold.multiplier(), 0);
        assert_eq!(Posture::Probe.multiplier(), 1);
        assert_eq!(Posture::Push.multiplier(), 2);
    }
}
