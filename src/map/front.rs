//! Front edges and persistent front segments
//!
//! A front edge is a graph edge whose two endpoints have different known
//! controllers. The derived set is recomputed every turn and never
//! persisted; front segments carry the contested history across turns.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::ids::{region_id_for, EdgeId, FactionId, SettlementId};
use crate::map::graph::EdgeRecord;

/// Identifies one of a front edge's two sides.
///
/// Sides are tied to the edge's canonical endpoints, not to factions, so
/// positive pressure always favors the side holding endpoint `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    SideA,
    SideB,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::SideA => Side::SideB,
            Side::SideB => Side::SideA,
        }
    }
}

/// A contested edge, derived fresh each turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontEdge {
    pub edge_id: EdgeId,
    pub a: SettlementId,
    pub b: SettlementId,
    /// Controller of endpoint `a`; None is known but unowned ground
    pub side_a: Option<FactionId>,
    /// Controller of endpoint `b`
    pub side_b: Option<FactionId>,
}

impl FrontEdge {
    /// The faction holding the given side, if any.
    pub fn faction_on(&self, side: Side) -> Option<&FactionId> {
        match side {
            Side::SideA => self.side_a.as_ref(),
            Side::SideB => self.side_b.as_ref(),
        }
    }

    /// Whether the faction holds either side of this edge.
    pub fn has_side(&self, faction: &str) -> bool {
        self.side_a.as_deref() == Some(faction) || self.side_b.as_deref() == Some(faction)
    }

    /// Region key when both sides are factions; None on frontier edges.
    pub fn region_id(&self) -> Option<String> {
        match (&self.side_a, &self.side_b) {
            (Some(a), Some(b)) => Some(region_id_for(a, b)),
            _ => None,
        }
    }
}

/// Derives the current front set from edges and political control.
///
/// An edge qualifies when both endpoints have a known control entry and
/// the controllers differ. A faction facing unowned ground is a front;
/// two unowned endpoints are not, and any unknown endpoint disqualifies
/// the edge entirely. Output is sorted by edge id.
pub fn derive_front_edges(
    edges: &BTreeMap<EdgeId, EdgeRecord>,
    controllers: &BTreeMap<SettlementId, Option<FactionId>>,
) -> Vec<FrontEdge> {
    let mut fronts = Vec::new();
    for (edge_id, edge) in edges {
        let (Some(control_a), Some(control_b)) =
            (controllers.get(&edge.a), controllers.get(&edge.b))
        else {
            continue;
        };
        if control_a == control_b {
            continue;
        }
        fronts.push(FrontEdge {
            edge_id: edge_id.clone(),
            a: edge.a.clone(),
            b: edge.b.clone(),
            side_a: control_a.clone(),
            side_b: control_b.clone(),
        });
    }
    fronts
}

/// Indexes a derived front set by edge id for per-edge lookups.
pub fn index_by_edge_id(fronts: &[FrontEdge]) -> BTreeMap<&str, &FrontEdge> {
    fronts
        .iter()
        .map(|front| (front.edge_id.as_str(), front))
        .collect()
}

/// Persistent record of one edge's contested history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontSegment {
    pub edge_id: EdgeId,
    pub active: bool,
    /// Turn the segment was first created
    pub created_turn: u64,
    /// Turn the current activation began
    pub since_turn: u64,
    pub last_active_turn: u64,
    /// Consecutive turns active, reset on deactivation
    pub active_streak: u32,
    pub max_active_streak: u32,
    /// Total turns spent active over the segment's whole life
    pub friction: u32,
    pub max_friction: u32,
}

/// Counts from one segment sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrontSyncReport {
    pub created: u32,
    pub reactivated: u32,
    pub continued: u32,
    pub deactivated: u32,
}

/// Reconciles persistent segments with the freshly derived front set.
///
/// Segments are never deleted; an edge that stops being contested keeps
/// its record with `active` cleared so reactivation can tell a returning
/// front from a new one.
pub fn sync_front_segments(
    segments: &mut BTreeMap<EdgeId, FrontSegment>,
    fronts: &[FrontEdge],
    turn: u64,
) -> FrontSyncReport {
    let mut report = FrontSyncReport::default();
    let front_ids: BTreeSet<&str> = fronts.iter().map(|f| f.edge_id.as_str()).collect();

    for front in fronts {
        match segments.get_mut(&front.edge_id) {
            None => {
                segments.insert(
                    front.edge_id.clone(),
                    FrontSegment {
                        edge_id: front.edge_id.clone(),
                        active: true,
                        created_turn: turn,
                        since_turn: turn,
                        last_active_turn: turn,
                        active_streak: 1,
                        max_active_streak: 1,
                        friction: 1,
                        max_friction: 1,
                    },
                );
                report.created += 1;
            }
            Some(segment) if !segment.active => {
                segment.active = true;
                segment.since_turn = turn;
                segment.last_active_turn = turn;
                segment.active_streak = 1;
                segment.friction += 1;
                segment.max_active_streak = segment.max_active_streak.max(segment.active_streak);
                segment.max_friction = segment.max_friction.max(segment.friction);
                report.reactivated += 1;
            }
            Some(segment) => {
                segment.last_active_turn = turn;
                segment.active_streak += 1;
                segment.friction += 1;
                segment.max_active_streak = segment.max_active_streak.max(segment.active_streak);
                segment.max_friction = segment.max_friction.max(segment.friction);
                report.continued += 1;
            }
        }
    }

    for segment in segments.values_mut() {
        if segment.active && !front_ids.contains(segment.edge_id.as_str()) {
            segment.active = false;
            segment.active_streak = 0;
            report.deactivated += 1;
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

    fn controllers(
        entries: &[(&str, Option<&str>)],
    ) -> BTreeMap<SettlementId, Option<FactionId>> {
        entries
            .iter()
            .map(|(sid, faction)| (sid.to_string(), faction.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_front_requires_differing_known_controllers() {
        let edges = edge_map(&[("a", "b"), ("b", "c"), ("c", "d")]);
        let control = controllers(&[
            ("a", Some("red")),
            ("b", Some("blue")),
            ("c", Some("blue")),
            ("d", Some("blue")),
        ]);
        let fronts = derive_front_edges(&edges, &control);
        assert_eq!(fronts.len(), 1);
        assert_eq!(fronts[0].edge_id, "a__b");
        assert_eq!(fronts[0].side_a.as_deref(), Some("red"));
        assert_eq!(fronts[0].side_b.as_deref(), Some("blue"));
    }

    #[test]
    fn test_unowned_ground_facing_a_faction_is_a_front() {
        let edges = edge_map(&[("a", "b")]);
        let control = controllers(&[("a", Some("red")), ("b", None)]);
        let fronts = derive_front_edges(&edges, &control);
        assert_eq!(fronts.len(), 1);
        assert_eq!(fronts[0].side_b, None);
        assert_eq!(fronts[0].region_id(), None);
    }

    #[test]
    fn test_two_unowned_endpoints_are_not_a_front() {
        let edges = edge_map(&[("a", "b")]);
        let control = controllers(&[("a", None), ("b", None)]);
        assert!(derive_front_edges(&edges, &control).is_empty());
    }

    #[test]
    fn test_unknown_endpoint_disqualifies_the_edge() {
        let edges = edge_map(&[("a", "b")]);
        let control = controllers(&[("a", Some("red"))]);
        assert!(derive_front_edges(&edges, &control).is_empty());
    }

    #[test]
    fn test_region_id_sorts_faction_pair() {
        let edges = edge_map(&[("a", "b")]);
        let control = controllers(&[("a", Some("zulu")), ("b", Some("alpha"))]);
        let fronts = derive_front_edges(&edges, &control);
        assert_eq!(fronts[0].region_id().as_deref(), Some("alpha--zulu"));
    }

    #[test]
    fn test_segment_lifecycle() {
        let edges = edge_map(&[("a", "b")]);
        let contested = controllers(&[("a", Some("red")), ("b", Some("blue"))]);
        let quiet = controllers(&[("a", Some("red")), ("b", Some("red"))]);
        let mut segments = BTreeMap::new();

        let fronts = derive_front_edges(&edges, &contested);
        let report = sync_front_segments(&mut segments, &fronts, 1);
        assert_eq!(report.created, 1);

        let report = sync_front_segments(&mut segments, &fronts, 2);
        assert_eq!(report.continued, 1);
        let segment = segments.get("a__b").unwrap();
        assert_eq!(segment.active_streak, 2);
        assert_eq!(segment.friction, 2);

        let fronts = derive_front_edges(&edges, &quiet);
        let report = sync_front_segments(&mut segments, &fronts, 3);
        assert_eq!(report.deactivated, 1);
        let segment = segments.get("a__b").unwrap();
        assert!(!segment.active);
        assert_eq!(segment.active_streak, 0);
        assert_eq!(segment.friction, 2, "friction survives deactivation");

        let fronts = derive_front_edges(&edges, &contested);
        let report = sync_front_segments(&mut segments, &fronts, 4);
        assert_eq!(report.reactivated, 1);
        let segment = segments.get("a__b").unwrap();
        assert_eq!(segment.since_turn, 4);
        assert_eq!(segment.created_turn, 1);
        assert_eq!(segment.active_streak, 1);
        assert_eq!(segment.max_active_streak, 2);
        assert_eq!(segment.friction, 3);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::SideA.opposite(), Side::SideB);
        assert_eq!(Side::SideB.opposite(), Side::SideA);
    }
}
