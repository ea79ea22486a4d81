//! Formation commitment and fatigue
//!
//! Posture orders declare weight; formations back it with milli-point
//! commitment. Weight without backing collapses to nothing, supply
//! failure halves backing, fatigue erodes it, and command capacity caps
//! the faction-wide total.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::core::config::config;
use crate::core::ids::{EdgeId, FactionId, FormationId};
use crate::map::front::{index_by_edge_id, FrontEdge};
use crate::sim::supply::{side_locally_supplied, SupplyIndex};
use crate::state::game_state::{Assignment, Formation, FormationStatus, GameState};

/// Effective posture weights per edge and faction, computed by the
/// commitment phase and consumed by pressure accumulation.
pub type EffectivePostures = BTreeMap<EdgeId, BTreeMap<FactionId, u32>>;

/// Whether a formation counts as supplied at its assignment.
///
/// Unassigned formations count as supplied. An assignment that touches no
/// current front also resolves to supplied; a quiet sector must not
/// grind its defenders down.
pub fn is_formation_supplied(
    formation: &Formation,
    fronts: &[FrontEdge],
    fronts_by_edge: &BTreeMap<&str, &FrontEdge>,
    controllers: &BTreeMap<String, Option<FactionId>>,
    supply: &SupplyIndex,
) -> bool {
    match &formation.assignment {
        None => true,
        Some(Assignment::Edge { edge_id }) => match fronts_by_edge.get(edge_id.as_str()) {
            Some(front) => side_locally_supplied(front, &formation.faction, controllers, supply),
            None => true,
        },
        Some(Assignment::Region { region_id }) => {
            let edges = faction_region_edges(fronts, &formation.faction, region_id);
            if edges.is_empty() {
                return true;
            }
            edges
                .iter()
                .any(|front| side_locally_supplied(front, &formation.faction, controllers, supply))
        }
    }
}

/// Front edges of a region on which the faction holds a side, sorted.
fn faction_region_edges<'a>(
    fronts: &'a [FrontEdge],
    faction: &str,
    region_id: &str,
) -> Vec<&'a FrontEdge> {
    fronts
        .iter()
        .filter(|front| front.region_id().as_deref() == Some(region_id))
        .filter(|front| front.has_side(faction))
        .collect()
}

/// Per-formation fatigue outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormationFatigue {
    pub formation_id: FormationId,
    pub faction: FactionId,
    pub supplied: bool,
    pub fatigue: u32,
}

/// Per-faction fatigue rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionFatigue {
    pub faction: FactionId,
    pub formations_counted: u32,
    pub unsupplied: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FatigueReport {
    pub by_formation: Vec<FormationFatigue>,
    pub by_faction: Vec<FactionFatigue>,
}

/// Stamps supplied formations and fatigues unsupplied assigned ones.
///
/// Unassigned formations never fatigue here; an idle formation in an
/// isolated pocket is the encirclement system's problem, not this one's.
pub fn update_formation_fatigue(
    state: &mut GameState,
    fronts: &[FrontEdge],
    supply: &SupplyIndex,
) -> FatigueReport {
    let turn = state.meta.turn;
    let fronts_by_edge = index_by_edge_id(fronts);
    let controllers = &state.political_controllers;

    let mut report = FatigueReport::default();
    let mut faction_totals: BTreeMap<FactionId, (u32, u32)> = BTreeMap::new();

    for (id, formation) in state.formations.iter_mut() {
        if formation.status != FormationStatus::Active {
            continue;
        }
        let supplied =
            is_formation_supplied(formation, fronts, &fronts_by_edge, controllers, supply);
        if supplied {
            formation.ops.last_supplied_turn = Some(turn);
        } else if formation.assignment.is_some() {
            formation.ops.fatigue += 1;
        }

        let totals = faction_totals.entry(formation.faction.clone()).or_default();
        totals.0 += 1;
        if !supplied {
            totals.1 += 1;
        }
        report.by_formation.push(FormationFatigue {
            formation_id: id.clone(),
            faction: formation.faction.clone(),
            supplied,
            fatigue: formation.ops.fatigue,
        });
    }

    report.by_faction = faction_totals
        .into_iter()
        .map(|(faction, (formations_counted, unsupplied))| FactionFatigue {
            faction,
            formations_counted,
            unsupplied,
        })
        .collect();
    report
}

/// One faction-edge commitment audit row.
#[derive(Debug, Clone, Serialize)]
pub struct CommitmentEdgeAudit {
    pub edge_id: EdgeId,
    pub faction: FactionId,
    /// Declared posture weight before backing is considered
    pub base_weight: u32,
    /// Milli-points of commitment that landed on this edge
    pub commit_points: u64,
    /// 0..1 share of the declared weight that is actually backed
    pub friction_factor: f64,
    pub effective_weight: u32,
}

/// Per-faction commitment rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitmentFactionTotals {
    pub faction: FactionId,
    pub formations_counted: u32,
    pub commit_points_used: u64,
    pub capacity: u64,
    pub demand: u64,
    pub rescaled: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitmentReport {
    pub by_faction: Vec<CommitmentFactionTotals>,
    /// Sorted by edge id, then faction id
    pub by_edge: Vec<CommitmentEdgeAudit>,
}

/// Computes commitment-backed effective weights for every posture
/// assignment.
///
/// Effective weight is integer-exact: min(base, points / base_cost).
/// Edge assignments land all points on their edge; region assignments
/// split evenly across the faction's active front edges in that region,
/// remainder to the lowest edge ids. A region with no active edges
/// absorbs the points.
pub fn apply_formation_commitment(
    state: &GameState,
    fronts: &[FrontEdge],
    supply: &SupplyIndex,
) -> (CommitmentReport, EffectivePostures) {
    let cfg = config();
    let fronts_by_edge = index_by_edge_id(fronts);
    let controllers = &state.political_controllers;

    // Milli-points landing on each (faction, edge)
    let mut points: BTreeMap<FactionId, BTreeMap<EdgeId, u64>> = BTreeMap::new();
    let mut totals: BTreeMap<FactionId, (u32, u64)> = BTreeMap::new();

    for (id, formation) in &state.formations {
        if !formation.is_active() {
            continue;
        }
        let Some(assignment) = &formation.assignment else {
            continue;
        };

        let supplied =
            is_formation_supplied(formation, fronts, &fronts_by_edge, controllers, supply);
        let mut formation_points = cfg.commit_base_points;
        if !supplied {
            formation_points /= 2;
        }
        formation_points = formation_points
            .saturating_sub(u64::from(formation.ops.fatigue) * cfg.fatigue_commit_penalty);

        let faction_points = points.entry(formation.faction.clone()).or_default();
        match assignment {
            Assignment::Edge { edge_id } => {
                *faction_points.entry(edge_id.clone()).or_default() += formation_points;
            }
            Assignment::Region { region_id } => {
                let edges = faction_region_edges(fronts, &formation.faction, region_id);
                if edges.is_empty() {
                    debug!(formation = %id, %region_id, "region assignment has no active front edges");
                } else {
                    let count = edges.len() as u64;
                    let share = formation_points / count;
                    let remainder = formation_points % count;
                    for (index, front) in edges.iter().enumerate() {
                        let extra = u64::from((index as u64) < remainder);
                        *faction_points.entry(front.edge_id.clone()).or_default() +=
                            share + extra;
                    }
                }
            }
        }

        let faction_totals = totals.entry(formation.faction.clone()).or_default();
        faction_totals.0 += 1;
        faction_totals.1 += formation_points;
    }

    let mut effective: EffectivePostures = BTreeMap::new();
    let mut by_edge: Vec<CommitmentEdgeAudit> = Vec::new();
    let mut by_faction: Vec<CommitmentFactionTotals> = Vec::new();

    for (faction_id, faction) in &state.factions {
        let faction_points = points.get(faction_id);
        let assignments = state
            .front_posture
            .get(faction_id)
            .map(|posture| &posture.assignments);

        // Union of edges with declared weight or landed points
        let mut edge_ids: BTreeSet<&EdgeId> = BTreeSet::new();
        if let Some(assignments) = assignments {
            edge_ids.extend(assignments.keys());
        }
        if let Some(faction_points) = faction_points {
            edge_ids.extend(faction_points.keys());
        }

        let mut audits: Vec<CommitmentEdgeAudit> = Vec::new();
        for edge_id in edge_ids {
            let base_weight = assignments
                .and_then(|a| a.get(edge_id))
                .map(|entry| entry.weight)
                .unwrap_or(0);
            let commit_points = faction_points
                .and_then(|p| p.get(edge_id))
                .copied()
                .unwrap_or(0);
            let (friction_factor, effective_weight) = if base_weight == 0 {
                (0.0, 0)
            } else {
                let full_backing = u64::from(base_weight) * cfg.commit_base_points;
                let factor = (commit_points as f64 / full_backing as f64).min(1.0);
                let backed = (commit_points / cfg.commit_base_points).min(u64::from(base_weight));
                (factor, backed as u32)
            };
            audits.push(CommitmentEdgeAudit {
                edge_id: edge_id.clone(),
                faction: faction_id.clone(),
                base_weight,
                commit_points,
                friction_factor,
                effective_weight,
            });
        }

        let demand: u64 = audits.iter().map(|a| u64::from(a.effective_weight)).sum();
        let capacity = faction.command_capacity;
        let rescaled = capacity > 0 && demand > capacity;
        if rescaled {
            for audit in audits.iter_mut() {
                audit.effective_weight =
                    ((u64::from(audit.effective_weight) * capacity) / demand) as u32;
            }
        }

        let (formations_counted, commit_points_used) =
            totals.get(faction_id).copied().unwrap_or((0, 0));
        by_faction.push(CommitmentFactionTotals {
            faction: faction_id.clone(),
            formations_counted,
            commit_points_used,
            capacity,
            demand,
            rescaled,
        });

        for audit in &audits {
            effective
                .entry(audit.edge_id.clone())
                .or_default()
                .insert(faction_id.clone(), audit.effective_weight);
        }
        by_edge.extend(audits);
    }

    by_edge.sort_by(|x, y| x.edge_id.cmp(&y.edge_id).then(x.faction.cmp(&y.faction)));

    (CommitmentReport { by_faction, by_edge }, effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::front::derive_front_edges;
    use crate::map::graph::EdgeRecord;
    use crate::sim::supply::{resolve_supply, SupplyIndex};
    use crate::state::game_state::{Faction, FormationKind, Phase};
    use crate::state::posture::{FactionPosture, Posture, PostureEntry};

    /// a--b--c with red on a and b (source a), blue on c (source c).
    fn fixture() -> (GameState, Vec<FrontEdge>, SupplyIndex) {
        let mut state = GameState::default();
        state.meta.phase = Phase::PhaseII;
        for sid in ["a", "b", "c"] {
            state
                .settlements
                .insert(sid.to_string(), crate::map::graph::Settlement::new(sid, "m"));
        }
        for (lo, hi) in [("a", "b"), ("b", "c")] {
            state.edges.insert(
                format!("{lo}__{hi}"),
                EdgeRecord {
                    a: lo.to_string(),
                    b: hi.to_string(),
                },
            );
        }
        state.factions.insert(
            "red".to_string(),
            Faction::new("red").with_aor(&["a", "b"]).with_supply_sources(&["a"]),
        );
        state.factions.insert(
            "blue".to_string(),
            Faction::new("blue").with_aor(&["c"]).with_supply_sources(&["c"]),
        );
        state
            .political_controllers
            .insert("a".to_string(), Some("red".to_string()));
        state
            .political_controllers
            .insert("b".to_string(), Some("red".to_string()));
        state
            .political_controllers
            .insert("c".to_string(), Some("blue".to_string()));

        let adjacency = crate::map::adjacency::AdjacencyIndex::build(&state.edges);
        let fronts = derive_front_edges(&state.edges, &state.political_controllers);
        let report = resolve_supply(&state.factions, &state.political_controllers, &adjacency, 0);
        let supply = SupplyIndex::from_report(&report);
        (state, fronts, supply)
    }

    fn push_posture(state: &mut GameState, faction: &str, edge_id: &str, weight: u32) {
        state
            .front_posture
            .entry(faction.to_string())
            .or_insert_with(FactionPosture::default)
            .assignments
            .insert(
                edge_id.to_string(),
                PostureEntry {
                    posture: Posture::Push,
                    weight,
                },
            );
    }

    #[test]
    fn test_unbacked_weight_collapses() {
        let (mut state, fronts, supply) = fixture();
        push_posture(&mut state, "red", "b__c", 3);

        let (report, effective) = apply_formation_commitment(&state, &fronts, &supply);
        assert_eq!(effective["b__c"]["red"], 0);
        let audit = report
            .by_edge
            .iter()
            .find(|a| a.faction == "red")
            .unwrap();
        assert_eq!(audit.base_weight, 3);
        assert_eq!(audit.commit_points, 0);
        assert_eq!(audit.friction_factor, 0.0);
    }

    #[test]
    fn test_one_formation_backs_one_weight_point() {
        let (mut state, fronts, supply) = fixture();
        push_posture(&mut state, "red", "b__c", 3);
        state.formations.insert(
            "b1".to_string(),
            Formation::new("b1", "red", FormationKind::Brigade)
                .with_hq("b")
                .with_assignment(Assignment::Edge {
                    edge_id: "b__c".to_string(),
                }),
        );

        let (report, effective) = apply_formation_commitment(&state, &fronts, &supply);
        assert_eq!(effective["b__c"]["red"], 1);
        let audit = report.by_edge.iter().find(|a| a.faction == "red").unwrap();
        assert_eq!(audit.commit_points, 1000);
        assert!((audit.friction_factor - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsupplied_formation_commits_half() {
        let (mut state, fronts, _) = fixture();
        push_posture(&mut state, "red", "b__c", 3);
        state.formations.insert(
            "b1".to_string(),
            Formation::new("b1", "red", FormationKind::Brigade)
                .with_hq("b")
                .with_assignment(Assignment::Edge {
                    edge_id: "b__c".to_string(),
                }),
        );
        // Sever red's supply entirely
        if let Some(faction) = state.factions.get_mut("red") {
            faction.supply_sources.clear();
        }
        let adjacency = crate::map::adjacency::AdjacencyIndex::build(&state.edges);
        let report = resolve_supply(&state.factions, &state.political_controllers, &adjacency, 0);
        let supply = SupplyIndex::from_report(&report);

        let (report, effective) = apply_formation_commitment(&state, &fronts, &supply);
        let audit = report.by_edge.iter().find(|a| a.faction == "red").unwrap();
        assert_eq!(audit.commit_points, 500);
        assert_eq!(effective["b__c"]["red"], 0, "500 points back no whole point");
    }

    #[test]
    fn test_fatigue_erodes_commitment() {
        let (mut state, fronts, supply) = fixture();
        push_posture(&mut state, "red", "b__c", 3);
        let mut formation = Formation::new("b1", "red", FormationKind::Brigade)
            .with_hq("b")
            .with_assignment(Assignment::Edge {
                edge_id: "b__c".to_string(),
            });
        formation.ops.fatigue = 4;
        state.formations.insert("b1".to_string(), formation);

        let (report, _) = apply_formation_commitment(&state, &fronts, &supply);
        let audit = report.by_edge.iter().find(|a| a.faction == "red").unwrap();
        assert_eq!(audit.commit_points, 800);
    }

    #[test]
    fn test_command_capacity_rescales_demand() {
        let (mut state, fronts, supply) = fixture();
        push_posture(&mut state, "red", "a__b", 2);
        push_posture(&mut state, "red", "b__c", 2);
        if let Some(faction) = state.factions.get_mut("red") {
            faction.command_capacity = 2;
        }
        for (id, edge) in [("b1", "a__b"), ("b2", "a__b"), ("b3", "b__c"), ("b4", "b__c")] {
            state.formations.insert(
                id.to_string(),
                Formation::new(id, "red", FormationKind::Brigade)
                    .with_hq("b")
                    .with_assignment(Assignment::Edge {
                        edge_id: edge.to_string(),
                    }),
            );
        }

        let (report, effective) = apply_formation_commitment(&state, &fronts, &supply);
        let red = report
            .by_faction
            .iter()
            .find(|f| f.faction == "red")
            .unwrap();
        assert_eq!(red.demand, 4);
        assert!(red.rescaled);
        // floor(2 * 2 / 4) = 1 on each edge
        assert_eq!(effective["a__b"]["red"], 1);
        assert_eq!(effective["b__c"]["red"], 1);
    }

    #[test]
    fn test_region_assignment_splits_points() {
        let (mut state, _, _) = fixture();
        // Give red two edges against blue: flip b to blue, a and c to red
        state
            .political_controllers
            .insert("b".to_string(), Some("blue".to_string()));
        state
            .political_controllers
            .insert("c".to_string(), Some("red".to_string()));
        state.factions.insert(
            "red".to_string(),
            Faction::new("red").with_aor(&["a", "c"]).with_supply_sources(&["a", "c"]),
        );
        state.factions.insert(
            "blue".to_string(),
            Faction::new("blue").with_aor(&["b"]).with_supply_sources(&["b"]),
        );
        push_posture(&mut state, "red", "a__b", 1);
        push_posture(&mut state, "red", "b__c", 1);
        state.formations.insert(
            "b1".to_string(),
            Formation::new("b1", "red", FormationKind::Brigade)
                .with_hq("a")
                .with_assignment(Assignment::Region {
                    region_id: "blue--red".to_string(),
                }),
        );

        let adjacency = crate::map::adjacency::AdjacencyIndex::build(&state.edges);
        let fronts = derive_front_edges(&state.edges, &state.political_controllers);
        let report = resolve_supply(&state.factions, &state.political_controllers, &adjacency, 0);
        let supply = SupplyIndex::from_report(&report);

        let (report, _) = apply_formation_commitment(&state, &fronts, &supply);
        let on_ab = report
            .by_edge
            .iter()
            .find(|a| a.edge_id == "a__b" && a.faction == "red")
            .unwrap();
        let on_bc = report
            .by_edge
            .iter()
            .find(|a| a.edge_id == "b__c" && a.faction == "red")
            .unwrap();
        assert_eq!(on_ab.commit_points, 500);
        assert_eq!(on_bc.commit_points, 500);
    }

    #[test]
    fn test_fatigue_accrues_only_when_assigned_and_unsupplied() {
        let (mut state, fronts, _) = fixture();
        state.formations.insert(
            "assigned".to_string(),
            Formation::new("assigned", "red", FormationKind::Brigade)
                .with_hq("b")
                .with_assignment(Assignment::Edge {
                    edge_id: "b__c".to_string(),
                }),
        );
        state.formations.insert(
            "idle".to_string(),
            Formation::new("idle", "red", FormationKind::Brigade).with_hq("a"),
        );
        if let Some(faction) = state.factions.get_mut("red") {
            faction.supply_sources.clear();
        }
        let adjacency = crate::map::adjacency::AdjacencyIndex::build(&state.edges);
        let supply_report =
            resolve_supply(&state.factions, &state.political_controllers, &adjacency, 0);
        let supply = SupplyIndex::from_report(&supply_report);

        let report = update_formation_fatigue(&mut state, &fronts, &supply);
        assert_eq!(state.formations["assigned"].ops.fatigue, 1);
        assert_eq!(state.formations["idle"].ops.fatigue, 0);
        assert_eq!(
            state.formations["idle"].ops.last_supplied_turn,
            Some(0),
            "idle formations count as supplied"
        );
        let red = report
            .by_faction
            .iter()
            .find(|f| f.faction == "red")
            .unwrap();
        assert_eq!(red.formations_counted, 2);
        assert_eq!(red.unsupplied, 1);
    }
}
