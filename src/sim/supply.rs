//! Supply reachability analysis
//!
//! Multi-source BFS per faction from its supply sources through territory
//! it both controls and answers for. Settlements the BFS cannot reach are
//! isolated; a formation whose whole footprint is isolated is encircled.

use ahash::AHashSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::ids::{edge_id_for, EdgeId, FactionId, FormationId, SettlementId};
use crate::map::adjacency::AdjacencyIndex;
use crate::map::front::FrontEdge;
use crate::state::game_state::{control_status, Faction, GameState};

pub const SUPPLY_REPORT_SCHEMA: u32 = 1;

/// Supply picture for one faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionSupply {
    pub faction: FactionId,
    /// Declared sources, sorted, whether usable this turn or not
    pub sources: Vec<SettlementId>,
    pub reachable_controlled: Vec<SettlementId>,
    pub isolated_controlled: Vec<SettlementId>,
    /// Edges the BFS actually crossed, sorted
    pub edges_used: Vec<EdgeId>,
}

/// Per-turn supply report across all factions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyReport {
    pub schema: u32,
    pub turn: u64,
    pub factions: Vec<FactionSupply>,
}

/// Computes reachability for every faction in sorted id order.
///
/// A settlement counts as supplied territory only when it is in the
/// faction's responsibility list and its known political controller is
/// that faction; the BFS refuses to traverse anything else, so a single
/// flipped settlement can sever everything behind it.
pub fn resolve_supply(
    factions: &BTreeMap<FactionId, Faction>,
    controllers: &BTreeMap<SettlementId, Option<FactionId>>,
    adjacency: &AdjacencyIndex,
    turn: u64,
) -> SupplyReport {
    let mut report = SupplyReport {
        schema: SUPPLY_REPORT_SCHEMA,
        turn,
        factions: Vec::new(),
    };

    for (faction_id, faction) in factions {
        let controlled: BTreeSet<&str> = faction
            .areas_of_responsibility
            .iter()
            .map(String::as_str)
            .collect();
        let sources: BTreeSet<&str> = faction.supply_sources.iter().map(String::as_str).collect();

        let mut visited: AHashSet<&str> = AHashSet::new();
        let mut edges_used: BTreeSet<EdgeId> = BTreeSet::new();
        let mut frontier: VecDeque<&str> = VecDeque::new();

        for &source in &sources {
            if controlled.contains(source)
                && control_status(controllers, source).is_faction(faction_id)
                && visited.insert(source)
            {
                frontier.push_back(source);
            }
        }

        while let Some(current) = frontier.pop_front() {
            for neighbor in adjacency.neighbors(current) {
                let neighbor = neighbor.as_str();
                if visited.contains(neighbor)
                    || !controlled.contains(neighbor)
                    || !control_status(controllers, neighbor).is_faction(faction_id)
                {
                    continue;
                }
                visited.insert(neighbor);
                edges_used.insert(edge_id_for(current, neighbor));
                frontier.push_back(neighbor);
            }
        }

        let reachable_controlled: Vec<SettlementId> = controlled
            .iter()
            .filter(|sid| visited.contains(*sid))
            .map(|sid| sid.to_string())
            .collect();
        let isolated_controlled: Vec<SettlementId> = controlled
            .iter()
            .filter(|sid| !visited.contains(*sid))
            .map(|sid| sid.to_string())
            .collect();

        report.factions.push(FactionSupply {
            faction: faction_id.clone(),
            sources: sources.iter().map(|sid| sid.to_string()).collect(),
            reachable_controlled,
            isolated_controlled,
            edges_used: edges_used.into_iter().collect(),
        });
    }

    report
}

/// Fast reachable / isolated lookups built from a supply report.
#[derive(Debug, Clone, Default)]
pub struct SupplyIndex {
    reachable: BTreeMap<FactionId, BTreeSet<SettlementId>>,
    isolated: BTreeMap<FactionId, BTreeSet<SettlementId>>,
}

impl SupplyIndex {
    pub fn from_report(report: &SupplyReport) -> Self {
        let mut index = Self::default();
        for faction in &report.factions {
            index.reachable.insert(
                faction.faction.clone(),
                faction.reachable_controlled.iter().cloned().collect(),
            );
            index.isolated.insert(
                faction.faction.clone(),
                faction.isolated_controlled.iter().cloned().collect(),
            );
        }
        index
    }

    pub fn is_reachable(&self, faction: &str, sid: &str) -> bool {
        self.reachable
            .get(faction)
            .map(|sids| sids.contains(sid))
            .unwrap_or(false)
    }

    pub fn is_isolated(&self, faction: &str, sid: &str) -> bool {
        self.isolated
            .get(faction)
            .map(|sids| sids.contains(sid))
            .unwrap_or(false)
    }
}

/// True when the faction holds a supplied foothold on the edge.
///
/// Supply is local: only the edge's own endpoints count, so a faction
/// fighting from an isolated pocket is unsupplied here even if the rest
/// of its territory is fine.
pub fn side_locally_supplied(
    front: &FrontEdge,
    faction: &str,
    controllers: &BTreeMap<SettlementId, Option<FactionId>>,
    supply: &SupplyIndex,
) -> bool {
    let holds_a = control_status(controllers, &front.a).is_faction(faction)
        && supply.is_reachable(faction, &front.a);
    let holds_b = control_status(controllers, &front.b).is_faction(faction)
        && supply.is_reachable(faction, &front.b);
    holds_a || holds_b
}

/// Flags active formations whose entire footprint is cut off.
pub fn compute_encirclement(state: &GameState, supply: &SupplyIndex) -> BTreeMap<FormationId, bool> {
    let mut encircled = BTreeMap::new();
    for (id, formation) in &state.formations {
        if !formation.is_active() {
            continue;
        }
        let footprint = state.formation_footprint(formation);
        let cut_off = !footprint.is_empty()
            && footprint
                .iter()
                .all(|sid| supply.is_isolated(&formation.faction, sid));
        encircled.insert(id.clone(), cut_off);
    }
    encircled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::graph::{EdgeRecord, SettlementGraph};
    use crate::state::game_state::{Formation, FormationKind};

    fn line_graph(sids: &[&str]) -> BTreeMap<EdgeId, EdgeRecord> {
        sids.windows(2)
            .map(|pair| {
                let (lo, hi) = if pair[0] < pair[1] {
                    (pair[0], pair[1])
                } else {
                    (pair[1], pair[0])
                };
                (
                    edge_id_for(lo, hi),
                    EdgeRecord {
                        a: lo.to_string(),
                        b: hi.to_string(),
                    },
                )
            })
            .collect()
    }

    fn faction_map(factions: Vec<Faction>) -> BTreeMap<FactionId, Faction> {
        factions.into_iter().map(|f| (f.id.clone(), f)).collect()
    }

    fn controllers(entries: &[(&str, &str)]) -> BTreeMap<SettlementId, Option<FactionId>> {
        entries
            .iter()
            .map(|(sid, faction)| (sid.to_string(), Some(faction.to_string())))
            .collect()
    }

    #[test]
    fn test_supply_spreads_through_own_territory() {
        let edges = line_graph(&["a", "b", "c"]);
        let adjacency = AdjacencyIndex::build(&edges);
        let factions = faction_map(vec![Faction::new("red")
            .with_aor(&["a", "b", "c"])
            .with_supply_sources(&["a"])]);
        let control = controllers(&[("a", "red"), ("b", "red"), ("c", "red")]);

        let report = resolve_supply(&factions, &control, &adjacency, 1);
        let red = &report.factions[0];
        assert_eq!(red.reachable_controlled, ["a", "b", "c"]);
        assert!(red.isolated_controlled.is_empty());
        assert_eq!(red.edges_used, ["a__b", "b__c"]);
    }

    #[test]
    fn test_enemy_settlement_severs_supply() {
        let edges = line_graph(&["a", "b", "c"]);
        let adjacency = AdjacencyIndex::build(&edges);
        let factions = faction_map(vec![
            Faction::new("red").with_aor(&["a", "c"]).with_supply_sources(&["a"]),
            Faction::new("blue").with_aor(&["b"]),
        ]);
        let control = controllers(&[("a", "red"), ("b", "blue"), ("c", "red")]);

        let report = resolve_supply(&factions, &control, &adjacency, 1);
        let red = &report.factions[1];
        assert_eq!(red.faction, "red");
        assert_eq!(red.reachable_controlled, ["a"]);
        assert_eq!(red.isolated_controlled, ["c"]);
    }

    #[test]
    fn test_source_on_lost_ground_is_unusable() {
        let edges = line_graph(&["a", "b"]);
        let adjacency = AdjacencyIndex::build(&edges);
        let factions = faction_map(vec![
            Faction::new("red").with_aor(&["a", "b"]).with_supply_sources(&["a"]),
            Faction::new("blue").with_aor(&[]),
        ]);
        // Controller disagrees with the responsibility list
        let control = controllers(&[("a", "blue"), ("b", "red")]);

        let report = resolve_supply(&factions, &control, &adjacency, 1);
        let red = &report.factions[1];
        assert!(red.reachable_controlled.is_empty());
        assert_eq!(red.isolated_controlled, ["a", "b"]);
        assert_eq!(red.sources, ["a"], "declared sources reported regardless");
    }

    #[test]
    fn test_faction_without_sources_is_fully_isolated() {
        let edges = line_graph(&["a", "b"]);
        let adjacency = AdjacencyIndex::build(&edges);
        let factions = faction_map(vec![Faction::new("red").with_aor(&["a", "b"])]);
        let control = controllers(&[("a", "red"), ("b", "red")]);

        let report = resolve_supply(&factions, &control, &adjacency, 1);
        assert_eq!(report.factions[0].isolated_controlled, ["a", "b"]);
    }

    #[test]
    fn test_encirclement_requires_whole_footprint_cut() {
        let (graph, _) = SettlementGraph::from_records(
            vec![
                crate::map::graph::Settlement::new("a", "m"),
                crate::map::graph::Settlement::new("b", "m"),
                crate::map::graph::Settlement::new("c", "m"),
            ],
            vec![
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string()),
            ],
        );
        let mut state = GameState::new(crate::state::game_state::Phase::PhaseII, graph);
        state.factions.insert(
            "red".to_string(),
            Faction::new("red").with_aor(&["a", "b", "c"]).with_supply_sources(&["a"]),
        );
        for sid in ["a", "b", "c"] {
            state
                .political_controllers
                .insert(sid.to_string(), Some("red".to_string()));
        }
        state.formations.insert(
            "b1".to_string(),
            Formation::new("b1", "red", FormationKind::Brigade).with_hq("c"),
        );

        // Fully connected: not encircled
        let adjacency = AdjacencyIndex::build(&state.edges);
        let report = resolve_supply(&state.factions, &state.political_controllers, &adjacency, 1);
        let supply = SupplyIndex::from_report(&report);
        let encircled = compute_encirclement(&state, &supply);
        assert_eq!(encircled.get("b1"), Some(&false));

        // Losing b cuts c off
        state
            .political_controllers
            .insert("b".to_string(), Some("blue".to_string()));
        state.factions.insert("blue".to_string(), Faction::new("blue").with_aor(&["b"]));
        let report = resolve_supply(&state.factions, &state.political_controllers, &adjacency, 2);
        let supply = SupplyIndex::from_report(&report);
        let encircled = compute_encirclement(&state, &supply);
        assert_eq!(encircled.get("b1"), Some(&true));
    }
}
