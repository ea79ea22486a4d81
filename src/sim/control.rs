//! Control flip proposal and resolution
//!
//! Each breach is resolved into at most one settlement changing hands,
//! chosen from the one-hop neighborhood of the breached edge. Proposal
//! and application are split so a caller can audit or veto before state
//! changes.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::core::config::config;
use crate::core::ids::{split_edge_id, EdgeId, FactionId, SettlementId};
use crate::map::adjacency::AdjacencyIndex;
use crate::map::front::{index_by_edge_id, FrontEdge, Side};
use crate::sim::breach::Breach;
use crate::state::game_state::{control_status, ControlStatus, GameState};

pub const CONTROL_FLIP_SCHEMA: u32 = 1;

/// Reason tag recorded on every flip target.
pub const FLIP_REASON_BREACH_1HOP: &str = "breach_1hop";

/// One settlement ordered to change hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlipTarget {
    pub sid: SettlementId,
    /// Previous controller; None when the ground was unowned
    pub from: Option<FactionId>,
    pub to: FactionId,
    pub reason: String,
}

/// A breach resolved into a territorial change, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlFlipProposal {
    pub edge_id: EdgeId,
    pub pressure: i64,
    pub side_a: Option<FactionId>,
    pub side_b: Option<FactionId>,
    pub favored_side: Side,
    pub losing_side: Side,
    pub targets: Vec<FlipTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlFlipReport {
    pub schema: u32,
    pub turn: u64,
    pub threshold: i64,
    /// Sorted by |pressure| descending, edge id ascending
    pub proposals: Vec<ControlFlipProposal>,
    pub applied: u32,
    pub skipped_malformed: u32,
    pub skipped_no_front: u32,
    pub skipped_unowned_favored: u32,
    pub skipped_no_candidate: u32,
}

/// Builds flip proposals for the given breaches.
///
/// The candidate set is the breached edge's endpoints plus their
/// neighbors, filtered to settlements the losing side holds. The
/// candidate with the most favored-faction neighbors wins; ties go to
/// the lexicographically smaller settlement id.
pub fn propose_control_flips(
    breaches: &[Breach],
    fronts: &[FrontEdge],
    adjacency: &AdjacencyIndex,
    controllers: &BTreeMap<SettlementId, Option<FactionId>>,
    turn: u64,
) -> ControlFlipReport {
    let fronts_by_edge = index_by_edge_id(fronts);
    let mut report = ControlFlipReport {
        schema: CONTROL_FLIP_SCHEMA,
        turn,
        threshold: config().breach_threshold,
        ..Default::default()
    };

    for breach in breaches {
        let Some((endpoint_a, endpoint_b)) = split_edge_id(&breach.edge_id) else {
            debug!(edge_id = %breach.edge_id, "skipping breach with malformed edge id");
            report.skipped_malformed += 1;
            continue;
        };
        let Some(front) = fronts_by_edge.get(breach.edge_id.as_str()) else {
            report.skipped_no_front += 1;
            continue;
        };
        let favored_side = breach.favored_side;
        let losing_side = favored_side.opposite();
        let Some(favored_faction) = front.faction_on(favored_side).cloned() else {
            // Unowned ground cannot take territory
            report.skipped_unowned_favored += 1;
            continue;
        };
        let losing_faction = front.faction_on(losing_side).cloned();

        // One-hop ring around the breach
        let mut candidates: BTreeSet<SettlementId> = BTreeSet::new();
        candidates.insert(endpoint_a.clone());
        candidates.insert(endpoint_b.clone());
        candidates.extend(adjacency.neighbors(&endpoint_a).iter().cloned());
        candidates.extend(adjacency.neighbors(&endpoint_b).iter().cloned());

        let mut best: Option<(usize, SettlementId)> = None;
        for candidate in &candidates {
            let ControlStatus::Known(holder) = control_status(controllers, candidate) else {
                continue;
            };
            if holder.map(String::as_str) != losing_faction.as_deref() {
                continue;
            }
            let score = adjacency
                .neighbors(candidate)
                .iter()
                .filter(|neighbor| {
                    control_status(controllers, neighbor).is_faction(&favored_faction)
                })
                .count();
            // Candidates arrive in sorted order, so strict improvement
            // keeps the smallest id on ties
            let better = match &best {
                None => true,
                Some((best_score, _)) => score > *best_score,
            };
            if better {
                best = Some((score, candidate.clone()));
            }
        }

        let targets = match best {
            Some((_, sid)) => {
                let from = controllers.get(&sid).cloned().unwrap_or(None);
                vec![FlipTarget {
                    sid,
                    from,
                    to: favored_faction.clone(),
                    reason: FLIP_REASON_BREACH_1HOP.to_string(),
                }]
            }
            None => {
                report.skipped_no_candidate += 1;
                Vec::new()
            }
        };

        report.proposals.push(ControlFlipProposal {
            edge_id: breach.edge_id.clone(),
            pressure: breach.value,
            side_a: front.side_a.clone(),
            side_b: front.side_b.clone(),
            favored_side,
            losing_side,
            targets,
        });
    }

    report.proposals.sort_by(|x, y| {
        y.pressure
            .abs()
            .cmp(&x.pressure.abs())
            .then(x.edge_id.cmp(&y.edge_id))
    });
    report
}

/// Applies proposals to political control and faction responsibility.
///
/// Flipped edges get their pressure zeroed so a captured settlement does
/// not immediately re-breach the same edge; `max_abs` keeps its history.
/// Applying the same proposals twice leaves the state unchanged the
/// second time. Returns the number of targets processed.
pub fn apply_control_flips(state: &mut GameState, proposals: &[ControlFlipProposal]) -> u32 {
    let mut applied = 0;
    for proposal in proposals {
        for target in &proposal.targets {
            for faction in state.factions.values_mut() {
                faction.remove_aor(&target.sid);
            }
            if let Some(faction) = state.factions.get_mut(&target.to) {
                faction.add_aor(&target.sid);
            }
            state
                .political_controllers
                .insert(target.sid.clone(), Some(target.to.clone()));
            applied += 1;
        }
        if !proposal.targets.is_empty() {
            if let Some(record) = state.front_pressure.get_mut(&proposal.edge_id) {
                record.value = 0;
                record.last_updated_turn = state.meta.turn;
            }
        }
    }
    applied
}
