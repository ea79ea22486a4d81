//! Formation movement
//!
//! Brigades pack, march through friendly territory and unpack at their
//! destinations. Combat stance pays a flat rate per settlement; column
//! stance pays terrain-weighted costs at a composition-derived rate but
//! arrives unready to fight.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

use crate::core::config::config;
use crate::core::ids::{FactionId, FormationId, SettlementId};
use crate::map::adjacency::AdjacencyIndex;
use crate::map::graph::Settlement;
use crate::state::game_state::{
    control_status, DeployAction, DeployOrder, FormationComposition, FormationKind, GameState,
    MovementOrder, MovementState, MovementStatus, Stance,
};

/// Counts from one movement phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MovementReport {
    pub deploys: u32,
    pub undeploys: u32,
    pub orders_accepted: u32,
    pub orders_ignored: u32,
    pub advanced: u32,
    pub arrived: u32,
    pub unpacked: u32,
    pub cancelled: u32,
}

/// Column march rate for a composition, clamped to the configured band.
///
/// Heavy equipment slows the column; a full infantry complement buys one
/// point back.
pub fn column_rate(composition: &FormationComposition) -> f64 {
    let cfg = config();
    let total = composition.total().max(1) as f64;
    let heavy =
        f64::from(composition.tanks) + f64::from(composition.artillery) + 0.5 * f64::from(composition.aa);
    let heavy_share = heavy / total;
    let infantry_bonus =
        (f64::from(composition.infantry) / cfg.infantry_bonus_threshold).clamp(0.0, 1.0);
    let rate = cfg.column_rate_base - (heavy_share * cfg.heavy_share_penalty).round() + infantry_bonus;
    rate.clamp(cfg.column_rate_min, cfg.column_rate_max).round()
}

/// Terrain-weighted cost of marching from one settlement to the next.
pub fn column_edge_cost(from: &Settlement, to: &Settlement) -> f64 {
    let cfg = config();
    let from_terrain = from.terrain_or_default();
    let to_terrain = to.terrain_or_default();

    let avg_road = (from_terrain.road_access_index + to_terrain.road_access_index) / 2.0;
    let avg_slope = (from_terrain.slope_index + to_terrain.slope_index) / 2.0;
    let avg_friction =
        (from_terrain.terrain_friction_index + to_terrain.terrain_friction_index) / 2.0;
    let max_river = from_terrain
        .river_crossing_penalty
        .max(to_terrain.river_crossing_penalty);
    let uphill = (to_terrain.elevation_mean_m - from_terrain.elevation_mean_m).max(0.0);

    1.0 + (1.0 - avg_road) * cfg.road_access_cost
        + avg_slope * cfg.slope_cost
        + avg_friction * cfg.terrain_friction_cost
        + max_river * cfg.river_crossing_cost
        + uphill / cfg.uphill_meters_per_point
}

/// Hop-shortest path through friendly-controlled settlements only.
///
/// Returns the full node path including both ends, or None when no goal
/// is reachable. Neighbor expansion follows sorted adjacency order and
/// goal membership is checked on push, so the result is stable.
pub fn path_through_friendly(
    start: &str,
    goals: &[SettlementId],
    faction: &str,
    adjacency: &AdjacencyIndex,
    controllers: &BTreeMap<SettlementId, Option<FactionId>>,
) -> Option<Vec<SettlementId>> {
    if !control_status(controllers, start).is_faction(faction) {
        return None;
    }
    let goal_set: BTreeSet<&str> = goals.iter().map(String::as_str).collect();
    if goal_set.contains(start) {
        return Some(vec![start.to_string()]);
    }

    let mut parents: AHashMap<&str, &str> = AHashMap::new();
    let mut visited: AHashSet<&str> = AHashSet::new();
    let mut frontier: VecDeque<&str> = VecDeque::new();
    visited.insert(start);
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        for neighbor in adjacency.neighbors(current) {
            let neighbor = neighbor.as_str();
            if visited.contains(neighbor)
                || !control_status(controllers, neighbor).is_faction(faction)
            {
                continue;
            }
            visited.insert(neighbor);
            parents.insert(neighbor, current);
            if goal_set.contains(neighbor) {
                let mut path = vec![neighbor.to_string()];
                let mut node = neighbor;
                while let Some(&parent) = parents.get(node) {
                    path.push(parent.to_string());
                    node = parent;
                }
                path.reverse();
                return Some(path);
            }
            frontier.push_back(neighbor);
        }
    }
    None
}

/// Turns a path will take for the given stance and composition.
///
/// Every node carrying battle damage adds one turn on top of the base
/// rate, whichever stance is marching.
pub fn transit_turns(
    path: &[SettlementId],
    stance: Stance,
    composition: &FormationComposition,
    settlements: &BTreeMap<SettlementId, Settlement>,
    battle_damage: &BTreeMap<SettlementId, u32>,
) -> u32 {
    let cfg = config();
    let steps = path.len().saturating_sub(1);

    let base = match stance {
        Stance::Combat => {
            let rate = f64::from(cfg.movement_rate.max(1));
            (steps as f64 / rate).ceil() as u32
        }
        Stance::Column => {
            let mut cost = 0.0;
            for pair in path.windows(2) {
                match (settlements.get(&pair[0]), settlements.get(&pair[1])) {
                    (Some(from), Some(to)) => cost += column_edge_cost(from, to),
                    _ => cost += 1.0,
                }
            }
            (cost / column_rate(composition)).ceil() as u32
        }
    };

    let damage_penalty = path
        .iter()
        .filter(|sid| battle_damage.get(sid.as_str()).copied().unwrap_or(0) > 0)
        .count() as u32;

    base.max(1) + damage_penalty
}

/// Runs deploy orders, movement intake and the advance state machine.
///
/// Both order maps are consumed: whatever the phase could not act on is
/// dropped rather than retried next turn.
pub fn process_movement(state: &mut GameState, adjacency: &AdjacencyIndex) -> MovementReport {
    let mut report = MovementReport::default();

    process_deploy_orders(state, &mut report);
    process_movement_orders(state, &mut report);
    advance_movement_states(state, adjacency, &mut report);

    state.movement_orders.clear();
    state.deploy_orders.clear();
    report
}

fn process_deploy_orders(state: &mut GameState, report: &mut MovementReport) {
    let orders: Vec<(FormationId, DeployOrder)> = state
        .deploy_orders
        .iter()
        .map(|(id, order)| (id.clone(), order.clone()))
        .collect();

    for (formation_id, order) in orders {
        let Some(formation) = state.formations.get(&formation_id) else {
            report.orders_ignored += 1;
            continue;
        };
        if !formation.is_active() || formation.kind != FormationKind::Brigade {
            report.orders_ignored += 1;
            continue;
        }

        match order.action {
            DeployAction::Undeploy => {
                let footprint = state.formation_footprint(formation);
                let hold = order
                    .hold_sid
                    .clone()
                    .or_else(|| formation.hq_sid.clone())
                    .or_else(|| footprint.first().cloned());
                let Some(hold) = hold else {
                    report.orders_ignored += 1;
                    continue;
                };
                // Collapse the spread-out footprint onto the hold point
                state
                    .formation_footprints
                    .retain(|_, fid| fid != &formation_id);
                state
                    .formation_footprints
                    .insert(hold.clone(), formation_id.clone());
                state.movement_states.insert(
                    formation_id.clone(),
                    MovementState {
                        status: MovementStatus::Packing,
                        destination_sids: vec![hold],
                        path: None,
                        turns_remaining: None,
                        stance: Stance::Column,
                    },
                );
                report.undeploys += 1;
            }
            DeployAction::Deploy => {
                // Only a column holding in place can deploy
                let Some(movement) = state.movement_states.get(&formation_id) else {
                    report.orders_ignored += 1;
                    continue;
                };
                if movement.status != MovementStatus::Packing
                    || movement.stance != Stance::Column
                {
                    report.orders_ignored += 1;
                    continue;
                }
                let hold = order
                    .hold_sid
                    .clone()
                    .or_else(|| movement.destination_sids.first().cloned());
                let Some(hold) = hold else {
                    report.orders_ignored += 1;
                    continue;
                };
                state.movement_states.insert(
                    formation_id.clone(),
                    MovementState {
                        status: MovementStatus::InTransit,
                        destination_sids: vec![hold],
                        path: None,
                        turns_remaining: Some(1),
                        stance: Stance::Combat,
                    },
                );
                report.deploys += 1;
            }
        }
    }
}

fn process_movement_orders(state: &mut GameState, report: &mut MovementReport) {
    let orders: Vec<(FormationId, MovementOrder)> = state
        .movement_orders
        .iter()
        .map(|(id, order)| (id.clone(), order.clone()))
        .collect();

    for (formation_id, order) in orders {
        let Some(formation) = state.formations.get(&formation_id) else {
            report.orders_ignored += 1;
            continue;
        };
        if !formation.is_active() || formation.kind != FormationKind::Brigade {
            report.orders_ignored += 1;
            continue;
        }
        if state
            .formation_encircled
            .get(&formation_id)
            .copied()
            .unwrap_or(false)
        {
            debug!(formation = %formation_id, "ignoring movement order for encircled formation");
            report.orders_ignored += 1;
            continue;
        }
        if order.destination_sids.is_empty() {
            report.orders_ignored += 1;
            continue;
        }
        let all_friendly = order.destination_sids.iter().all(|sid| {
            control_status(&state.political_controllers, sid).is_faction(&formation.faction)
        });
        if !all_friendly {
            debug!(formation = %formation_id, "ignoring movement order into non-friendly ground");
            report.orders_ignored += 1;
            continue;
        }

        let mut destinations = order.destination_sids.clone();
        destinations.sort();
        destinations.dedup();
        state.movement_states.insert(
            formation_id.clone(),
            MovementState {
                status: MovementStatus::Packing,
                destination_sids: destinations,
                path: None,
                turns_remaining: None,
                stance: order.stance,
            },
        );
        report.orders_accepted += 1;
    }
}

fn advance_movement_states(
    state: &mut GameState,
    adjacency: &AdjacencyIndex,
    report: &mut MovementReport,
) {
    let formation_ids: Vec<FormationId> = state.movement_states.keys().cloned().collect();

    for formation_id in formation_ids {
        let Some(movement) = state.movement_states.get(&formation_id).cloned() else {
            continue;
        };
        let Some(formation) = state.formations.get(&formation_id).cloned() else {
            state.movement_states.remove(&formation_id);
            report.cancelled += 1;
            continue;
        };

        match movement.status {
            MovementStatus::Packing => {
                let Some(position) = state.formation_footprint(&formation).first().cloned()
                else {
                    state.movement_states.remove(&formation_id);
                    report.cancelled += 1;
                    continue;
                };
                // A column sitting at its own hold point stays packed,
                // waiting for a deploy order
                if movement.stance == Stance::Column
                    && movement.destination_sids.len() == 1
                    && movement.destination_sids[0] == position
                {
                    continue;
                }
                let path = path_through_friendly(
                    &position,
                    &movement.destination_sids,
                    &formation.faction,
                    adjacency,
                    &state.political_controllers,
                );
                match path {
                    Some(path) if path.len() > 1 => {
                        let turns = transit_turns(
                            &path,
                            movement.stance,
                            &formation.composition,
                            &state.settlements,
                            &state.battle_damage,
                        );
                        state.movement_states.insert(
                            formation_id.clone(),
                            MovementState {
                                status: MovementStatus::InTransit,
                                destination_sids: movement.destination_sids.clone(),
                                path: Some(path),
                                turns_remaining: Some(turns),
                                stance: movement.stance,
                            },
                        );
                        report.advanced += 1;
                    }
                    _ => {
                        debug!(formation = %formation_id, "no usable path to destinations");
                        state.movement_states.remove(&formation_id);
                        report.cancelled += 1;
                    }
                }
            }
            MovementStatus::InTransit => {
                let remaining = movement.turns_remaining.unwrap_or(1).saturating_sub(1);
                if remaining > 0 {
                    if let Some(record) = state.movement_states.get_mut(&formation_id) {
                        record.turns_remaining = Some(remaining);
                    }
                    report.advanced += 1;
                } else {
                    // Arrival: the old footprint is surrendered and the
                    // destinations become the formation's ground
                    state
                        .formation_footprints
                        .retain(|_, fid| fid != &formation_id);
                    for sid in &movement.destination_sids {
                        state
                            .formation_footprints
                            .insert(sid.clone(), formation_id.clone());
                    }
                    if let Some(faction) = state.factions.get_mut(&formation.faction) {
                        for sid in &movement.destination_sids {
                            faction.add_aor(sid);
                        }
                    }
                    if let Some(record) = state.movement_states.get_mut(&formation_id) {
                        record.status = MovementStatus::Unpacking;
                        record.path = None;
                        record.turns_remaining = None;
                    }
                    report.arrived += 1;
                }
            }
            MovementStatus::Unpacking => {
                state.movement_states.remove(&formation_id);
                report.unpacked += 1;
            }
        }
    }
}
