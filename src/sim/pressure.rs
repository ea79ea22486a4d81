//! Front pressure accumulation
//!
//! Each turn both sides of every front edge convert posture into intent;
//! the clamped difference moves the edge's persistent pressure value.
//! Positive pressure favors the side holding endpoint `a`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::config::config;
use crate::core::ids::{EdgeId, FactionId, SettlementId};
use crate::map::front::FrontEdge;
use crate::sim::commitment::EffectivePostures;
use crate::sim::supply::{side_locally_supplied, SupplyIndex};
use crate::state::game_state::FrontPressure;
use crate::state::posture::FactionPosture;

/// One edge's pressure movement this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PressureDelta {
    pub edge_id: EdgeId,
    pub delta: i64,
    pub value: i64,
}

/// Local supply verdict for both sides of one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeLocalSupply {
    pub edge_id: EdgeId,
    pub side_a_supplied: bool,
    pub side_b_supplied: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PressureReport {
    pub edges_considered: u32,
    pub edges_with_any_unsupplied_side: u32,
    pub pressure_deltas: Vec<PressureDelta>,
    pub local_supply: Vec<EdgeLocalSupply>,
}

/// Intent one side generates on an edge.
///
/// With commitment in play the effective weight replaces the declared
/// one; without it (no formations in this era) the declared weight counts
/// as fully backed.
fn side_intent(
    faction: Option<&FactionId>,
    edge_id: &str,
    postures: &BTreeMap<FactionId, FactionPosture>,
    effective: Option<&EffectivePostures>,
) -> u64 {
    let Some(faction) = faction else {
        return 0;
    };
    let Some(entry) = postures
        .get(faction)
        .and_then(|posture| posture.assignments.get(edge_id))
    else {
        return 0;
    };
    let weight = match effective {
        Some(effective) => effective
            .get(edge_id)
            .and_then(|weights| weights.get(faction))
            .copied()
            .unwrap_or(0),
        None => entry.weight,
    };
    u64::from(weight) * entry.posture.multiplier()
}

/// Halves intent for an unsupplied side, floor division.
fn scaled_by_supply(intent: u64, supplied: bool) -> u64 {
    let numerator = if supplied { 2 } else { 1 };
    intent * numerator / 2
}

/// Accumulates pressure on every current front edge.
///
/// Records are created on first contact and never deleted here; `max_abs`
/// is monotonic and `last_updated_turn` is stamped on every touch.
pub fn accumulate_front_pressure(
    pressure: &mut BTreeMap<EdgeId, FrontPressure>,
    fronts: &[FrontEdge],
    postures: &BTreeMap<FactionId, FactionPosture>,
    effective: Option<&EffectivePostures>,
    controllers: &BTreeMap<SettlementId, Option<FactionId>>,
    supply: &SupplyIndex,
    turn: u64,
) -> PressureReport {
    let cfg = config();
    let mut report = PressureReport::default();

    for front in fronts {
        report.edges_considered += 1;

        let supplied_a = front
            .side_a
            .as_ref()
            .map(|faction| side_locally_supplied(front, faction, controllers, supply))
            .unwrap_or(false);
        let supplied_b = front
            .side_b
            .as_ref()
            .map(|faction| side_locally_supplied(front, faction, controllers, supply))
            .unwrap_or(false);

        let intent_a = scaled_by_supply(
            side_intent(front.side_a.as_ref(), &front.edge_id, postures, effective),
            supplied_a,
        );
        let intent_b = scaled_by_supply(
            side_intent(front.side_b.as_ref(), &front.edge_id, postures, effective),
            supplied_b,
        );

        let delta = (intent_a as i64 - intent_b as i64)
            .clamp(-cfg.pressure_delta_clamp, cfg.pressure_delta_clamp);

        let record = pressure
            .entry(front.edge_id.clone())
            .or_insert_with(|| FrontPressure {
                edge_id: front.edge_id.clone(),
                value: 0,
                max_abs: 0,
                last_updated_turn: turn,
            });
        record.value += delta;
        record.max_abs = record.max_abs.max(record.value.abs());
        record.last_updated_turn = turn;

        if (front.side_a.is_some() && !supplied_a) || (front.side_b.is_some() && !supplied_b) {
            report.edges_with_any_unsupplied_side += 1;
        }

        report.pressure_deltas.push(PressureDelta {
            edge_id: front.edge_id.clone(),
            delta,
            value: record.value,
        });
        report.local_supply.push(EdgeLocalSupply {
            edge_id: front.edge_id.clone(),
            side_a_supplied: supplied_a,
            side_b_supplied: supplied_b,
        });
    }

    report
}
