//! State shape validation at the serialization boundary
//!
//! Raw documents are checked before typed deserialization so wrapper
//! objects and derived-state leaks fail loudly instead of being silently
//! dropped by serde defaults. Typed states are checked again for the
//! invariants serde cannot express.

use serde_json::Value;

use crate::core::error::StateError;
use crate::core::ids::edge_id_for;
use crate::state::game_state::GameState;
use crate::state::militia::validate_pool;

/// Top-level keys a persisted state document may carry.
pub const GAMESTATE_TOP_LEVEL_KEYS: [&str; 16] = [
    "battle_damage",
    "deploy_orders",
    "edges",
    "factions",
    "formation_encircled",
    "formation_footprints",
    "formations",
    "front_posture",
    "front_pressure",
    "front_segments",
    "meta",
    "militia_pools",
    "movement_orders",
    "movement_states",
    "political_controllers",
    "settlements",
];

/// Derived artifacts that must never appear in persisted state.
pub const DERIVED_STATE_DENYLIST: [&str; 8] = [
    "breaches",
    "cache",
    "control_flip_proposals",
    "corridors",
    "derived",
    "front_edges",
    "fronts",
    "supply_reachability",
];

/// Rejects raw documents with unknown or denylisted top-level keys.
pub fn check_raw_document(document: &Value) -> Result<(), StateError> {
    let Some(map) = document.as_object() else {
        return Err(StateError::NotAnObject);
    };
    for key in map.keys() {
        if DERIVED_STATE_DENYLIST.contains(&key.as_str()) {
            return Err(StateError::DerivedKeyPersisted(key.clone()));
        }
        if !GAMESTATE_TOP_LEVEL_KEYS.contains(&key.as_str()) {
            return Err(StateError::UnknownTopLevelKey(key.clone()));
        }
    }
    if !map.contains_key("meta") {
        return Err(StateError::InvalidShape(vec!["meta is required".to_string()]));
    }
    Ok(())
}

/// Validates a typed state's internal invariants.
///
/// Collects every problem found rather than stopping at the first, so a
/// corrupt save surfaces its whole damage in one pass.
pub fn validate_game_state(state: &GameState) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (edge_id, edge) in &state.edges {
        if edge.a >= edge.b {
            errors.push(format!(
                "edge {edge_id} endpoints out of canonical order: {} / {}",
                edge.a, edge.b
            ));
        } else if *edge_id != edge_id_for(&edge.a, &edge.b) {
            errors.push(format!(
                "edge key {edge_id} does not match endpoints {} / {}",
                edge.a, edge.b
            ));
        }
    }

    for (id, faction) in &state.factions {
        if id != &faction.id {
            errors.push(format!("faction key {id} does not match id {}", faction.id));
        }
        if !is_sorted_unique(&faction.areas_of_responsibility) {
            errors.push(format!(
                "faction {id} areas_of_responsibility not sorted and unique"
            ));
        }
        if !is_sorted_unique(&faction.supply_sources) {
            errors.push(format!("faction {id} supply_sources not sorted and unique"));
        }
    }

    for (id, formation) in &state.formations {
        if id != &formation.id {
            errors.push(format!(
                "formation key {id} does not match id {}",
                formation.id
            ));
        }
        if formation.cohesion > 100 {
            errors.push(format!(
                "formation {id} cohesion {} out of range",
                formation.cohesion
            ));
        }
        if !state.factions.contains_key(&formation.faction) {
            errors.push(format!(
                "formation {id} belongs to unknown faction {}",
                formation.faction
            ));
        }
    }

    for (sid, controller) in &state.political_controllers {
        if !state.settlements.contains_key(sid) {
            errors.push(format!("political controller for unknown settlement {sid}"));
        }
        if let Some(faction) = controller {
            if !state.factions.contains_key(faction) {
                errors.push(format!(
                    "settlement {sid} controlled by unknown faction {faction}"
                ));
            }
        }
    }

    for (edge_id, pressure) in &state.front_pressure {
        if edge_id != &pressure.edge_id {
            errors.push(format!(
                "front pressure key {edge_id} does not match edge_id {}",
                pressure.edge_id
            ));
        }
        if pressure.max_abs < pressure.value.abs() {
            errors.push(format!(
                "front pressure {edge_id} max_abs {} below |value| {}",
                pressure.max_abs,
                pressure.value.abs()
            ));
        }
    }

    for (edge_id, segment) in &state.front_segments {
        if edge_id != &segment.edge_id {
            errors.push(format!(
                "front segment key {edge_id} does not match edge_id {}",
                segment.edge_id
            ));
        }
    }

    for (key, pool) in &state.militia_pools {
        errors.extend(validate_pool(key, pool, state.meta.turn));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_sorted_unique(items: &[String]) -> bool {
    items.windows(2).all(|pair| pair[0] < pair[1])
}
