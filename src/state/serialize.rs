//! Canonical state serialization
//!
//! Persisted output is depth-first key-sorted JSON with a closed set of
//! top-level keys and no timestamps. Re-serializing an unchanged state
//! must reproduce the previous bytes exactly, which makes the digest a
//! cheap equality check between two states.

use serde_json::Value;

use crate::core::error::StateError;
use crate::core::rng::fnv64;
use crate::state::game_state::GameState;
use crate::state::validate::{check_raw_document, validate_game_state};

/// Serializes a state to its canonical byte form.
pub fn serialize_game_state(state: &GameState) -> Result<String, StateError> {
    validate_game_state(state).map_err(StateError::InvalidShape)?;
    let value = serde_json::to_value(state)?;
    check_raw_document(&value)?;
    Ok(value.to_string())
}

/// Parses a raw state document.
///
/// The unknown-key and derived-state checks run against the raw JSON
/// before typed deserialization, so a wrapper object or a leaked derived
/// artifact is a hard error rather than a silently dropped field.
pub fn parse_game_state(json: &str) -> Result<GameState, StateError> {
    let value: Value = serde_json::from_str(json)?;
    check_raw_document(&value)?;
    let state: GameState = serde_json::from_value(value)?;
    validate_game_state(&state).map_err(StateError::InvalidShape)?;
    Ok(state)
}

/// 64-bit FNV-1a digest of the canonical serialization, hex encoded.
pub fn state_digest(state: &GameState) -> Result<String, StateError> {
    let canonical = serialize_game_state(state)?;
    Ok(format!("{:016x}", fnv64(canonical.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::graph::Settlement;
    use crate::state::game_state::{Faction, GameState, Phase};

    fn small_state() -> GameState {
        let mut state = GameState::default();
        state.meta.phase = Phase::PhaseI;
        state
            .settlements
            .insert("a".to_string(), Settlement::new("a", "mun_1"));
        state
            .settlements
            .insert("b".to_string(), Settlement::new("b", "mun_1"));
        state.factions.insert(
            "red".to_string(),
            Faction::new("red").with_aor(&["a"]).with_supply_sources(&["a"]),
        );
        state
            .political_controllers
            .insert("a".to_string(), Some("red".to_string()));
        state.political_controllers.insert("b".to_string(), None);
        state
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let state = small_state();
        let first = serialize_game_state(&state).unwrap();
        let parsed = parse_game_state(&first).unwrap();
        let second = serialize_game_state(&parsed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_keys_emitted_in_sorted_order() {
        let json = serialize_game_state(&small_state()).unwrap();
        let battle_damage = json.find("\"battle_damage\"").unwrap();
        let meta = json.find("\"meta\"").unwrap();
        let settlements = json.find("\"settlements\"").unwrap();
        assert!(battle_damage < meta);
        assert!(meta < settlements);
    }

    #[test]
    fn test_unowned_controller_serialized_as_null() {
        let json = serialize_game_state(&small_state()).unwrap();
        assert!(json.contains("\"b\":null"));
    }

    #[test]
    fn test_parse_rejects_unknown_top_level_key() {
        let err = parse_game_state(r#"{"meta":{"turn":0,"phase":"phase_0"},"mystery":1}"#)
            .unwrap_err();
        assert!(matches!(err, StateError::UnknownTopLevelKey(key) if key == "mystery"));
    }

    #[test]
    fn test_parse_rejects_derived_state() {
        let err = parse_game_state(r#"{"meta":{"turn":0,"phase":"phase_0"},"breaches":[]}"#)
            .unwrap_err();
        assert!(matches!(err, StateError::DerivedKeyPersisted(key) if key == "breaches"));
    }

    #[test]
    fn test_digest_tracks_content() {
        let state = small_state();
        let digest_a = state_digest(&state).unwrap();
        let digest_b = state_digest(&state.clone()).unwrap();
        assert_eq!(digest_a, digest_b);
        assert_eq!(digest_a.len(), 16);

        let mut changed = state;
        changed.meta.turn = 1;
        assert_ne!(state_digest(&changed).unwrap(), digest_a);
    }
}
