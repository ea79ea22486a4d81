//! Municipal militia pools
//!
//! Reserve manpower is tracked per municipality and faction. The pipeline
//! only audits the counters and keeps `committed` in line with garrisons;
//! raising and spending militia belongs to the recruitment layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::ids::{FactionId, FormationId, SettlementId};
use crate::map::graph::Settlement;
use crate::state::game_state::{Formation, FormationKind};

/// Reserve manpower pool for one municipality and faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilitiaPool {
    pub mun_id: String,
    pub faction: FactionId,
    pub available: u32,
    pub committed: u32,
    pub exhausted: u32,
    pub updated_turn: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatigue: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Composite pool key, `"{mun_id}:{faction}"`.
pub fn militia_key(mun_id: &str, faction: &str) -> String {
    format!("{mun_id}:{faction}")
}

/// Validates one pool record against its key. Returns every problem found.
pub fn validate_pool(key: &str, pool: &MilitiaPool, current_turn: u64) -> Vec<String> {
    let mut errors = Vec::new();

    if key != militia_key(&pool.mun_id, &pool.faction) {
        errors.push(format!(
            "militia pool key {key} does not match {}:{}",
            pool.mun_id, pool.faction
        ));
    }
    if pool.updated_turn > current_turn {
        errors.push(format!(
            "militia pool {key} updated_turn {} is ahead of turn {current_turn}",
            pool.updated_turn
        ));
    }
    if let Some(tags) = &pool.tags {
        for tag in tags {
            if tag.is_empty() || tag.trim() != tag {
                errors.push(format!("militia pool {key} has a malformed tag {tag:?}"));
            }
        }
        if !tags.windows(2).all(|pair| pair[0] < pair[1]) {
            errors.push(format!("militia pool {key} tags are not sorted and unique"));
        }
    }

    errors
}

/// Counts from the militia bookkeeping phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MilitiaReport {
    pub pools_checked: u32,
    pub pools_invalid: u32,
    pub committed_updates: u32,
}

/// Audits every pool and re-derives `committed` from the garrisons
/// headquartered in the pool's municipality.
///
/// Invalid pools are reported and left untouched; `updated_turn` is only
/// stamped when a counter actually changes.
pub fn update_militia_pools(
    pools: &mut BTreeMap<String, MilitiaPool>,
    formations: &BTreeMap<FormationId, Formation>,
    settlements: &BTreeMap<SettlementId, Settlement>,
    turn: u64,
) -> MilitiaReport {
    let mut garrisons: BTreeMap<String, u32> = BTreeMap::new();
    for formation in formations.values() {
        if !formation.is_active() || formation.kind != FormationKind::Garrison {
            continue;
        }
        let Some(hq) = &formation.hq_sid else {
            continue;
        };
        let Some(settlement) = settlements.get(hq) else {
            continue;
        };
        *garrisons
            .entry(militia_key(&settlement.mun_id, &formation.faction))
            .or_default() += 1;
    }

    let mut report = MilitiaReport::default();
    for (key, pool) in pools.iter_mut() {
        report.pools_checked += 1;

        let problems = validate_pool(key, pool, turn);
        if !problems.is_empty() {
            for problem in &problems {
                debug!(%key, %problem, "militia pool failed validation");
            }
            report.pools_invalid += 1;
            continue;
        }

        let committed = garrisons.get(key).copied().unwrap_or(0);
        if pool.committed != committed {
            pool.committed = committed;
            pool.updated_turn = turn;
            report.committed_updates += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(mun_id: &str, faction: &str) -> MilitiaPool {
        MilitiaPool {
            mun_id: mun_id.to_string(),
            faction: faction.to_string(),
            available: 500,
            committed: 0,
            exhausted: 0,
            updated_turn: 0,
            fatigue: None,
            tags: None,
        }
    }

    #[test]
    fn test_key_mismatch_reported() {
        let problems = validate_pool("other:red", &pool("mun_1", "red"), 5);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("does not match"));
    }

    #[test]
    fn test_future_updated_turn_reported() {
        let mut record = pool("mun_1", "red");
        record.updated_turn = 9;
        let problems = validate_pool("mun_1:red", &record, 5);
        assert!(!problems.is_empty());
    }

    #[test]
    fn test_unsorted_tags_reported() {
        let mut record = pool("mun_1", "red");
        record.tags = Some(vec!["veteran".to_string(), "depleted".to_string()]);
        let problems = validate_pool("mun_1:red", &record, 5);
        assert!(problems.iter().any(|p| p.contains("sorted")));
    }

    #[test]
    fn test_committed_follows_garrisons() {
        let mut pools = BTreeMap::new();
        pools.insert("mun_1:red".to_string(), pool("mun_1", "red"));

        let mut settlements = BTreeMap::new();
        settlements.insert("a".to_string(), Settlement::new("a", "mun_1"));

        let mut formations = BTreeMap::new();
        formations.insert(
            "g1".to_string(),
            Formation::new("g1", "red", FormationKind::Garrison).with_hq("a"),
        );

        let report = update_militia_pools(&mut pools, &formations, &settlements, 3);
        assert_eq!(report.committed_updates, 1);
        let updated = &pools["mun_1:red"];
        assert_eq!(updated.committed, 1);
        assert_eq!(updated.updated_turn, 3);

        // Second pass with no change leaves the stamp alone
        let report = update_militia_pools(&mut pools, &formations, &settlements, 4);
        assert_eq!(report.committed_updates, 0);
        assert_eq!(pools["mun_1:red"].updated_turn, 3);
    }

    #[test]
    fn test_invalid_pool_left_untouched() {
        let mut pools = BTreeMap::new();
        pools.insert("wrong_key".to_string(), pool("mun_1", "red"));

        let report =
            update_militia_pools(&mut pools, &BTreeMap::new(), &BTreeMap::new(), 3);
        assert_eq!(report.pools_invalid, 1);
        assert_eq!(pools["wrong_key"].updated_turn, 0);
    }
}
