//! Breach detection on accumulated pressure

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::config::config;
use crate::core::ids::EdgeId;
use crate::map::front::{FrontEdge, Side};
use crate::state::game_state::FrontPressure;

/// A front edge whose pressure has crossed the breach threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breach {
    pub edge_id: EdgeId,
    pub value: i64,
    pub favored_side: Side,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BreachReport {
    pub threshold: i64,
    /// Sorted by |value| descending, edge id ascending
    pub breaches: Vec<Breach>,
}

/// Filters the current front set down to breached edges.
///
/// Only edges contested this turn can breach; stale pressure on a front
/// that has moved elsewhere stays inert until the front returns.
pub fn detect_breaches(
    pressure: &BTreeMap<EdgeId, FrontPressure>,
    fronts: &[FrontEdge],
) -> BreachReport {
    let threshold = config().breach_threshold;
    let mut breaches: Vec<Breach> = Vec::new();

    for front in fronts {
        let Some(record) = pressure.get(&front.edge_id) else {
            continue;
        };
        if record.value.abs() < threshold {
            continue;
        }
        let favored_side = if record.value > 0 {
            Side::SideA
        } else {
            Side::SideB
        };
        breaches.push(Breach {
            edge_id: front.edge_id.clone(),
            value: record.value,
            favored_side,
        });
    }

    breaches.sort_by(|x, y| {
        y.value
            .abs()
            .cmp(&x.value.abs())
            .then(x.edge_id.cmp(&y.edge_id))
    });

    BreachReport { threshold, breaches }
}
