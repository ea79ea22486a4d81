//! Settlement graph of nodes and undirected edges
//!
//! The graph is static campaign input produced by the map ETL. Edges are
//! keyed by canonical id so the same settlement pair can never appear
//! twice under two spellings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::ids::{edge_id_for, EdgeId, SettlementId};

/// Per-settlement terrain scalars consumed by column movement costing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainScalars {
    /// 0..1, quality of road connections
    pub road_access_index: f64,
    /// 0..1, mean slope severity
    pub slope_index: f64,
    /// 0..1, ground difficulty beyond slope
    pub terrain_friction_index: f64,
    /// 0..1, river crossing severity on approaches
    pub river_crossing_penalty: f64,
    /// Mean elevation in meters
    pub elevation_mean_m: f64,
}

impl Default for TerrainScalars {
    fn default() -> Self {
        // Neutral ground: full road access, flat, dry
        Self {
            road_access_index: 1.0,
            slope_index: 0.0,
            terrain_friction_index: 0.0,
            river_crossing_penalty: 0.0,
            elevation_mean_m: 0.0,
        }
    }
}

/// A settlement node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub sid: SettlementId,
    /// Municipality the settlement belongs to
    pub mun_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<TerrainScalars>,
}

impl Settlement {
    pub fn new(sid: &str, mun_id: &str) -> Self {
        Self {
            sid: sid.to_string(),
            mun_id: mun_id.to_string(),
            name: None,
            terrain: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_terrain(mut self, terrain: TerrainScalars) -> Self {
        self.terrain = Some(terrain);
        self
    }

    /// Terrain scalars with the neutral fallback for unsurveyed ground.
    pub fn terrain_or_default(&self) -> TerrainScalars {
        self.terrain.unwrap_or_default()
    }
}

/// An undirected edge stored with canonical endpoint order (`a < b`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub a: SettlementId,
    pub b: SettlementId,
}

/// Counts from one graph construction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphLoadReport {
    pub settlements: usize,
    pub edges: usize,
    pub dropped_self_loops: usize,
    pub dropped_duplicate_edges: usize,
    pub dropped_unknown_endpoints: usize,
}

/// The settlement graph owning nodes and canonical edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementGraph {
    pub settlements: BTreeMap<SettlementId, Settlement>,
    pub edges: BTreeMap<EdgeId, EdgeRecord>,
}

impl SettlementGraph {
    /// Builds a graph from raw records.
    ///
    /// Self-loops, duplicate pairs and edges naming unknown settlements
    /// are dropped and counted rather than treated as fatal, so one bad
    /// ETL row cannot take the whole map down.
    pub fn from_records(
        settlements: Vec<Settlement>,
        raw_edges: Vec<(SettlementId, SettlementId)>,
    ) -> (Self, GraphLoadReport) {
        let mut report = GraphLoadReport::default();

        let mut nodes: BTreeMap<SettlementId, Settlement> = BTreeMap::new();
        for settlement in settlements {
            nodes.insert(settlement.sid.clone(), settlement);
        }
        report.settlements = nodes.len();

        let mut edges: BTreeMap<EdgeId, EdgeRecord> = BTreeMap::new();
        for (a, b) in raw_edges {
            if a == b {
                debug!(sid = %a, "dropping self-loop edge");
                report.dropped_self_loops += 1;
                continue;
            }
            if !nodes.contains_key(&a) || !nodes.contains_key(&b) {
                debug!(a = %a, b = %b, "dropping edge with unknown endpoint");
                report.dropped_unknown_endpoints += 1;
                continue;
            }
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let edge_id = edge_id_for(&lo, &hi);
            if edges.contains_key(&edge_id) {
                report.dropped_duplicate_edges += 1;
                continue;
            }
            edges.insert(edge_id, EdgeRecord { a: lo, b: hi });
        }
        report.edges = edges.len();

        (
            Self {
                settlements: nodes,
                edges,
            },
            report,
        )
    }

    pub fn settlement(&self, sid: &str) -> Option<&Settlement> {
        self.settlements.get(sid)
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.settlements.contains_key(sid)
    }

    /// Tears the graph into its maps for embedding into campaign state.
    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<SettlementId, Settlement>,
        BTreeMap<EdgeId, EdgeRecord>,
    ) {
        (self.settlements, self.edges)
    }
}
