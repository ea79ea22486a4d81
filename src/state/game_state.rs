//! Persistent campaign state
//!
//! One aggregate owns everything that survives across turns. Collections
//! are ordered maps throughout, so canonical serialization falls straight
//! out of the type shapes instead of needing a sort pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::ids::{EdgeId, FactionId, FormationId, SettlementId};
use crate::map::front::FrontSegment;
use crate::map::graph::{EdgeRecord, Settlement, SettlementGraph};
use crate::state::militia::MilitiaPool;
use crate::state::posture::{FactionPosture, Posture};

/// Campaign era gating the turn pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Pre-war: only bookkeeping runs
    #[default]
    #[serde(rename = "phase_0")]
    Phase0,
    /// Open war fought with posture orders alone
    #[serde(rename = "phase_i")]
    PhaseI,
    /// Open war with formations, commitment and movement
    #[serde(rename = "phase_ii")]
    PhaseII,
}

impl Phase {
    /// Front, pressure, breach and control phases run here.
    pub fn is_war(&self) -> bool {
        matches!(self, Phase::PhaseI | Phase::PhaseII)
    }

    /// Fatigue, commitment and movement run here.
    pub fn has_formations(&self) -> bool {
        matches!(self, Phase::PhaseII)
    }
}

/// Turn counter and campaign era.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMeta {
    pub turn: u64,
    pub phase: Phase,
}

/// A faction and the territory it answers for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    /// Sorted, deduplicated settlements this faction is responsible for
    pub areas_of_responsibility: Vec<SettlementId>,
    /// Sorted settlements it draws supply from
    pub supply_sources: Vec<SettlementId>,
    /// Total effective weight the faction can direct; 0 means unlimited
    #[serde(default)]
    pub command_capacity: u64,
}

impl Faction {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            areas_of_responsibility: Vec::new(),
            supply_sources: Vec::new(),
            command_capacity: 0,
        }
    }

    pub fn with_aor(mut self, sids: &[&str]) -> Self {
        self.areas_of_responsibility = sorted_unique(sids);
        self
    }

    pub fn with_supply_sources(mut self, sids: &[&str]) -> Self {
        self.supply_sources = sorted_unique(sids);
        self
    }

    pub fn with_command_capacity(mut self, capacity: u64) -> Self {
        self.command_capacity = capacity;
        self
    }

    /// Inserts a settlement keeping the array sorted and unique.
    pub fn add_aor(&mut self, sid: &str) {
        if let Err(pos) = self
            .areas_of_responsibility
            .binary_search_by(|s| s.as_str().cmp(sid))
        {
            self.areas_of_responsibility.insert(pos, sid.to_string());
        }
    }

    /// Removes a settlement if present.
    pub fn remove_aor(&mut self, sid: &str) {
        if let Ok(pos) = self
            .areas_of_responsibility
            .binary_search_by(|s| s.as_str().cmp(sid))
        {
            self.areas_of_responsibility.remove(pos);
        }
    }

    pub fn has_in_aor(&self, sid: &str) -> bool {
        self.areas_of_responsibility
            .binary_search_by(|s| s.as_str().cmp(sid))
            .is_ok()
    }
}

fn sorted_unique(sids: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = sids.iter().map(|s| s.to_string()).collect();
    out.sort();
    out.dedup();
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationKind {
    /// Maneuver formation, the only kind that moves
    Brigade,
    /// Static formation tied to its headquarters municipality
    Garrison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationStatus {
    Active,
    Forming,
    Destroyed,
}

/// Where a formation directs its commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignment {
    Edge { edge_id: EdgeId },
    Region { region_id: String },
}

/// Manpower and equipment mix; drives the column march rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationComposition {
    pub infantry: u32,
    pub tanks: u32,
    pub artillery: u32,
    pub aa: u32,
}

impl FormationComposition {
    pub fn total(&self) -> u32 {
        self.infantry + self.tanks + self.artillery + self.aa
    }
}

/// Mutable per-formation operational counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationOps {
    pub fatigue: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_supplied_turn: Option<u64>,
}

/// A military formation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub id: FormationId,
    pub faction: FactionId,
    pub kind: FormationKind,
    pub status: FormationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Assignment>,
    /// Default stance, consumed by the battle layer
    pub posture: Posture,
    /// 0..=100 combat readiness, consumed by the battle layer
    pub cohesion: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hq_sid: Option<SettlementId>,
    #[serde(default)]
    pub composition: FormationComposition,
    #[serde(default)]
    pub ops: FormationOps,
}

impl Formation {
    pub fn new(id: &str, faction: &str, kind: FormationKind) -> Self {
        Self {
            id: id.to_string(),
            faction: faction.to_string(),
            kind,
            status: FormationStatus::Active,
            assignment: None,
            posture: Posture::Hold,
            cohesion: 100,
            hq_sid: None,
            composition: FormationComposition::default(),
            ops: FormationOps::default(),
        }
    }

    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignment = Some(assignment);
        self
    }

    pub fn with_hq(mut self, sid: &str) -> Self {
        self.hq_sid = Some(sid.to_string());
        self
    }

    pub fn with_composition(mut self, composition: FormationComposition) -> Self {
        self.composition = composition;
        self
    }

    pub fn with_status(mut self, status: FormationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == FormationStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Packing,
    InTransit,
    Unpacking,
}

/// How a formation travels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Deployed and fighting-ready, slow
    #[default]
    Combat,
    /// Road column, fast and fragile
    Column,
}

/// Pack / transit / unpack record for one moving formation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementState {
    pub status: MovementStatus,
    /// Sorted target settlements
    pub destination_sids: Vec<SettlementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<SettlementId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turns_remaining: Option<u32>,
    #[serde(default)]
    pub stance: Stance,
}

/// Destination order for one formation, consumed by the movement phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrder {
    pub destination_sids: Vec<SettlementId>,
    #[serde(default)]
    pub stance: Stance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployAction {
    Deploy,
    Undeploy,
}

/// Deploy or undeploy order for one formation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOrder {
    pub action: DeployAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_sid: Option<SettlementId>,
}

/// Accumulated directional pressure on one front edge.
///
/// Positive values favor the side holding endpoint `a`. `max_abs` only
/// ever grows, recording the worst the edge has seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontPressure {
    pub edge_id: EdgeId,
    pub value: i64,
    pub max_abs: i64,
    pub last_updated_turn: u64,
}

/// Control status of a settlement.
///
/// A settlement absent from political_controllers has unknown status; a
/// present null means known and unowned. The two must never be conflated,
/// so lookups go through this enum instead of a bare nested Option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus<'a> {
    Unknown,
    Known(Option<&'a FactionId>),
}

impl ControlStatus<'_> {
    pub fn is_known(&self) -> bool {
        matches!(self, ControlStatus::Known(_))
    }

    pub fn is_faction(&self, faction: &str) -> bool {
        matches!(self, ControlStatus::Known(Some(f)) if f.as_str() == faction)
    }
}

/// Looks up a settlement's control status.
pub fn control_status<'a>(
    controllers: &'a BTreeMap<SettlementId, Option<FactionId>>,
    sid: &str,
) -> ControlStatus<'a> {
    match controllers.get(sid) {
        None => ControlStatus::Unknown,
        Some(controller) => ControlStatus::Known(controller.as_ref()),
    }
}

/// Everything that persists across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub meta: GameMeta,
    #[serde(default)]
    pub settlements: BTreeMap<SettlementId, Settlement>,
    #[serde(default)]
    pub edges: BTreeMap<EdgeId, EdgeRecord>,
    /// Known control per settlement; None values are serialized as null
    #[serde(default)]
    pub political_controllers: BTreeMap<SettlementId, Option<FactionId>>,
    #[serde(default)]
    pub factions: BTreeMap<FactionId, Faction>,
    #[serde(default)]
    pub formations: BTreeMap<FormationId, Formation>,
    #[serde(default)]
    pub front_posture: BTreeMap<FactionId, FactionPosture>,
    #[serde(default)]
    pub front_segments: BTreeMap<EdgeId, FrontSegment>,
    #[serde(default)]
    pub front_pressure: BTreeMap<EdgeId, FrontPressure>,
    #[serde(default)]
    pub movement_states: BTreeMap<FormationId, MovementState>,
    #[serde(default)]
    pub movement_orders: BTreeMap<FormationId, MovementOrder>,
    #[serde(default)]
    pub deploy_orders: BTreeMap<FormationId, DeployOrder>,
    /// Settlement to occupying formation; one formation may hold many
    #[serde(default)]
    pub formation_footprints: BTreeMap<SettlementId, FormationId>,
    #[serde(default)]
    pub militia_pools: BTreeMap<String, MilitiaPool>,
    /// Damage level per settlement; any nonzero value slows transit
    #[serde(default)]
    pub battle_damage: BTreeMap<SettlementId, u32>,
    #[serde(default)]
    pub formation_encircled: BTreeMap<FormationId, bool>,
}

impl GameState {
    /// Fresh state at turn 0 in the given era, owning the graph.
    pub fn new(phase: Phase, graph: SettlementGraph) -> Self {
        let (settlements, edges) = graph.into_parts();
        Self {
            meta: GameMeta { turn: 0, phase },
            settlements,
            edges,
            ..Default::default()
        }
    }

    pub fn control_of(&self, sid: &str) -> ControlStatus<'_> {
        control_status(&self.political_controllers, sid)
    }

    /// Sorted settlement footprint of a formation, `hq_sid` fallback.
    pub fn formation_footprint(&self, formation: &Formation) -> Vec<SettlementId> {
        let mut sids: Vec<SettlementId> = self
            .formation_footprints
            .iter()
            .filter(|(_, fid)| fid.as_str() == formation.id)
            .map(|(sid, _)| sid.clone())
            .collect();
        if sids.is_empty() {
            if let Some(hq) = &formation.hq_sid {
                sids.push(hq.clone());
            }
        }
        sids
    }
}
