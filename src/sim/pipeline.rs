//! The turn pipeline
//!
//! One call runs every phase in fixed order against the shared state and
//! returns an immutable report. Which phases run depends on the campaign
//! era; the turn counter advances exactly once, at the end.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::StateError;
use crate::core::rng::rng_from_seed;
use crate::map::adjacency::AdjacencyIndex;
use crate::map::front::{derive_front_edges, sync_front_segments, FrontEdge, FrontSyncReport};
use crate::sim::breach::{detect_breaches, BreachReport};
use crate::sim::commitment::{
    apply_formation_commitment, update_formation_fatigue, CommitmentReport, EffectivePostures,
    FatigueReport,
};
use crate::sim::control::{apply_control_flips, propose_control_flips, ControlFlipReport};
use crate::sim::movement::{process_movement, MovementReport};
use crate::sim::pressure::{accumulate_front_pressure, PressureReport};
use crate::sim::supply::{compute_encirclement, resolve_supply, SupplyIndex, SupplyReport};
use crate::state::game_state::GameState;
use crate::state::militia::{update_militia_pools, MilitiaReport};
use crate::state::posture::{normalize_front_postures, PostureNormalizeReport};
use crate::state::serialize::state_digest;

pub const TURN_REPORT_SCHEMA: u32 = 1;

/// Canonical phase names in execution order.
pub const PHASE_NAMES: [&str; 11] = [
    "sync-front-segments",
    "normalize-postures",
    "formation-fatigue",
    "apply-formation-commitment",
    "accumulate-front-pressure",
    "detect-breaches",
    "resolve-control-flips",
    "supply-resolution",
    "process-movement",
    "militia-bookkeeping",
    "assemble-report",
];

/// Caller-facing input for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInput {
    /// Seed string for this turn's RNG stream
    pub seed: String,
}

impl TurnInput {
    pub fn new(seed: &str) -> Self {
        Self {
            seed: seed.to_string(),
        }
    }
}

/// Scratch shared between phases inside one turn.
///
/// Derived artifacts live here and die with the turn; nothing in this
/// struct may be written back into persistent state.
pub struct TurnContext {
    /// Turn RNG; phases draw from it in declaration order
    pub rng: ChaCha8Rng,
    pub fronts: Vec<FrontEdge>,
    pub effective_postures: Option<EffectivePostures>,
    pub supply: Option<SupplyIndex>,
}

impl TurnContext {
    fn new(seed: &str) -> Self {
        Self {
            rng: rng_from_seed(seed),
            fronts: Vec::new(),
            effective_postures: None,
            supply: None,
        }
    }
}

/// Immutable record of one executed turn.
///
/// Per-phase sections are present only for phases that actually ran, so
/// a pre-war report stays small.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnReport {
    pub schema: u32,
    pub seed: String,
    /// Turn number the input state carried, before the increment
    pub turn: u64,
    /// Executed phase names in order
    pub phases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_sync: Option<FrontSyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posture: Option<PostureNormalizeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatigue: Option<FatigueReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<CommitmentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<PressureReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaches: Option<BreachReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_flips: Option<ControlFlipReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply: Option<SupplyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<MovementReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub militia: Option<MilitiaReport>,
    /// Digest of the post-turn state
    pub state_digest: String,
}

/// Runs one full turn against the state.
///
/// Pre-war eras run only bookkeeping. War eras add fronts, pressure,
/// breaches, flips and supply; the formation era adds fatigue,
/// commitment and movement on top. Same state plus same seed yields a
/// byte-identical report and digest.
pub fn run_turn(state: &mut GameState, input: &TurnInput) -> Result<TurnReport, StateError> {
    let turn = state.meta.turn;
    let phase = state.meta.phase;
    let adjacency = AdjacencyIndex::build(&state.edges);
    let mut ctx = TurnContext::new(&input.seed);

    let mut report = TurnReport {
        schema: TURN_REPORT_SCHEMA,
        seed: input.seed.clone(),
        turn,
        ..Default::default()
    };

    if phase.is_war() {
        ctx.fronts = derive_front_edges(&state.edges, &state.political_controllers);
        debug!(turn, fronts = ctx.fronts.len(), "front set derived");
        report.front_sync = Some(sync_front_segments(
            &mut state.front_segments,
            &ctx.fronts,
            turn,
        ));
        report.phases.push(PHASE_NAMES[0].to_string());

        report.posture = Some(normalize_front_postures(
            &mut state.front_posture,
            &state.edges,
        ));
        report.phases.push(PHASE_NAMES[1].to_string());

        // Supply snapshot before any control changes; fatigue,
        // commitment and pressure all judge this turn's intent against
        // the ground held at the start of it
        let pre_flip_report = resolve_supply(
            &state.factions,
            &state.political_controllers,
            &adjacency,
            turn,
        );
        let pre_flip_supply = SupplyIndex::from_report(&pre_flip_report);

        if phase.has_formations() {
            report.fatigue = Some(update_formation_fatigue(
                state,
                &ctx.fronts,
                &pre_flip_supply,
            ));
            report.phases.push(PHASE_NAMES[2].to_string());

            let (commitment, effective) =
                apply_formation_commitment(state, &ctx.fronts, &pre_flip_supply);
            report.commitment = Some(commitment);
            ctx.effective_postures = Some(effective);
            report.phases.push(PHASE_NAMES[3].to_string());
        }

        report.pressure = Some(accumulate_front_pressure(
            &mut state.front_pressure,
            &ctx.fronts,
            &state.front_posture,
            ctx.effective_postures.as_ref(),
            &state.political_controllers,
            &pre_flip_supply,
            turn,
        ));
        report.phases.push(PHASE_NAMES[4].to_string());

        let breach_report = detect_breaches(&state.front_pressure, &ctx.fronts);
        report.phases.push(PHASE_NAMES[5].to_string());

        let mut flip_report = propose_control_flips(
            &breach_report.breaches,
            &ctx.fronts,
            &adjacency,
            &state.political_controllers,
            turn,
        );
        flip_report.applied = apply_control_flips(state, &flip_report.proposals);
        report.breaches = Some(breach_report);
        report.control_flips = Some(flip_report);
        report.phases.push(PHASE_NAMES[6].to_string());

        // Post-flip reachability is the authoritative picture for this
        // turn's report and for encirclement
        let supply_report = resolve_supply(
            &state.factions,
            &state.political_controllers,
            &adjacency,
            turn,
        );
        let post_flip_supply = SupplyIndex::from_report(&supply_report);
        state.formation_encircled = compute_encirclement(state, &post_flip_supply);
        ctx.supply = Some(post_flip_supply);
        report.supply = Some(supply_report);
        report.phases.push(PHASE_NAMES[7].to_string());

        if phase.has_formations() {
            report.movement = Some(process_movement(state, &adjacency));
            report.phases.push(PHASE_NAMES[8].to_string());
        }
    }

    report.militia = Some(update_militia_pools(
        &mut state.militia_pools,
        &state.formations,
        &state.settlements,
        turn,
    ));
    report.phases.push(PHASE_NAMES[9].to_string());

    state.meta.turn = turn + 1;
    report.state_digest = state_digest(state)?;
    report.phases.push(PHASE_NAMES[10].to_string());

    Ok(report)
}
