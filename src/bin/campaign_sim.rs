//! Headless campaign runner
//!
//! Builds a two-faction valley scenario and drives the turn pipeline,
//! printing front activity per turn and a final territorial summary.

use clap::Parser;
use std::collections::BTreeMap;
use std::time::Instant;

use salient::core::config::{set_config, CampaignConfig};
use salient::core::ids::region_id_for;
use salient::core::CampaignError;
use salient::map::front::derive_front_edges;
use salient::map::graph::{Settlement, SettlementGraph, TerrainScalars};
use salient::sim::{run_turn, TurnInput};
use salient::state::game_state::{
    Assignment, Faction, Formation, FormationComposition, FormationKind, GameState, MovementOrder,
    Phase, Stance,
};
use salient::state::militia::{militia_key, MilitiaPool};
use salient::state::posture::{FactionPosture, Posture, PostureEntry};
use salient::state::serialize_game_state;

/// Headless campaign runner over a demo valley scenario
#[derive(Parser, Debug)]
#[command(name = "campaign_sim")]
#[command(about = "Run the deterministic campaign pipeline on a demo scenario")]
struct Args {
    /// Number of turns to simulate
    #[arg(long, default_value_t = 12)]
    turns: u32,

    /// Base seed; each turn derives its own stream from it
    #[arg(long, default_value = "campaign-demo")]
    seed: String,

    /// TOML file overriding the tuning defaults
    #[arg(long)]
    config: Option<String>,

    /// Print the final state document as canonical JSON
    #[arg(long)]
    dump_state: bool,

    /// Enable debug-level phase logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

const NORTH_ROW: [&str; 6] = ["arden", "briar", "calder", "dunmore", "elmsworth", "fenwick"];
const SOUTH_ROW: [&str; 6] = ["garrow", "hollis", "ingram", "jarrow", "kestrel", "larkin"];

/// A 2x6 ladder of settlements split between two factions.
///
/// Velt holds the western three columns, Kordia the eastern three, so the
/// campaign opens with four contested edges down the middle rungs.
fn demo_scenario() -> GameState {
    let mut settlements = Vec::new();
    for (column, (&north, &south)) in NORTH_ROW.iter().zip(SOUTH_ROW.iter()).enumerate() {
        let mun = if column < 3 { "west-valley" } else { "east-ridge" };
        settlements.push(Settlement::new(north, mun).with_name(&title_case(north)));
        settlements.push(
            Settlement::new(south, mun)
                .with_name(&title_case(south))
                .with_terrain(TerrainScalars {
                    road_access_index: 0.6,
                    slope_index: 0.4,
                    terrain_friction_index: 0.2,
                    river_crossing_penalty: 0.0,
                    elevation_mean_m: 350.0,
                }),
        );
    }

    let mut raw_edges = Vec::new();
    for window in NORTH_ROW.windows(2) {
        raw_edges.push((window[0].to_string(), window[1].to_string()));
    }
    for window in SOUTH_ROW.windows(2) {
        raw_edges.push((window[0].to_string(), window[1].to_string()));
    }
    for (&north, &south) in NORTH_ROW.iter().zip(SOUTH_ROW.iter()) {
        raw_edges.push((north.to_string(), south.to_string()));
    }

    let (graph, load_report) = SettlementGraph::from_records(settlements, raw_edges);
    let dropped = load_report.dropped_self_loops
        + load_report.dropped_duplicate_edges
        + load_report.dropped_unknown_endpoints;
    println!(
        "Built valley map: {} settlements, {} edges ({} records dropped)\n",
        load_report.settlements, load_report.edges, dropped
    );

    let mut state = GameState::new(Phase::PhaseII, graph);

    let velt_ground: Vec<&str> = NORTH_ROW[..3]
        .iter()
        .chain(SOUTH_ROW[..3].iter())
        .copied()
        .collect();
    let kordia_ground: Vec<&str> = NORTH_ROW[3..]
        .iter()
        .chain(SOUTH_ROW[3..].iter())
        .copied()
        .collect();
    for sid in &velt_ground {
        state
            .political_controllers
            .insert(sid.to_string(), Some("velt".to_string()));
    }
    for sid in &kordia_ground {
        state
            .political_controllers
            .insert(sid.to_string(), Some("kordia".to_string()));
    }

    state.factions.insert(
        "velt".to_string(),
        Faction::new("velt")
            .with_aor(&velt_ground)
            .with_supply_sources(&["arden"]),
    );
    state.factions.insert(
        "kordia".to_string(),
        Faction::new("kordia")
            .with_aor(&kordia_ground)
            .with_supply_sources(&["larkin"]),
    );

    let contested = region_id_for("velt", "kordia");
    let formations = [
        Formation::new("1st-valley-brigade", "velt", FormationKind::Brigade)
            .with_hq("calder")
            .with_assignment(Assignment::Region {
                region_id: contested.clone(),
            })
            .with_composition(FormationComposition {
                infantry: 2400,
                tanks: 120,
                artillery: 60,
                aa: 30,
            }),
        Formation::new("2nd-valley-brigade", "velt", FormationKind::Brigade)
            .with_hq("briar")
            .with_composition(FormationComposition {
                infantry: 1800,
                tanks: 40,
                artillery: 30,
                aa: 20,
            }),
        Formation::new("arden-garrison", "velt", FormationKind::Garrison)
            .with_hq("arden")
            .with_composition(FormationComposition {
                infantry: 400,
                tanks: 0,
                artillery: 0,
                aa: 0,
            }),
        Formation::new("guards-brigade", "kordia", FormationKind::Brigade)
            .with_hq("dunmore")
            .with_assignment(Assignment::Region {
                region_id: contested.clone(),
            })
            .with_composition(FormationComposition {
                infantry: 2000,
                tanks: 200,
                artillery: 90,
                aa: 40,
            }),
        Formation::new("ridge-brigade", "kordia", FormationKind::Brigade)
            .with_hq("jarrow")
            .with_assignment(Assignment::Region {
                region_id: contested,
            })
            .with_composition(FormationComposition {
                infantry: 1600,
                tanks: 60,
                artillery: 45,
                aa: 25,
            }),
    ];
    for formation in formations {
        state.formations.insert(formation.id.clone(), formation);
    }

    state.militia_pools.insert(
        militia_key("west-valley", "velt"),
        MilitiaPool {
            mun_id: "west-valley".to_string(),
            faction: "velt".to_string(),
            available: 1200,
            committed: 0,
            exhausted: 0,
            updated_turn: 0,
            fatigue: None,
            tags: None,
        },
    );
    state.militia_pools.insert(
        militia_key("east-ridge", "kordia"),
        MilitiaPool {
            mun_id: "east-ridge".to_string(),
            faction: "kordia".to_string(),
            available: 900,
            committed: 0,
            exhausted: 0,
            updated_turn: 0,
            fatigue: None,
            tags: None,
        },
    );

    state
}

fn title_case(sid: &str) -> String {
    let mut chars = sid.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Re-issues posture orders against the current front set.
///
/// Velt presses everywhere it touches a front; Kordia screens. The
/// asymmetry is what makes the demo's front actually move.
fn issue_posture_orders(state: &mut GameState) {
    let fronts = derive_front_edges(&state.edges, &state.political_controllers);
    let mut velt = BTreeMap::new();
    let mut kordia = BTreeMap::new();
    for front in &fronts {
        if front.has_side("velt") {
            velt.insert(
                front.edge_id.clone(),
                PostureEntry {
                    posture: Posture::Push,
                    weight: 2,
                },
            );
        }
        if front.has_side("kordia") {
            kordia.insert(
                front.edge_id.clone(),
                PostureEntry {
                    posture: Posture::Probe,
                    weight: 1,
                },
            );
        }
    }
    state
        .front_posture
        .insert("velt".to_string(), FactionPosture { assignments: velt });
    state.front_posture.insert(
        "kordia".to_string(),
        FactionPosture {
            assignments: kordia,
        },
    );
}

fn faction_holdings(state: &GameState) -> BTreeMap<String, u32> {
    let mut holdings: BTreeMap<String, u32> = BTreeMap::new();
    for controller in state.political_controllers.values().flatten() {
        *holdings.entry(controller.clone()).or_insert(0) += 1;
    }
    holdings
}

fn load_config(path: &str) -> salient::core::Result<CampaignConfig> {
    let raw = std::fs::read_to_string(path)?;
    CampaignConfig::from_toml_str(&raw).map_err(CampaignError::Config)
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    if let Some(path) = &args.config {
        let config = load_config(path).expect("Failed to load config file");
        set_config(config).expect("Config already set");
        println!("Loaded tuning config from {}\n", path);
    }

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            SALIENT: VALLEY CAMPAIGN SIMULATION               ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let mut state = demo_scenario();

    println!("Opening positions:");
    for (faction, count) in faction_holdings(&state) {
        println!("  {}: {} settlements", faction, count);
    }
    println!();

    let sim_start = Instant::now();
    let mut total_breaches = 0usize;
    let mut total_flips = 0u32;
    let mut total_arrivals = 0u32;

    for turn in 0..args.turns {
        issue_posture_orders(&mut state);

        // Reposition the reserve once the opening pushes are underway
        if turn == 2 {
            state.movement_orders.insert(
                "2nd-valley-brigade".to_string(),
                MovementOrder {
                    destination_sids: vec!["calder".to_string()],
                    stance: Stance::Column,
                },
            );
            println!("Turn {:>2}: 2nd Valley Brigade ordered to Calder by road", turn);
        }

        let input = TurnInput::new(&format!("{}:{}", args.seed, turn));
        let report = run_turn(&mut state, &input).expect("Turn pipeline failed");

        let fronts = report
            .pressure
            .as_ref()
            .map(|p| p.edges_considered)
            .unwrap_or(0);
        print!("Turn {:>2}: {} front edges", report.turn, fronts);
        if let Some(movement) = &report.movement {
            if movement.arrived > 0 {
                print!(", {} formation(s) arrived", movement.arrived);
                total_arrivals += movement.arrived;
            }
        }
        println!();

        if let Some(breaches) = &report.breaches {
            for breach in &breaches.breaches {
                println!(
                    "         breach on {} (pressure {:+})",
                    breach.edge_id, breach.value
                );
                total_breaches += 1;
            }
        }
        if let Some(flips) = &report.control_flips {
            for proposal in &flips.proposals {
                for target in &proposal.targets {
                    let loser = target.from.as_deref().unwrap_or("no one");
                    println!(
                        "         {} falls to {} (taken from {})",
                        target.sid, target.to, loser
                    );
                }
            }
            total_flips += flips.applied;
        }
    }

    let elapsed = sim_start.elapsed();

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("                     CAMPAIGN COMPLETE");
    println!("═══════════════════════════════════════════════════════════════\n");

    println!("Final holdings:");
    for (faction, count) in faction_holdings(&state) {
        println!("  {}: {} settlements", faction, count);
    }

    println!("\nFormation status:");
    for formation in state.formations.values() {
        let hq = formation.hq_sid.as_deref().unwrap_or("-");
        println!(
            "  {} ({}) hq {} fatigue {}",
            formation.id, formation.faction, hq, formation.ops.fatigue
        );
    }

    println!("\nStatistics:");
    println!("  Turns simulated: {}", args.turns);
    println!("  Breaches: {}", total_breaches);
    println!("  Settlements flipped: {}", total_flips);
    println!("  Movement arrivals: {}", total_arrivals);
    println!("  Final turn counter: {}", state.meta.turn);
    println!("  Simulation time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);

    let digest = salient::state::state_digest(&state).expect("Digest failed");
    println!("  State digest: {}", digest);

    if args.dump_state {
        let json = serialize_game_state(&state).expect("Serialization failed");
        println!("\n{}", json);
    }
}
