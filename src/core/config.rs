//! Campaign configuration with documented constants
//!
//! All tuning values are collected here with explanations of their purpose
//! and how they interact with each other.

use serde::{Deserialize, Serialize};

/// Configuration for the campaign systems
///
/// These values have been tuned so that a sustained offensive takes a few
/// turns to break a front. Changing them shifts campaign pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    // === FRONT PRESSURE ===
    /// Absolute pressure at which a front edge breaches
    ///
    /// Must exceed pressure_delta_clamp, otherwise a single turn could
    /// open a breach. At 12 an unopposed push of weight 3 (intent 6)
    /// breaches in two turns, four when the attacker is unsupplied.
    pub breach_threshold: i64,

    /// Largest single-turn pressure swing on one edge
    ///
    /// Clamping keeps one overloaded edge from jumping straight past the
    /// breach threshold no matter how much weight lands on it.
    pub pressure_delta_clamp: i64,

    /// Intent multiplier for hold posture
    pub hold_multiplier: u64,

    /// Intent multiplier for probe posture
    pub probe_multiplier: u64,

    /// Intent multiplier for push posture
    pub push_multiplier: u64,

    /// Upper bound on a single posture assignment weight
    pub max_posture_weight: u32,

    // === FORMATION COMMITMENT ===
    /// Milli-points one supplied formation contributes per turn
    ///
    /// One point of posture weight needs this many milli-points behind
    /// it to count in full, so one formation backs one weight point.
    pub commit_base_points: u64,

    /// Milli-points removed per point of accumulated fatigue
    ///
    /// At 50, twenty turns of fatigue erase a supplied formation's
    /// entire contribution.
    pub fatigue_commit_penalty: u64,

    // === MOVEMENT ===
    /// Settlements crossed per turn in combat stance
    pub movement_rate: u32,

    /// Column march rate before composition adjustments
    pub column_rate_base: f64,

    /// Lower clamp on the column march rate
    pub column_rate_min: f64,

    /// Upper clamp on the column march rate
    pub column_rate_max: f64,

    /// Infantry count that earns the full +1 column rate bonus
    pub infantry_bonus_threshold: f64,

    /// Column rate penalty scale applied to the heavy-equipment share
    pub heavy_share_penalty: f64,

    // === COLUMN TERRAIN COST ===
    /// Cost weight of missing road access between two settlements
    pub road_access_cost: f64,

    /// Cost weight of average slope
    pub slope_cost: f64,

    /// Cost weight of average terrain friction
    pub terrain_friction_cost: f64,

    /// Cost weight of the worse river crossing of the two endpoints
    pub river_crossing_cost: f64,

    /// Meters of climb that add one cost point
    pub uphill_meters_per_point: f64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            // Pressure (threshold > clamp, so no one-turn breach)
            breach_threshold: 12,
            pressure_delta_clamp: 10,
            hold_multiplier: 0,
            probe_multiplier: 1,
            push_multiplier: 2,
            max_posture_weight: 3,

            // Commitment
            commit_base_points: 1000,
            fatigue_commit_penalty: 50,

            // Movement rates
            movement_rate: 3,
            column_rate_base: 12.0,
            column_rate_min: 8.0,
            column_rate_max: 14.0,
            infantry_bonus_threshold: 2200.0,
            heavy_share_penalty: 4.0,

            // Column terrain costs
            road_access_cost: 0.9,
            slope_cost: 0.8,
            terrain_friction_cost: 0.9,
            river_crossing_cost: 1.2,
            uphill_meters_per_point: 400.0,
        }
    }
}

impl CampaignConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, falling back to defaults per field
    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        let config: CampaignConfig =
            toml::from_str(raw).map_err(|e| format!("config parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.pressure_delta_clamp < 1 {
            return Err(format!(
                "pressure_delta_clamp ({}) must be at least 1",
                self.pressure_delta_clamp
            ));
        }

        // Threshold must be out of reach of a single turn
        if self.breach_threshold <= self.pressure_delta_clamp {
            return Err(format!(
                "breach_threshold ({}) should be > pressure_delta_clamp ({})",
                self.breach_threshold, self.pressure_delta_clamp
            ));
        }

        if self.max_posture_weight < 1 {
            return Err(format!(
                "max_posture_weight ({}) must be at least 1",
                self.max_posture_weight
            ));
        }

        if self.commit_base_points < 1 {
            return Err(format!(
                "commit_base_points ({}) must be at least 1",
                self.commit_base_points
            ));
        }

        if self.movement_rate < 1 {
            return Err(format!(
                "movement_rate ({}) must be at least 1",
                self.movement_rate
            ));
        }

        if self.column_rate_min <= 0.0
            || self.column_rate_min > self.column_rate_base
            || self.column_rate_base > self.column_rate_max
        {
            return Err(format!(
                "column rates must satisfy 0 < min ({}) <= base ({}) <= max ({})",
                self.column_rate_min, self.column_rate_base, self.column_rate_max
            ));
        }

        if self.infantry_bonus_threshold <= 0.0 || self.uphill_meters_per_point <= 0.0 {
            return Err("movement divisors must be positive".into());
        }

        if self.road_access_cost < 0.0
            || self.slope_cost < 0.0
            || self.terrain_friction_cost < 0.0
            || self.river_crossing_cost < 0.0
        {
            return Err("terrain cost weights must be non-negative".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<CampaignConfig> = OnceLock::new();

/// Get the global campaign config (initializes with defaults if not set)
pub fn config() -> &'static CampaignConfig {
    CONFIG.get_or_init(CampaignConfig::default)
}

/// Set the global campaign config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: CampaignConfig) -> Result<(), CampaignConfig> {
    CONFIG.set(config)
}
