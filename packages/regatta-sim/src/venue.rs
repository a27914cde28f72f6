//! venue.rs — Static per-location wind, gust and current parameters
//!
//! The core only reads these tables. Venue selection belongs to the host.
//! Each venue decides how the wind shifts, how gusty it is, how wind cells are
//! placed, and what range the tidal current is rolled from.

use serde::Serialize;

use crate::error::SimError;

/// Coarse frequency bucket shared by gusts and wind cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Wind cells regenerated on initialize
    pub fn cell_count(self) -> usize {
        match self {
            Tier::Low => 3,
            Tier::Medium => 5,
            Tier::High => 8,
        }
    }

    /// Chance that a cell's strength is nudged by ±1 on each cell walk
    pub fn nudge_probability(self) -> f64 {
        match self {
            Tier::Low => 0.05,
            Tier::Medium => 0.10,
            Tier::High => 0.20,
        }
    }

    /// Puff spawn attempts per second
    pub fn spawn_rate(self) -> f64 {
        match self {
            Tier::Low => 0.2,
            Tier::Medium => 0.5,
            Tier::High => 1.0,
        }
    }
}

/// How the base wind direction moves on each shift
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftPattern {
    /// Exactly ±step degrees, even odds
    FixedStep { step_deg: f64 },
    /// 60% of shifts backing (negative), magnitude in [0.5, 1.5] × speed
    WesterlyBias { speed: f64 },
    /// Uniform in [−speed, +speed]
    Symmetric { speed: f64 },
}

/// Where wind cells are dropped on initialize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellPlacement {
    Uniform,
    /// One half of the course, switching sides on a coarse clock toggle
    Biased,
}

#[derive(Debug, Clone, Serialize)]
pub struct VenueProfile {
    pub id: &'static str,
    pub name: &'static str,
    /// Max base-wind deviation from North, degrees
    pub direction_range: f64,
    pub shift: ShiftPattern,
    /// Seconds between base-direction shifts
    pub shift_interval_secs: f64,
    pub min_wind_kn: f64,
    pub max_wind_kn: f64,
    pub gust_frequency: Tier,
    /// Chance a spawn attempt actually produces a puff
    pub gust_probability: f64,
    /// Peak wind multiplier inside a puff
    pub gust_strength: f64,
    /// Spread applied to puff sizes, 0 = uniform sizes
    pub wind_variability: f64,
    pub puff_frequency: Tier,
    /// Puff diameter range, pixels
    pub puff_size: (f64, f64),
    pub puff_opacity: (f64, f64),
    pub cell_placement: CellPlacement,
    pub current_min_kn: f64,
    pub current_max_kn: f64,
}

pub const VENUE_IDS: [&str; 4] = ["newportharbor", "sanfrancisco", "lakegarda", "solent"];

impl VenueProfile {
    pub fn by_id(id: &str) -> Result<Self, SimError> {
        Self::all()
            .into_iter()
            .find(|v| v.id == id)
            .ok_or_else(|| SimError::UnknownVenue(id.to_string()))
    }

    pub fn all() -> Vec<Self> {
        vec![newport_harbor(), san_francisco(), lake_garda(), solent()]
    }

    /// True when the current range is a single point (e.g. [0, 0])
    pub fn has_fixed_current(&self) -> bool {
        self.current_max_kn <= self.current_min_kn
    }
}

impl Default for VenueProfile {
    fn default() -> Self { newport_harbor() }
}

/// Sheltered harbour: small regular steps, light puffs, slack water
fn newport_harbor() -> VenueProfile {
    VenueProfile {
        id: "newportharbor",
        name: "Newport Harbor",
        direction_range: 10.0,
        shift: ShiftPattern::FixedStep { step_deg: 2.0 },
        shift_interval_secs: 6.0,
        min_wind_kn: 5.0,
        max_wind_kn: 8.0,
        gust_frequency: Tier::Low,
        gust_probability: 0.4,
        gust_strength: 1.2,
        wind_variability: 0.2,
        puff_frequency: Tier::Low,
        puff_size: (60.0, 110.0),
        puff_opacity: (0.15, 0.30),
        cell_placement: CellPlacement::Uniform,
        current_min_kn: 0.0,
        current_max_kn: 0.0,
    }
}

/// Sea breeze that keeps backing west, big gusts, strong ebb
fn san_francisco() -> VenueProfile {
    VenueProfile {
        id: "sanfrancisco",
        name: "San Francisco Bay",
        direction_range: 25.0,
        shift: ShiftPattern::WesterlyBias { speed: 2.0 },
        shift_interval_secs: 4.0,
        min_wind_kn: 7.0,
        max_wind_kn: 10.0,
        gust_frequency: Tier::High,
        gust_probability: 0.8,
        gust_strength: 1.5,
        wind_variability: 0.6,
        puff_frequency: Tier::High,
        puff_size: (90.0, 180.0),
        puff_opacity: (0.30, 0.55),
        cell_placement: CellPlacement::Biased,
        current_min_kn: 0.5,
        current_max_kn: 2.0,
    }
}

/// Thermal lake wind: oscillating shifts, moderate puffs, almost no current
fn lake_garda() -> VenueProfile {
    VenueProfile {
        id: "lakegarda",
        name: "Lake Garda",
        direction_range: 15.0,
        shift: ShiftPattern::Symmetric { speed: 1.5 },
        shift_interval_secs: 5.0,
        min_wind_kn: 6.0,
        max_wind_kn: 9.0,
        gust_frequency: Tier::Medium,
        gust_probability: 0.6,
        gust_strength: 1.3,
        wind_variability: 0.4,
        puff_frequency: Tier::Medium,
        puff_size: (70.0, 140.0),
        puff_opacity: (0.20, 0.40),
        cell_placement: CellPlacement::Uniform,
        current_min_kn: 0.0,
        current_max_kn: 0.3,
    }
}

/// Tidal strait: shifty, patchy wind on one side, strong stream
fn solent() -> VenueProfile {
    VenueProfile {
        id: "solent",
        name: "The Solent",
        direction_range: 20.0,
        shift: ShiftPattern::Symmetric { speed: 2.5 },
        shift_interval_secs: 5.0,
        min_wind_kn: 5.0,
        max_wind_kn: 9.0,
        gust_frequency: Tier::Medium,
        gust_probability: 0.5,
        gust_strength: 1.35,
        wind_variability: 0.5,
        puff_frequency: Tier::Medium,
        puff_size: (80.0, 150.0),
        puff_opacity: (0.20, 0.45),
        cell_placement: CellPlacement::Biased,
        current_min_kn: 1.0,
        current_max_kn: 2.5,
    }
}
