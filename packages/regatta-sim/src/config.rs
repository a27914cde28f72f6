//! config.rs — Race configuration
//!
//! Parsed from the `[race]` table of the simulator's config.toml. Every field
//! has a default so a partial table is enough.

use serde::{Deserialize, Serialize};

use crate::boat_sim::BoatEntry;
use crate::error::SimError;
use crate::tuning::PhysicsTuning;
use crate::venue::VenueProfile;

/// Fleet size the race supports
pub const MAX_BOATS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub venue: String,
    /// Pre-start countdown, seconds
    pub countdown_secs: f64,
    /// Fixed RNG seed. Unset means a fresh entropy seed each session.
    pub seed: Option<u64>,
    pub course_width: f64,
    pub course_height: f64,
    pub boats: Vec<BoatEntry>,
    pub tuning: PhysicsTuning,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            venue: "newportharbor".into(),
            countdown_secs: 180.0,
            seed: None,
            course_width: 800.0,
            course_height: 600.0,
            boats: vec![BoatEntry {
                user_id: "local".into(),
                name: "Boat 1".into(),
                is_local: true,
            }],
            tuning: PhysicsTuning::default(),
        }
    }
}

impl RaceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, SimError> {
        let cfg: RaceConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fleet of `count` boats: the first local, the rest sailed by the autopilot
    pub fn with_fleet(mut self, count: usize) -> Self {
        self.boats = (1..=count)
            .map(|n| BoatEntry {
                user_id: if n == 1 { "local".into() } else { format!("ai-{n}") },
                name: format!("Boat {n}"),
                is_local: n == 1,
            })
            .collect();
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        VenueProfile::by_id(&self.venue)?;
        if self.boats.is_empty() || self.boats.len() > MAX_BOATS {
            return Err(SimError::InvalidBoatCount { count: self.boats.len(), max: MAX_BOATS });
        }
        if !(self.countdown_secs >= 0.0) {
            return Err(SimError::Negative { field: "countdown_secs", value: self.countdown_secs });
        }
        for (field, value) in [("course_width", self.course_width), ("course_height", self.course_height)] {
            if !(value > 0.0) {
                return Err(SimError::NotPositive { field, value });
            }
        }
        self.tuning.validate()
    }
}
