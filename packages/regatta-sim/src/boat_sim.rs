//! boat_sim.rs — Boat kinematics
//!
//! Each tick a boat:
//! - turns at the helm rate and slews its sail trim
//! - looks up sail efficiency from its angle to the wind (one canonical table
//!   for players and AI alike)
//! - chases a target speed capped at `max_speed × efficiency`
//! - integrates its compass heading into screen displacement plus current drift
//!
//! Heading stays in [0, 360), speed ≥ 0, trim in [0, 100].

use serde::{Deserialize, Serialize};

use regatta_types::{angle_between, angle_diff, normalize_deg, BoatId, BoatSnapshot, RaceStage, Tack, Vec2};

use crate::tuning::PhysicsTuning;
use crate::wind::Current;

// ── Sail efficiency (canonical 5-band table) ─────────────────────────────────

/// Below this relative wind angle the boat is in irons
pub const NO_GO_ANGLE: f64 = 30.0;

const IN_IRONS_EFFICIENCY: f64 = 0.05;
const CLOSE_HAULED_EFFICIENCY: f64 = 0.7;
const BEAM_REACH_EFFICIENCY: f64 = 1.0;
const BROAD_REACH_EFFICIENCY: f64 = 0.85;
const RUNNING_EFFICIENCY: f64 = 0.6;

/// Relative wind angle folded to [0, 180], port and starboard symmetric
pub fn relative_wind_angle(heading: f64, wind_direction: f64) -> f64 {
    angle_between(heading, wind_direction)
}

/// Band lookup. Lower bounds are inclusive, upper bounds exclusive.
pub fn sail_efficiency(relative_angle: f64) -> f64 {
    if relative_angle < NO_GO_ANGLE {
        IN_IRONS_EFFICIENCY
    } else if relative_angle < 60.0 {
        CLOSE_HAULED_EFFICIENCY
    } else if relative_angle < 120.0 {
        BEAM_REACH_EFFICIENCY
    } else if relative_angle < 150.0 {
        BROAD_REACH_EFFICIENCY
    } else {
        RUNNING_EFFICIENCY
    }
}

pub fn is_in_irons(relative_angle: f64) -> bool {
    relative_angle < NO_GO_ANGLE
}

/// Speed cap for an efficiency band, knots
pub fn speed_cap(efficiency: f64, tuning: &PhysicsTuning) -> f64 {
    tuning.max_speed_kn * efficiency
}

/// Steady-state speed for the given wind and trim, never above the band cap
pub fn target_speed(efficiency: f64, wind_kn: f64, sail_trim: f64, tuning: &PhysicsTuning) -> f64 {
    let wind_factor = (wind_kn / tuning.reference_wind_kn).clamp(0.0, 1.0);
    let trim_factor = (sail_trim / 100.0).clamp(0.0, 1.0);
    speed_cap(efficiency, tuning) * wind_factor * trim_factor
}

/// Tack implied by which side the wind crosses. `None` dead upwind or downwind.
pub fn tack_for(heading: f64, wind_direction: f64) -> Option<Tack> {
    let d = angle_diff(heading, wind_direction);
    if d > 0.0 && d < 180.0 {
        Some(Tack::Starboard)
    } else if d < 0.0 {
        Some(Tack::Port)
    } else {
        None
    }
}

// ── Control state ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Helm {
    #[default]
    Center,
    Left,
    Right,
}

impl Helm {
    fn sign(self) -> f64 {
        match self {
            Helm::Center => 0.0,
            Helm::Left => -1.0,
            Helm::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrimMode {
    Full,
    #[default]
    Luff,
}

impl TrimMode {
    fn target(self) -> f64 {
        match self {
            TrimMode::Full => 100.0,
            TrimMode::Luff => 0.0,
        }
    }
}

// ── Boat state ───────────────────────────────────────────────────────────────

/// Entry used to spawn a boat, and to respawn it on reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoatEntry {
    pub user_id: String,
    pub name: String,
    /// Player-controlled in this process; otherwise sailed by the autopilot
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Boat {
    pub id: BoatId,
    /// 1-based for display
    pub boat_number: u32,
    pub user_id: String,
    pub name: String,
    pub is_local: bool,
    pub pos: Vec2,
    /// Compass degrees, [0, 360)
    pub heading: f64,
    /// Knots, ≥ 0
    pub speed: f64,
    pub tack: Tack,
    /// Percent, [0, 100]
    pub sail_trim: f64,
    pub trim_mode: TrimMode,
    pub helm: Helm,
    pub stage: RaceStage,
    /// Index into `Course::marks` of the last mark rounded
    pub last_mark: Option<usize>,
    /// Set on entering FinishLeg; a finish only counts with this set
    pub passed_finish_leg: bool,
}

/// Per-boat environment for one tick, already sampled by the session
#[derive(Debug, Clone, Copy)]
pub struct SailingConditions {
    pub wind_direction: f64,
    /// Local wind strength at the boat (base + cells), knots
    pub wind_strength: f64,
    /// Wind multiplier from other boats' shadows (1.0 when clear)
    pub shadow_factor: f64,
    /// Wind multiplier from puffs (1.0 outside any puff)
    pub puff_boost: f64,
    pub current: Current,
}

impl Boat {
    pub fn new(id: BoatId, boat_number: u32, entry: &BoatEntry, pos: Vec2, heading: f64) -> Self {
        Self {
            id,
            boat_number,
            user_id: entry.user_id.clone(),
            name: entry.name.clone(),
            is_local: entry.is_local,
            pos,
            heading: normalize_deg(heading),
            speed: 0.0,
            tack: Tack::default(),
            sail_trim: 0.0,
            trim_mode: TrimMode::Luff,
            helm: Helm::Center,
            stage: RaceStage::NotStarted,
            last_mark: None,
            passed_finish_leg: false,
        }
    }

    pub fn relative_wind(&self, wind_direction: f64) -> f64 {
        relative_wind_angle(self.heading, wind_direction)
    }

    /// Rotate toward `desired` by at most `max_step` degrees
    pub fn turn_toward(&mut self, desired: f64, max_step: f64) {
        let diff = angle_diff(self.heading, desired);
        self.heading = normalize_deg(self.heading + diff.clamp(-max_step, max_step));
    }

    /// Put the bow through the wind: mirror heading across the wind axis,
    /// flip the tack, and bleed speed.
    pub fn tack_through(&mut self, wind_direction: f64, tuning: &PhysicsTuning) {
        self.heading = normalize_deg(2.0 * wind_direction - self.heading);
        self.tack = self.tack.flipped();
        self.speed = (self.speed * tuning.tack_speed_retention).max(0.0);
    }

    /// Wind strength the sails actually see. Puffs do nothing in irons.
    pub fn effective_wind(&self, conditions: &SailingConditions) -> f64 {
        let shadowed = conditions.wind_strength * conditions.shadow_factor;
        if is_in_irons(self.relative_wind(conditions.wind_direction)) {
            shadowed
        } else {
            shadowed * conditions.puff_boost
        }
    }

    /// Advance helm, trim, speed and position by `dt` seconds.
    pub fn step(&mut self, conditions: &SailingConditions, tuning: &PhysicsTuning, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        self.heading = normalize_deg(self.heading + self.helm.sign() * tuning.turn_rate_deg * dt);

        let trim_target = self.trim_mode.target();
        let trim_step = tuning.trim_rate * dt;
        let trimmed = if self.sail_trim < trim_target {
            (self.sail_trim + trim_step).min(trim_target)
        } else {
            (self.sail_trim - trim_step).max(trim_target)
        };
        self.sail_trim = trimmed.clamp(0.0, 100.0);

        let rel = self.relative_wind(conditions.wind_direction);
        let efficiency = sail_efficiency(rel);
        let cap = speed_cap(efficiency, tuning);

        let speed = match self.trim_mode {
            TrimMode::Luff => self.speed - tuning.luff_deceleration * dt,
            TrimMode::Full => {
                let target = target_speed(efficiency, self.effective_wind(conditions), self.sail_trim, tuning);
                if self.speed < target {
                    (self.speed + tuning.acceleration * dt).min(target)
                } else {
                    (self.speed - tuning.deceleration * dt).max(target)
                }
            }
        };
        self.speed = speed.clamp(0.0, cap);

        let sailing = Vec2::from_bearing(self.heading).scale(self.speed * tuning.pixels_per_knot * dt);
        let drift = conditions.current.drift().scale(tuning.current_pixels_per_knot * dt);
        self.pos = self.pos.add(&sailing).add(&drift);

        if let Some(tack) = tack_for(self.heading, conditions.wind_direction) {
            self.tack = tack;
        }
    }

    pub fn snapshot(&self) -> BoatSnapshot {
        BoatSnapshot {
            id: self.id,
            boat_number: self.boat_number,
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            is_local: self.is_local,
            pos: self.pos,
            heading: self.heading,
            speed: self.speed,
            tack: self.tack,
            sail_trim: self.sail_trim,
            stage: self.stage,
            last_mark: self.last_mark,
        }
    }
}
