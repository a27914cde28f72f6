//! tuning.rs — Gameplay tuning for boat handling and course interaction
//!
//! Keep this separate from runtime configuration (tick rate, ports, file paths).

use serde::{Deserialize, Serialize};

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Speed cap at full efficiency, knots
    pub max_speed_kn: f64,
    /// Wind strength at which a boat can reach the cap, knots. Sits above the
    /// strongest local wind a puff can produce so puffs always add speed.
    pub reference_wind_kn: f64,
    /// Speed gain toward target, knots per second
    pub acceleration: f64,
    /// Speed loss toward a lower target, knots per second
    pub deceleration: f64,
    /// Speed loss while luffing, knots per second
    pub luff_deceleration: f64,
    /// Screen displacement per knot of boat speed, pixels per second
    pub pixels_per_knot: f64,
    /// Screen displacement per knot of current, pixels per second
    pub current_pixels_per_knot: f64,
    /// Helm rotation rate, degrees per second
    pub turn_rate_deg: f64,
    /// Sail trim slew rate, percent per second
    pub trim_rate: f64,
    /// Fraction of boat speed kept through a tack
    pub tack_speed_retention: f64,
    /// Hull collision radius, pixels
    pub boat_radius: f64,
    /// Length of the wind shadow cone behind a boat, pixels
    pub shadow_length: f64,
    /// Effective wind multiplier for a boat inside any wind shadow
    pub shadow_penalty: f64,
    /// Speed multiplier applied to a boat per resolved contact
    pub collision_damping: f64,
    /// Fraction of the overlap each body is pushed out by
    pub collision_push_ratio: f64,
    /// Half-height of the start/finish line detection band, pixels
    pub line_tolerance: f64,
    /// Puff drift rate, pixels per second
    pub puff_speed: f64,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            max_speed_kn: 12.0,
            reference_wind_kn: 16.0,
            acceleration: 1.5,
            deceleration: 1.0,
            luff_deceleration: 3.0,
            pixels_per_knot: 6.0,
            current_pixels_per_knot: 4.0,
            turn_rate_deg: 90.0,
            trim_rate: 50.0,
            tack_speed_retention: 0.6,
            boat_radius: 15.0,
            shadow_length: 150.0,
            shadow_penalty: 0.7,
            collision_damping: 0.95,
            collision_push_ratio: 0.75,
            line_tolerance: 5.0,
            puff_speed: 30.0,
        }
    }
}

impl PhysicsTuning {
    pub fn validate(&self) -> Result<(), SimError> {
        let positive = [
            ("max_speed_kn", self.max_speed_kn),
            ("reference_wind_kn", self.reference_wind_kn),
            ("pixels_per_knot", self.pixels_per_knot),
            ("boat_radius", self.boat_radius),
            ("line_tolerance", self.line_tolerance),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(SimError::NotPositive { field, value });
            }
        }
        let non_negative = [
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("luff_deceleration", self.luff_deceleration),
            ("current_pixels_per_knot", self.current_pixels_per_knot),
            ("turn_rate_deg", self.turn_rate_deg),
            ("trim_rate", self.trim_rate),
            ("tack_speed_retention", self.tack_speed_retention),
            ("shadow_length", self.shadow_length),
            ("shadow_penalty", self.shadow_penalty),
            ("collision_damping", self.collision_damping),
            ("collision_push_ratio", self.collision_push_ratio),
            ("puff_speed", self.puff_speed),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(SimError::Negative { field, value });
            }
        }
        Ok(())
    }
}
