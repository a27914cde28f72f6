//! gusts.rs — Moving puffs of elevated wind
//!
//! Puffs spawn on the upwind edge of the course, drift downwind at a fixed
//! rate, and are dropped once their bounding box is fully off the course.
//! Membership is an elliptical test; overlapping puffs do not stack, the
//! strongest one wins.

use rand::Rng;
use serde::Serialize;

use regatta_types::{PuffSnapshot, Vec2};

use crate::venue::VenueProfile;

/// Hard cap on live puffs
const MAX_PUFFS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Puff {
    pub pos: Vec2,
    pub half_width: f64,
    pub half_height: f64,
    /// Wind multiplier for boats inside
    pub strength: f64,
    pub opacity: f64,
    /// Travel bearing, fixed at spawn
    pub travel: f64,
}

impl Puff {
    /// Normalized elliptical distance test: (dx/hw)² + (dy/hh)² < 1
    pub fn contains(&self, p: Vec2) -> bool {
        if self.half_width <= 0.0 || self.half_height <= 0.0 {
            return false;
        }
        let dx = (p.x - self.pos.x) / self.half_width;
        let dy = (p.y - self.pos.y) / self.half_height;
        dx * dx + dy * dy < 1.0
    }

    /// Bounding box entirely outside [0, w] × [0, h]
    fn is_past(&self, bounds: Vec2) -> bool {
        self.pos.x + self.half_width < 0.0
            || self.pos.x - self.half_width > bounds.x
            || self.pos.y + self.half_height < 0.0
            || self.pos.y - self.half_height > bounds.y
    }

    fn snapshot(&self) -> PuffSnapshot {
        PuffSnapshot {
            pos: self.pos,
            half_width: self.half_width,
            half_height: self.half_height,
            strength: self.strength,
            opacity: self.opacity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GustField {
    pub puffs: Vec<Puff>,
    bounds: Vec2,
}

impl GustField {
    pub fn new(bounds: Vec2) -> Self {
        Self { puffs: Vec::new(), bounds }
    }

    pub fn clear(&mut self) {
        self.puffs.clear();
    }

    /// Drift puffs, drop the ones that left the course, maybe spawn one.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        dt: f64,
        wind_direction: f64,
        puff_speed: f64,
        venue: &VenueProfile,
        rng: &mut R,
    ) {
        for puff in &mut self.puffs {
            puff.pos = puff.pos.add(&Vec2::from_bearing(puff.travel).scale(puff_speed * dt));
        }
        let bounds = self.bounds;
        self.puffs.retain(|p| !p.is_past(bounds));

        if self.puffs.len() >= MAX_PUFFS {
            return;
        }
        let chance = (venue.gust_frequency.spawn_rate() * venue.gust_probability * dt).clamp(0.0, 1.0);
        if chance > 0.0 && rng.gen_bool(chance) {
            let puff = self.spawn(wind_direction, venue, rng);
            self.puffs.push(puff);
        }
    }

    fn spawn<R: Rng + ?Sized>(&self, wind_direction: f64, venue: &VenueProfile, rng: &mut R) -> Puff {
        let travel = wind_direction + 180.0;
        let heading = Vec2::from_bearing(travel);

        // Pick a point on the course, then walk it back upwind to the edge
        let seed = Vec2::new(
            rng.gen_range(0.0..=self.bounds.x),
            rng.gen_range(0.0..=self.bounds.y),
        );
        let back = heading.scale(-1.0);
        let pos = seed.add(&back.scale(exit_distance(seed, back, self.bounds)));

        let (size_min, size_max) = venue.puff_size;
        let base = if size_max > size_min { rng.gen_range(size_min..=size_max) } else { size_min };
        let spread = 1.0 + venue.wind_variability * rng.gen_range(-0.5..=0.5);
        let diameter = (base * spread).max(1.0);

        let (op_min, op_max) = venue.puff_opacity;
        let opacity = if op_max > op_min { rng.gen_range(op_min..=op_max) } else { op_min };

        Puff {
            pos,
            half_width: diameter / 2.0,
            half_height: diameter / 2.0 * rng.gen_range(0.6..=1.0),
            strength: 1.0 + (venue.gust_strength - 1.0).max(0.0) * rng.gen_range(0.5..=1.0),
            opacity,
            travel,
        }
    }

    /// Strongest puff multiplier covering `p`, or 1.0 outside every puff
    pub fn boost_at(&self, p: Vec2) -> f64 {
        self.puffs
            .iter()
            .filter(|puff| puff.contains(p))
            .map(|puff| puff.strength)
            .fold(1.0, f64::max)
    }

    pub fn snapshots(&self) -> Vec<PuffSnapshot> {
        self.puffs.iter().map(Puff::snapshot).collect()
    }
}

/// Distance from `p` along unit `dir` to the edge of [0, w] × [0, h]
fn exit_distance(p: Vec2, dir: Vec2, bounds: Vec2) -> f64 {
    let axis = |pos: f64, d: f64, max: f64| -> f64 {
        if d > 1e-9 {
            (max - pos) / d
        } else if d < -1e-9 {
            -pos / d
        } else {
            f64::INFINITY
        }
    };
    let t = axis(p.x, dir.x, bounds.x).min(axis(p.y, dir.y, bounds.y));
    if t.is_finite() { t.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bounds() -> Vec2 {
        Vec2::new(800.0, 600.0)
    }

    fn puff_at(x: f64, y: f64) -> Puff {
        Puff {
            pos: Vec2::new(x, y),
            half_width: 50.0,
            half_height: 25.0,
            strength: 1.4,
            opacity: 0.3,
            travel: 180.0,
        }
    }

    #[test]
    fn membership_is_elliptical() {
        let puff = puff_at(100.0, 100.0);
        assert!(puff.contains(Vec2::new(100.0, 100.0)));
        assert!(puff.contains(Vec2::new(140.0, 100.0)));
        assert!(!puff.contains(Vec2::new(100.0, 130.0)));
        assert!(!puff.contains(Vec2::new(150.0, 100.0)));
    }

    #[test]
    fn strongest_overlapping_puff_wins() {
        let mut field = GustField::new(bounds());
        field.puffs.push(puff_at(100.0, 100.0));
        field.puffs.push(Puff { strength: 1.2, ..puff_at(110.0, 100.0) });
        assert_eq!(field.boost_at(Vec2::new(105.0, 100.0)), 1.4);
        assert_eq!(field.boost_at(Vec2::new(700.0, 500.0)), 1.0);
    }

    #[test]
    fn puffs_drift_downwind_and_expire() {
        let venue = VenueProfile { gust_probability: 0.0, ..VenueProfile::default() };
        let mut rng = StdRng::seed_from_u64(1);
        let mut field = GustField::new(bounds());
        field.puffs.push(puff_at(400.0, 560.0));

        field.advance(1.0, 0.0, 30.0, &venue, &mut rng);
        assert_eq!(field.puffs.len(), 1);
        assert!((field.puffs[0].pos.y - 590.0).abs() < 1e-9);

        field.advance(2.0, 0.0, 30.0, &venue, &mut rng);
        assert!(field.puffs.is_empty());
    }

    #[test]
    fn spawns_start_on_the_upwind_edge() {
        let venue = VenueProfile::by_id("sanfrancisco").unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut field = GustField::new(bounds());
        for _ in 0..400 {
            field.advance(0.5, 0.0, 0.0, &venue, &mut rng);
        }
        assert!(!field.puffs.is_empty());
        assert!(field.puffs.len() <= MAX_PUFFS);
        for puff in &field.puffs {
            // North wind: puffs enter from the top edge, travelling south
            assert!(puff.pos.y.abs() < 1e-6);
            assert_eq!(puff.travel, 180.0);
            assert!(puff.strength > 1.0 && puff.strength <= venue.gust_strength);
            assert!(puff.opacity >= venue.puff_opacity.0 && puff.opacity <= venue.puff_opacity.1);
        }
    }

    #[test]
    fn exit_distance_hits_nearest_edge() {
        let d = exit_distance(Vec2::new(100.0, 200.0), Vec2::new(0.0, -1.0), bounds());
        assert!((d - 200.0).abs() < 1e-9);
        let d = exit_distance(Vec2::new(100.0, 200.0), Vec2::new(-1.0, 0.0), bounds());
        assert!((d - 100.0).abs() < 1e-9);
    }
}
