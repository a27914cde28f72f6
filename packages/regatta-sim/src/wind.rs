//! wind.rs — Base wind, local wind cells and tidal current
//!
//! The wind field carries one global base direction and strength plus a set of
//! circular cells that add or remove strength locally. Cells never bend the
//! direction. The current is a single uniform vector, rolled once per race.
//!
//! Direction stays inside the venue's range around North:
//! [0, range] ∪ [360 − range, 360).

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;

use regatta_types::{normalize_deg, Vec2, WindCellSnapshot};

use crate::venue::{CellPlacement, ShiftPattern, VenueProfile};

/// Local wind strength band after cell contributions, knots
pub const MIN_LOCAL_WIND_KN: f64 = 1.0;
pub const MAX_LOCAL_WIND_KN: f64 = 10.0;

const CELL_RADIUS_MIN: f64 = 50.0;
const CELL_RADIUS_MAX: f64 = 150.0;
const CELL_STRENGTH_LIMIT: i32 = 2;
/// Max cell drift per walk step on each axis, pixels
const CELL_DRIFT_PX: f64 = 4.0;
/// Biased cell placement switches course halves on this period, seconds
const BIAS_TOGGLE_SECS: f64 = 120.0;
/// Share of westerly-biased shifts that back (go negative)
const WESTERLY_BACKING_ODDS: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindCell {
    pub pos: Vec2,
    pub radius: f64,
    /// Signed strength delta, whole knots in [−2, 2]
    pub strength: f64,
}

impl WindCell {
    /// Proximity weight in [0, 1]: 1 at the centre, 0 at and beyond the rim
    pub fn weight_at(&self, pos: Vec2) -> f64 {
        let d = self.pos.dist(&pos);
        if d >= self.radius { 0.0 } else { (1.0 - d / self.radius).max(0.0) }
    }
}

/// Uniform tidal stream. `direction` is the bearing it sets from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Current {
    pub direction: f64,
    pub strength: f64,
}

impl Current {
    /// Water flow per knot-second, pointing 180° from `direction`
    pub fn drift(&self) -> Vec2 {
        Vec2::from_bearing(self.direction + 180.0).scale(self.strength)
    }
}

/// Wind as seen at one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub strength: f64,
    pub direction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindField {
    pub strength: f64,
    pub direction: f64,
    pub cells: Vec<WindCell>,
    pub current: Current,
    bounds: Vec2,
}

impl WindField {
    /// Calm field over a course of the given size. Call `initialize` before racing.
    pub fn new(bounds: Vec2) -> Self {
        Self {
            strength: MIN_LOCAL_WIND_KN,
            direction: 0.0,
            cells: Vec::new(),
            current: Current::default(),
            bounds,
        }
    }

    /// Roll base wind, current and cells for a new race at `venue`.
    /// `clock` drives the biased-placement side toggle.
    pub fn initialize<R: Rng + ?Sized>(&mut self, venue: &VenueProfile, clock: f64, rng: &mut R) {
        self.strength = if venue.max_wind_kn > venue.min_wind_kn {
            rng.gen_range(venue.min_wind_kn..=venue.max_wind_kn)
        } else {
            venue.min_wind_kn
        };

        let offset = if venue.direction_range > 0.0 {
            rng.gen_range(-venue.direction_range..=venue.direction_range)
        } else {
            0.0
        };
        self.direction = clamp_to_range(offset, venue.direction_range);

        // A zero-width range is exact, never a near-zero random jitter
        let current_strength = if venue.has_fixed_current() {
            venue.current_min_kn
        } else {
            rng.gen_range(venue.current_min_kn..=venue.current_max_kn)
        };
        self.current = Current {
            direction: rng.gen_range(0.0..360.0),
            strength: current_strength,
        };

        self.regenerate_cells(venue, clock, rng);
    }

    fn regenerate_cells<R: Rng + ?Sized>(&mut self, venue: &VenueProfile, clock: f64, rng: &mut R) {
        let half = self.bounds.x / 2.0;
        let (x_min, x_max) = match venue.cell_placement {
            CellPlacement::Uniform => (0.0, self.bounds.x),
            CellPlacement::Biased => {
                if (clock.max(0.0) / BIAS_TOGGLE_SECS) as u64 % 2 == 0 {
                    (0.0, half)
                } else {
                    (half, self.bounds.x)
                }
            }
        };
        let x_dist = Uniform::new_inclusive(x_min, x_max);
        let y_dist = Uniform::new_inclusive(0.0, self.bounds.y);
        let r_dist = Uniform::new_inclusive(CELL_RADIUS_MIN, CELL_RADIUS_MAX);

        self.cells = (0..venue.puff_frequency.cell_count())
            .map(|_| WindCell {
                pos: Vec2::new(x_dist.sample(rng), y_dist.sample(rng)),
                radius: r_dist.sample(rng),
                strength: rng.gen_range(-CELL_STRENGTH_LIMIT..=CELL_STRENGTH_LIMIT) as f64,
            })
            .collect();
    }

    /// Apply one discrete shift to the base direction, then clamp to the venue range.
    pub fn advance_direction<R: Rng + ?Sized>(&mut self, venue: &VenueProfile, rng: &mut R) {
        let shift = match venue.shift {
            ShiftPattern::FixedStep { step_deg } => {
                if rng.gen_bool(0.5) { step_deg } else { -step_deg }
            }
            ShiftPattern::WesterlyBias { speed } => {
                let magnitude = rng.gen_range(0.5..=1.5) * speed;
                if rng.gen_bool(WESTERLY_BACKING_ODDS) { -magnitude } else { magnitude }
            }
            ShiftPattern::Symmetric { speed } => {
                if speed > 0.0 { rng.gen_range(-speed..=speed) } else { 0.0 }
            }
        };
        self.direction = clamp_to_range(self.direction + shift, venue.direction_range);
    }

    /// Effective wind at a point. Direction is always the global base direction.
    pub fn wind_at(&self, pos: Vec2) -> WindSample {
        let delta: f64 = self.cells.iter().map(|c| c.weight_at(pos) * c.strength).sum();
        WindSample {
            strength: (self.strength + delta).clamp(MIN_LOCAL_WIND_KN, MAX_LOCAL_WIND_KN),
            direction: self.direction,
        }
    }

    /// Random-walk every cell and occasionally nudge its strength by ±1.
    pub fn advance_cells<R: Rng + ?Sized>(&mut self, venue: &VenueProfile, rng: &mut R) {
        let nudge_odds = venue.puff_frequency.nudge_probability();
        let limit = CELL_STRENGTH_LIMIT as f64;
        for cell in &mut self.cells {
            cell.pos.x = (cell.pos.x + rng.gen_range(-CELL_DRIFT_PX..=CELL_DRIFT_PX)).clamp(0.0, self.bounds.x);
            cell.pos.y = (cell.pos.y + rng.gen_range(-CELL_DRIFT_PX..=CELL_DRIFT_PX)).clamp(0.0, self.bounds.y);
            if rng.gen_bool(nudge_odds) {
                let step = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                cell.strength = (cell.strength + step).clamp(-limit, limit);
            }
        }
    }

    pub fn cell_snapshots(&self) -> Vec<WindCellSnapshot> {
        self.cells
            .iter()
            .map(|c| WindCellSnapshot { pos: c.pos, radius: c.radius, strength: c.strength })
            .collect()
    }
}

/// Keep a bearing within `range` degrees of North in either rotational sense.
/// Clockwise overshoot caps at `range`, counter-clockwise at `360 − range`.
pub fn clamp_to_range(direction: f64, range: f64) -> f64 {
    let d = normalize_deg(direction);
    if d > range && d <= 180.0 {
        range
    } else if d > 180.0 && d < 360.0 - range {
        normalize_deg(360.0 - range)
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field() -> WindField {
        WindField::new(Vec2::new(800.0, 600.0))
    }

    fn in_range(direction: f64, range: f64) -> bool {
        (0.0..=range).contains(&direction) || (360.0 - range..360.0).contains(&direction)
    }

    #[test]
    fn newport_current_is_exactly_zero() {
        let venue = VenueProfile::by_id("newportharbor").unwrap();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut wind = field();
            wind.initialize(&venue, 0.0, &mut rng);
            assert_eq!(wind.current.strength, 0.0);
            assert_eq!(wind.current.drift().length(), 0.0);
        }
    }

    #[test]
    fn initialize_rolls_within_venue_bounds() {
        let venue = VenueProfile::by_id("sanfrancisco").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for clock in [0.0, 130.0, 500.0] {
            let mut wind = field();
            wind.initialize(&venue, clock, &mut rng);
            assert!(wind.strength >= venue.min_wind_kn && wind.strength <= venue.max_wind_kn);
            assert!(in_range(wind.direction, venue.direction_range));
            assert!(wind.current.strength >= 0.5 && wind.current.strength <= 2.0);
            assert!((0.0..360.0).contains(&wind.current.direction));
            assert_eq!(wind.cells.len(), venue.puff_frequency.cell_count());
            for cell in &wind.cells {
                assert!((50.0..=150.0).contains(&cell.radius));
                assert!((-2.0..=2.0).contains(&cell.strength));
                assert_eq!(cell.strength.fract(), 0.0);
            }
        }
    }

    #[test]
    fn biased_cells_switch_halves_with_the_clock() {
        let venue = VenueProfile::by_id("solent").unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut wind = field();
        wind.initialize(&venue, 10.0, &mut rng);
        assert!(wind.cells.iter().all(|c| c.pos.x <= 400.0));
        wind.initialize(&venue, BIAS_TOGGLE_SECS + 10.0, &mut rng);
        assert!(wind.cells.iter().all(|c| c.pos.x >= 400.0));
    }

    #[test]
    fn direction_stays_contained_across_many_shifts() {
        for id in crate::venue::VENUE_IDS {
            let venue = VenueProfile::by_id(id).unwrap();
            let mut rng = StdRng::seed_from_u64(3);
            let mut wind = field();
            wind.initialize(&venue, 0.0, &mut rng);
            for _ in 0..5_000 {
                wind.advance_direction(&venue, &mut rng);
                assert!(
                    in_range(wind.direction, venue.direction_range),
                    "{id}: {} escaped ±{}",
                    wind.direction,
                    venue.direction_range
                );
            }
        }
    }

    #[test]
    fn fixed_step_moves_exactly_two_degrees() {
        let venue = VenueProfile::by_id("newportharbor").unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut wind = field();
        wind.direction = 0.0;
        wind.advance_direction(&venue, &mut rng);
        assert!(wind.direction == 2.0 || wind.direction == 358.0);
    }

    #[test]
    fn clamp_caps_each_rotational_sense() {
        assert_eq!(clamp_to_range(15.0, 10.0), 10.0);
        assert_eq!(clamp_to_range(-15.0, 10.0), 350.0);
        assert_eq!(clamp_to_range(360.0, 10.0), 0.0);
        assert_eq!(clamp_to_range(0.0, 10.0), 0.0);
        assert_eq!(clamp_to_range(355.0, 10.0), 355.0);
        assert_eq!(clamp_to_range(90.0, 0.0), 0.0);
        assert_eq!(clamp_to_range(270.0, 0.0), 0.0);
    }

    #[test]
    fn cells_only_change_strength_and_clamp() {
        let mut wind = field();
        wind.strength = 9.0;
        wind.direction = 4.0;
        wind.cells = vec![WindCell { pos: Vec2::new(100.0, 100.0), radius: 100.0, strength: 2.0 }];

        let centre = wind.wind_at(Vec2::new(100.0, 100.0));
        assert_eq!(centre.direction, 4.0);
        assert_eq!(centre.strength, MAX_LOCAL_WIND_KN);

        let halfway = wind.wind_at(Vec2::new(150.0, 100.0));
        assert!((halfway.strength - 10.0).abs() < 1e-9);

        let outside = wind.wind_at(Vec2::new(300.0, 300.0));
        assert_eq!(outside.strength, 9.0);

        wind.strength = 1.5;
        wind.cells[0].strength = -2.0;
        assert_eq!(wind.wind_at(Vec2::new(100.0, 100.0)).strength, MIN_LOCAL_WIND_KN);
    }

    #[test]
    fn cell_walk_stays_on_course_and_in_band() {
        let venue = VenueProfile::by_id("sanfrancisco").unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let mut wind = field();
        wind.initialize(&venue, 0.0, &mut rng);
        for _ in 0..2_000 {
            wind.advance_cells(&venue, &mut rng);
        }
        for cell in &wind.cells {
            assert!((0.0..=800.0).contains(&cell.pos.x));
            assert!((0.0..=600.0).contains(&cell.pos.y));
            assert!((-2.0..=2.0).contains(&cell.strength));
        }
    }
}
