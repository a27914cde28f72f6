//! autopilot.rs — Helm for boats not sailed by a local player
//!
//! Steers toward one waypoint per stage. When the waypoint lies inside the
//! close-hauled cone the boat beats: holds 45° off the wind on its current
//! tack and tacks once the waypoint has moved well onto the other side.
//! Sails with the same kinematics as a player boat.

use regatta_types::{angle_diff, bearing_to, normalize_deg, Course, MarkRole, RacePhase, RaceStage, Tack, Vec2};

use crate::boat_sim::{tack_for, Boat, Helm, TrimMode};
use crate::tuning::PhysicsTuning;

/// Heading off the wind when beating
const CLOSE_HAULED_DEG: f64 = 45.0;
/// How far past the wind the waypoint must swing before tacking
const TACK_OVERSTAND_DEG: f64 = 15.0;
/// Rounding waypoints sit this far outside a mark
const ROUNDING_OFFSET: Vec2 = Vec2 { x: 27.0, y: 8.0 };
/// Start and finish waypoints sit this far past the line
const LINE_OVERRUN: f64 = 30.0;

/// Target point for the boat's current stage. `None` once there is nothing to sail to.
pub fn waypoint(stage: RaceStage, course: &Course) -> Option<Vec2> {
    let mid = course.line.midpoint();
    let windward = || course.mark(MarkRole::Windward).map(|(_, m)| m.pos.add(&Vec2::new(ROUNDING_OFFSET.x, -ROUNDING_OFFSET.y)));
    match stage {
        RaceStage::NotStarted | RaceStage::StartLeg => Some(Vec2::new(mid.x, mid.y - LINE_OVERRUN)),
        RaceStage::UpwindLeg | RaceStage::SecondUpwindLeg => windward(),
        RaceStage::DownwindLeg => course
            .mark(MarkRole::Leeward)
            .map(|(_, m)| m.pos.add(&Vec2::new(-ROUNDING_OFFSET.x, ROUNDING_OFFSET.y))),
        RaceStage::FinishLeg => Some(Vec2::new(mid.x, mid.y + LINE_OVERRUN)),
        RaceStage::Finished => None,
    }
}

/// Heading to steer for `target`, and whether to tack first.
pub fn course_to(boat: &Boat, target: Vec2, wind_direction: f64) -> (f64, bool) {
    let direct = bearing_to(boat.pos, target);
    let off_wind = angle_diff(wind_direction, direct);
    if off_wind.abs() >= CLOSE_HAULED_DEG {
        return (direct, false);
    }
    // Port tack sails right of the wind, starboard left. Judge by heading,
    // the stored tack lags until the next kinematics step.
    let side = match tack_for(boat.heading, wind_direction).unwrap_or(boat.tack) {
        Tack::Port => 1.0,
        Tack::Starboard => -1.0,
    };
    if side * off_wind < -TACK_OVERSTAND_DEG {
        (normalize_deg(wind_direction - side * CLOSE_HAULED_DEG), true)
    } else {
        (normalize_deg(wind_direction + side * CLOSE_HAULED_DEG), false)
    }
}

/// Set trim, tack if needed, and turn toward this tick's heading.
pub fn steer(
    boat: &mut Boat,
    course: &Course,
    phase: RacePhase,
    wind_direction: f64,
    tuning: &PhysicsTuning,
    dt: f64,
) {
    boat.helm = Helm::Center;
    let racing = phase == RacePhase::Racing && boat.stage != RaceStage::Finished;
    if !racing {
        boat.trim_mode = TrimMode::Luff;
        return;
    }
    boat.trim_mode = TrimMode::Full;

    let Some(target) = waypoint(boat.stage, course) else {
        return;
    };
    let (heading, tack) = course_to(boat, target, wind_direction);
    if tack {
        boat.tack_through(wind_direction, tuning);
    }
    boat.turn_toward(heading, tuning.turn_rate_deg * dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boat_sim::BoatEntry;
    use regatta_types::BoatId;

    fn ai_boat(x: f64, y: f64, heading: f64, tack: Tack) -> Boat {
        let entry = BoatEntry { user_id: "ai-2".into(), name: "Gull".into(), is_local: false };
        let mut b = Boat::new(BoatId(2), 2, &entry, Vec2::new(x, y), heading);
        b.tack = tack;
        b
    }

    #[test]
    fn waypoints_follow_the_course_order() {
        let course = Course::default();
        let start = waypoint(RaceStage::StartLeg, &course).unwrap();
        assert!(start.y < course.line.y());
        let up = waypoint(RaceStage::UpwindLeg, &course).unwrap();
        assert!(up.y < course.marks[0].pos.y);
        assert!((up.x - course.marks[0].pos.x).abs() < 2.0 * PhysicsTuning::default().boat_radius);
        let down = waypoint(RaceStage::DownwindLeg, &course).unwrap();
        assert!(down.y > course.marks[1].pos.y);
        let finish = waypoint(RaceStage::FinishLeg, &course).unwrap();
        assert!(finish.y > course.line.y());
        assert_eq!(waypoint(RaceStage::Finished, &course), None);
    }

    #[test]
    fn reaches_straight_to_an_open_waypoint() {
        let b = ai_boat(100.0, 100.0, 0.0, Tack::Port);
        let (heading, tack) = course_to(&b, Vec2::new(200.0, 100.0), 0.0);
        assert!((heading - 90.0).abs() < 1e-9);
        assert!(!tack);
    }

    #[test]
    fn beats_on_the_current_tack_then_tacks() {
        // Waypoint dead upwind: hold port close-hauled
        let b = ai_boat(400.0, 400.0, 45.0, Tack::Port);
        let (heading, tack) = course_to(&b, Vec2::new(400.0, 100.0), 0.0);
        assert_eq!(heading, 45.0);
        assert!(!tack);

        // Waypoint now 20° left of the wind: tack onto starboard
        let b = ai_boat(400.0, 400.0, 45.0, Tack::Port);
        let target = b.pos.add(&Vec2::from_bearing(340.0).scale(200.0));
        let (heading, tack) = course_to(&b, target, 0.0);
        assert!(tack);
        assert_eq!(heading, 315.0);
    }

    #[test]
    fn luffs_outside_racing_and_after_finishing() {
        let course = Course::default();
        let tuning = PhysicsTuning::default();
        let mut b = ai_boat(400.0, 400.0, 45.0, Tack::Port);
        b.trim_mode = TrimMode::Full;
        steer(&mut b, &course, RacePhase::Starting, 0.0, &tuning, 0.1);
        assert_eq!(b.trim_mode, TrimMode::Luff);
        assert_eq!(b.heading, 45.0);

        b.stage = RaceStage::Finished;
        steer(&mut b, &course, RacePhase::Racing, 0.0, &tuning, 0.1);
        assert_eq!(b.trim_mode, TrimMode::Luff);
    }

    #[test]
    fn turns_are_rate_limited() {
        let course = Course::default();
        let tuning = PhysicsTuning::default();
        let mut b = ai_boat(100.0, 200.0, 0.0, Tack::Port);
        b.stage = RaceStage::DownwindLeg;
        steer(&mut b, &course, RacePhase::Racing, 0.0, &tuning, 0.1);
        assert_eq!(b.trim_mode, TrimMode::Full);
        assert!((angle_diff(0.0, b.heading).abs() - 9.0).abs() < 1e-9);
    }
}
