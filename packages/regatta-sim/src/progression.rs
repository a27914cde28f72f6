//! progression.rs — Per-boat course-leg state machine
//!
//! Stage transitions are one-way and fire on the first tick their geometric
//! predicate holds. Each boat is judged on its own position and heading only.
//!
//! | From            | Gate                                                   |
//! |-----------------|--------------------------------------------------------|
//! | StartLeg        | on the line, inside the buoys by a radius, heading up  |
//! | UpwindLeg       | at/above windward Y, within 2 radii of its X           |
//! | DownwindLeg     | at/below leeward Y, within 2 radii of its X            |
//! | SecondUpwindLeg | windward again                                         |
//! | FinishLeg       | on the line, between its endpoints                     |
//!
//! `NotStarted → StartLeg` is not geometric; the orchestrator applies it when
//! the race phase becomes Racing.

use tracing::debug;

use regatta_types::{Course, MarkRole, RaceStage};

use crate::boat_sim::Boat;
use crate::tuning::PhysicsTuning;

/// Upwind arc used by the start gate: anything roughly North
pub fn is_heading_upwind(heading: f64) -> bool {
    heading > 260.0 || heading < 100.0
}

/// Diagnostic only: the finish gate does not enforce direction
pub fn is_heading_downward(heading: f64) -> bool {
    heading > 90.0 && heading < 270.0
}

fn on_line(boat: &Boat, course: &Course, tuning: &PhysicsTuning) -> bool {
    (boat.pos.y - course.line.y()).abs() < tuning.line_tolerance
}

fn rounded(boat: &Boat, course: &Course, role: MarkRole, tuning: &PhysicsTuning) -> Option<usize> {
    let (index, mark) = course.mark(role)?;
    let near_x = (boat.pos.x - mark.pos.x).abs() < 2.0 * tuning.boat_radius;
    let reached_y = match role {
        MarkRole::Windward => boat.pos.y <= mark.pos.y,
        MarkRole::Leeward => boat.pos.y >= mark.pos.y,
    };
    (near_x && reached_y).then_some(index)
}

/// Stage the boat should move to this tick, with the mark index rounded if
/// the gate was a mark. `None` when no gate is satisfied.
pub fn check_transition(
    boat: &Boat,
    course: &Course,
    tuning: &PhysicsTuning,
) -> Option<(RaceStage, Option<usize>)> {
    let line = &course.line;
    match boat.stage {
        RaceStage::StartLeg => {
            let inside = boat.pos.x > line.min_x() + tuning.boat_radius
                && boat.pos.x < line.max_x() - tuning.boat_radius;
            (on_line(boat, course, tuning) && inside && is_heading_upwind(boat.heading))
                .then_some((RaceStage::UpwindLeg, None))
        }
        RaceStage::UpwindLeg => rounded(boat, course, MarkRole::Windward, tuning)
            .map(|i| (RaceStage::DownwindLeg, Some(i))),
        RaceStage::DownwindLeg => rounded(boat, course, MarkRole::Leeward, tuning)
            .map(|i| (RaceStage::SecondUpwindLeg, Some(i))),
        RaceStage::SecondUpwindLeg => rounded(boat, course, MarkRole::Windward, tuning)
            .map(|i| (RaceStage::FinishLeg, Some(i))),
        RaceStage::FinishLeg => {
            let between = boat.pos.x > line.min_x() && boat.pos.x < line.max_x();
            if on_line(boat, course, tuning) && between {
                if !is_heading_downward(boat.heading) {
                    debug!(boat = %boat.id, heading = boat.heading, "finish accepted while not heading down the course");
                }
                Some((RaceStage::Finished, None))
            } else {
                None
            }
        }
        RaceStage::NotStarted | RaceStage::Finished => None,
    }
}

/// Apply at most one forward transition. Returns `(from, to)` when the stage moved.
pub fn advance(boat: &mut Boat, course: &Course, tuning: &PhysicsTuning) -> Option<(RaceStage, RaceStage)> {
    let (to, mark) = check_transition(boat, course, tuning)?;
    let from = boat.stage;
    if to <= from {
        return None;
    }
    boat.stage = to;
    if mark.is_some() {
        boat.last_mark = mark;
    }
    if to == RaceStage::FinishLeg {
        boat.passed_finish_leg = true;
    }
    debug!(boat = %boat.id, ?from, ?to, "stage transition");
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boat_sim::BoatEntry;
    use regatta_types::{BoatId, Vec2};

    fn boat_at(stage: RaceStage, x: f64, y: f64, heading: f64) -> Boat {
        let entry = BoatEntry { user_id: "u".into(), name: "B".into(), is_local: true };
        let mut b = Boat::new(BoatId(1), 1, &entry, Vec2::new(x, y), heading);
        b.stage = stage;
        b
    }

    #[test]
    fn start_gate_needs_line_margin_and_upwind_heading() {
        let course = Course::default();
        let tuning = PhysicsTuning::default();

        let b = boat_at(RaceStage::StartLeg, 400.0, 349.0, 0.0);
        assert_eq!(check_transition(&b, &course, &tuning), Some((RaceStage::UpwindLeg, None)));

        // Inside the buoys but within a boat radius of one
        let b = boat_at(RaceStage::StartLeg, 310.0, 349.0, 0.0);
        assert_eq!(check_transition(&b, &course, &tuning), None);

        let b = boat_at(RaceStage::StartLeg, 400.0, 349.0, 180.0);
        assert_eq!(check_transition(&b, &course, &tuning), None);

        let b = boat_at(RaceStage::StartLeg, 400.0, 340.0, 0.0);
        assert_eq!(check_transition(&b, &course, &tuning), None);
    }

    #[test]
    fn upwind_arc_is_generous() {
        assert!(is_heading_upwind(0.0));
        assert!(is_heading_upwind(99.0));
        assert!(is_heading_upwind(261.0));
        assert!(!is_heading_upwind(100.0));
        assert!(!is_heading_upwind(260.0));
    }

    #[test]
    fn mark_roundings_record_the_mark() {
        let course = Course::default();
        let tuning = PhysicsTuning::default();
        let (wi, windward) = course.mark(MarkRole::Windward).unwrap();
        let (li, leeward) = course.mark(MarkRole::Leeward).unwrap();

        let mut b = boat_at(RaceStage::UpwindLeg, windward.pos.x + 20.0, windward.pos.y, 0.0);
        assert_eq!(advance(&mut b, &course, &tuning), Some((RaceStage::UpwindLeg, RaceStage::DownwindLeg)));
        assert_eq!(b.last_mark, Some(wi));

        b.pos = Vec2::new(leeward.pos.x - 29.0, leeward.pos.y + 1.0);
        assert_eq!(advance(&mut b, &course, &tuning), Some((RaceStage::DownwindLeg, RaceStage::SecondUpwindLeg)));
        assert_eq!(b.last_mark, Some(li));

        b.pos = Vec2::new(windward.pos.x, windward.pos.y - 5.0);
        assert_eq!(advance(&mut b, &course, &tuning), Some((RaceStage::SecondUpwindLeg, RaceStage::FinishLeg)));
        assert!(b.passed_finish_leg);
    }

    #[test]
    fn windward_gate_rejects_wide_approach() {
        let course = Course::default();
        let tuning = PhysicsTuning::default();
        let (_, windward) = course.mark(MarkRole::Windward).unwrap();
        let b = boat_at(RaceStage::UpwindLeg, windward.pos.x + 30.0, windward.pos.y - 10.0, 0.0);
        assert_eq!(check_transition(&b, &course, &tuning), None);
    }

    #[test]
    fn finish_gate_is_permissive_about_heading() {
        let course = Course::default();
        let tuning = PhysicsTuning::default();
        let mut b = boat_at(RaceStage::FinishLeg, 305.0, 352.0, 0.0);
        assert_eq!(advance(&mut b, &course, &tuning), Some((RaceStage::FinishLeg, RaceStage::Finished)));
        assert_eq!(advance(&mut b, &course, &tuning), None);
        assert_eq!(b.stage, RaceStage::Finished);
    }

    #[test]
    fn line_crossing_mid_leg_does_not_finish() {
        let course = Course::default();
        let tuning = PhysicsTuning::default();
        let mut b = boat_at(RaceStage::UpwindLeg, 400.0, 350.0, 180.0);
        assert_eq!(advance(&mut b, &course, &tuning), None);
        assert_eq!(b.stage, RaceStage::UpwindLeg);
    }
}
