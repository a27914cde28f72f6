//! collision.rs — Boat/boat, boat/mark and boat/buoy overlap resolution
//!
//! Detection runs against a snapshot of pre-resolution positions so one
//! correction can never hide another overlap in the same tick. Corrections
//! are accumulated per boat and applied afterwards. Marks and line buoys are
//! immovable; the boat takes the whole push.

use tracing::debug;

use regatta_types::{BoatId, CollisionKind, Course, RaceEvent, RaceStage, Vec2};

use crate::boat_sim::Boat;
use crate::tuning::PhysicsTuning;

/// Fallback separation axis for exactly coincident centres
const COINCIDENT_NORMAL: Vec2 = Vec2 { x: 1.0, y: 0.0 };

/// One resolved overlap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub kind: CollisionKind,
    pub boat: BoatId,
    pub other: Option<BoatId>,
}

impl Contact {
    pub fn into_event(self) -> RaceEvent {
        RaceEvent::Collision { kind: self.kind, boat: self.boat, other: self.other }
    }
}

/// Unit vector from `from` to `to`, or the fallback axis when they coincide
fn separation_normal(from: Vec2, to: Vec2) -> Vec2 {
    to.sub(&from).normalized().unwrap_or(COINCIDENT_NORMAL)
}

/// Push distance for an overlap: a share of the penetration, with a floor so
/// shallow contacts still separate visibly.
pub fn push_distance(radius_sum: f64, distance: f64, min_radius: f64, push_ratio: f64) -> f64 {
    ((radius_sum - distance) * push_ratio).max(min_radius * 0.25)
}

/// Finished boats are out of the way of the fleet
fn is_active(boat: &Boat) -> bool {
    boat.stage != RaceStage::Finished
}

/// Resolve every overlap among `boats` and against the course's marks and
/// line buoys. Returns one contact per resolved pair.
pub fn resolve(boats: &mut [Boat], course: &Course, tuning: &PhysicsTuning) -> Vec<Contact> {
    let r = tuning.boat_radius;
    let candidates: Vec<(BoatId, Vec2, bool)> =
        boats.iter().map(|b| (b.id, b.pos, is_active(b))).collect();
    let mut corrections = vec![Vec2::ZERO; boats.len()];
    let mut hits = vec![0u32; boats.len()];
    let mut contacts = Vec::new();

    // ── Boat / boat ──────────────────────────────────────────────────────────
    for i in 0..candidates.len() {
        let (id_a, pos_a, active_a) = candidates[i];
        if !active_a {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            let (id_b, pos_b, active_b) = candidates[j];
            if !active_b {
                continue;
            }
            let radius_sum = r + r;
            let dist = pos_a.dist(&pos_b);
            if dist >= radius_sum {
                continue;
            }
            let normal = separation_normal(pos_a, pos_b);
            let push = push_distance(radius_sum, dist, r, tuning.collision_push_ratio);
            corrections[i] = corrections[i].sub(&normal.scale(push));
            corrections[j] = corrections[j].add(&normal.scale(push));
            hits[i] += 1;
            hits[j] += 1;
            debug!(a = %id_a, b = %id_b, overlap = radius_sum - dist, "boat collision");
            contacts.push(Contact { kind: CollisionKind::BoatBoat, boat: id_a, other: Some(id_b) });
        }
    }

    // ── Boat / fixed obstacles ───────────────────────────────────────────────
    let marks = course.marks.iter().map(|m| (m.pos, m.radius, CollisionKind::BoatMark));
    let buoys = course.line.buoys().into_iter().map(|p| (p, course.line.buoy_radius, CollisionKind::BoatBuoy));
    let obstacles: Vec<(Vec2, f64, CollisionKind)> = marks.chain(buoys).collect();

    for (i, &(id, pos, active)) in candidates.iter().enumerate() {
        if !active {
            continue;
        }
        for &(at, radius, kind) in &obstacles {
            let radius_sum = r + radius;
            let dist = pos.dist(&at);
            if dist >= radius_sum {
                continue;
            }
            let normal = separation_normal(at, pos);
            // The obstacle's share goes to the boat as well
            let push = 2.0 * push_distance(radius_sum, dist, r.min(radius), tuning.collision_push_ratio);
            corrections[i] = corrections[i].add(&normal.scale(push));
            hits[i] += 1;
            debug!(boat = %id, ?kind, "obstacle collision");
            contacts.push(Contact { kind, boat: id, other: None });
        }
    }

    for ((boat, correction), n) in boats.iter_mut().zip(corrections).zip(hits) {
        if n == 0 {
            continue;
        }
        boat.pos = boat.pos.add(&correction);
        boat.speed = (boat.speed * tuning.collision_damping.powi(n as i32)).max(0.0);
    }

    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boat_sim::BoatEntry;

    fn boat(id: u32, x: f64, y: f64) -> Boat {
        let entry = BoatEntry { user_id: format!("u{id}"), name: format!("B{id}"), is_local: true };
        let mut b = Boat::new(BoatId(id), id, &entry, Vec2::new(x, y), 0.0);
        b.stage = RaceStage::UpwindLeg;
        b.speed = 4.0;
        b
    }

    #[test]
    fn overlapping_boats_separate_fully_and_both_lose_speed() {
        let tuning = PhysicsTuning::default();
        let course = Course::default();
        let mut boats = vec![boat(1, 600.0, 200.0), boat(2, 620.0, 200.0)];

        let contacts = resolve(&mut boats, &course, &tuning);

        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].kind, CollisionKind::BoatBoat);
        assert!(boats[0].pos.dist(&boats[1].pos) >= 2.0 * tuning.boat_radius);
        assert!((boats[0].speed - 4.0 * 0.95).abs() < 1e-9);
        assert_eq!(boats[0].speed, boats[1].speed);
        // Pushed apart along the line of centres, equal and opposite
        assert!((boats[0].pos.x - 600.0 + (boats[1].pos.x - 620.0)).abs() < 1e-9);
    }

    #[test]
    fn shallow_contact_uses_minimum_push() {
        let tuning = PhysicsTuning::default();
        let mut boats = vec![boat(1, 600.0, 200.0), boat(2, 629.0, 200.0)];
        resolve(&mut boats, &Course::default(), &tuning);
        // max(1 × 0.75, 15 × 0.25) = 3.75 each way
        assert!((boats[0].pos.x - 596.25).abs() < 1e-9);
        assert!((boats[1].pos.x - 632.75).abs() < 1e-9);
    }

    #[test]
    fn coincident_boats_still_separate() {
        let tuning = PhysicsTuning::default();
        let mut boats = vec![boat(1, 600.0, 200.0), boat(2, 600.0, 200.0)];
        resolve(&mut boats, &Course::default(), &tuning);
        assert!(boats[0].pos.dist(&boats[1].pos) >= 2.0 * tuning.boat_radius);
    }

    #[test]
    fn marks_do_not_move() {
        let tuning = PhysicsTuning::default();
        let course = Course::default();
        let mark = course.marks[0].pos;
        let mut boats = vec![boat(1, mark.x, mark.y + 20.0)];

        let contacts = resolve(&mut boats, &course, &tuning);

        assert_eq!(contacts, vec![Contact { kind: CollisionKind::BoatMark, boat: BoatId(1), other: None }]);
        assert_eq!(course.marks[0].pos, mark);
        assert!(boats[0].pos.y > mark.y + 20.0);
    }

    #[test]
    fn boat_deep_inside_a_mark_is_pushed_clear() {
        let tuning = PhysicsTuning::default();
        let course = Course::default();
        let mark = course.marks[0];
        let mut boats = vec![boat(1, mark.pos.x, mark.pos.y + 5.0)];

        resolve(&mut boats, &course, &tuning);

        assert!(boats[0].pos.dist(&mark.pos) >= tuning.boat_radius + mark.radius);
        // Clear on the next tick: no further contact, no further damping
        let speed = boats[0].speed;
        assert!(resolve(&mut boats, &course, &tuning).is_empty());
        assert_eq!(boats[0].speed, speed);
    }

    #[test]
    fn line_buoys_push_boats() {
        let tuning = PhysicsTuning::default();
        let course = Course::default();
        let buoy = course.line.a;
        let mut boats = vec![boat(1, buoy.x - 10.0, buoy.y)];
        let contacts = resolve(&mut boats, &course, &tuning);
        assert_eq!(contacts[0].kind, CollisionKind::BoatBuoy);
        assert!(boats[0].pos.x < buoy.x - 10.0);
    }

    #[test]
    fn detection_uses_pre_resolution_positions() {
        let tuning = PhysicsTuning::default();
        // Middle boat overlaps both neighbours; both contacts must be seen
        let mut boats = vec![boat(1, 570.0, 200.0), boat(2, 595.0, 200.0), boat(3, 620.0, 200.0)];
        let contacts = resolve(&mut boats, &Course::default(), &tuning);
        assert_eq!(contacts.len(), 2);
        assert!((boats[1].speed - 4.0 * 0.95 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn finished_boats_are_ignored() {
        let tuning = PhysicsTuning::default();
        let mut boats = vec![boat(1, 600.0, 200.0), boat(2, 610.0, 200.0)];
        boats[1].stage = RaceStage::Finished;
        assert!(resolve(&mut boats, &Course::default(), &tuning).is_empty());
    }
}
