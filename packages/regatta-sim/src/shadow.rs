//! shadow.rs — Wind shadow cast downwind of each boat
//!
//! A boat's sails disturb a cone of air that extends downwind of it. Any other
//! boat inside that cone sails in reduced wind. Shadows do not stack.

use regatta_types::{BoatId, Vec2};

/// Half-width of the cone grows at this rate per pixel downwind
const CONE_SPREAD: f64 = 0.5;

/// True when `target` sits inside the shadow cone cast by `source`.
///
/// `downwind_bearing` is the direction the air flows (wind direction + 180),
/// not the source boat's heading: the cone always trails straight downwind,
/// whichever way the source is pointing.
/// The cone starts at the source and reaches `length` pixels downwind; its
/// half-width at distance `d` along the axis is `d × 0.5`.
pub fn is_shadowed(target: Vec2, source: Vec2, downwind_bearing: f64, length: f64) -> bool {
    let axis = Vec2::from_bearing(downwind_bearing);
    let offset = target.sub(&source);
    let along = offset.dot(&axis);
    if along <= 0.0 || along > length {
        return false;
    }
    // Perpendicular component on screen axes
    let lateral = offset.x * axis.y - offset.y * axis.x;
    lateral.abs() < along * CONE_SPREAD
}

/// Wind multiplier for `target`: `penalty` if any other boat shadows it, else 1.0.
pub fn shadow_factor(
    target: BoatId,
    positions: &[(BoatId, Vec2)],
    wind_direction: f64,
    length: f64,
    penalty: f64,
) -> f64 {
    if positions.len() < 2 {
        return 1.0;
    }
    let Some(&(_, at)) = positions.iter().find(|(id, _)| *id == target) else {
        return 1.0;
    };
    let downwind = wind_direction + 180.0;
    let covered = positions
        .iter()
        .filter(|(id, _)| *id != target)
        .any(|(_, src)| is_shadowed(at, *src, downwind, length));
    if covered { penalty } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cone_extends_downwind_only() {
        let source = Vec2::new(400.0, 300.0);
        // Wind from North flows South: shadow lies below the source on screen
        assert!(is_shadowed(Vec2::new(400.0, 400.0), source, 180.0, 150.0));
        assert!(!is_shadowed(Vec2::new(400.0, 200.0), source, 180.0, 150.0));
        assert!(!is_shadowed(Vec2::new(400.0, 460.0), source, 180.0, 150.0));
        assert!(!is_shadowed(source, source, 180.0, 150.0));
    }

    #[test]
    fn cone_widens_with_distance() {
        let source = Vec2::new(400.0, 300.0);
        assert!(is_shadowed(Vec2::new(440.0, 400.0), source, 180.0, 150.0));
        assert!(!is_shadowed(Vec2::new(460.0, 400.0), source, 180.0, 150.0));
        assert!(!is_shadowed(Vec2::new(420.0, 320.0), source, 180.0, 150.0));
    }

    #[test]
    fn penalty_does_not_stack() {
        let positions = [
            (BoatId(1), Vec2::new(400.0, 400.0)),
            (BoatId(2), Vec2::new(400.0, 300.0)),
            (BoatId(3), Vec2::new(405.0, 320.0)),
        ];
        assert_eq!(shadow_factor(BoatId(1), &positions, 0.0, 150.0, 0.7), 0.7);
        assert_eq!(shadow_factor(BoatId(2), &positions, 0.0, 150.0, 0.7), 1.0);
    }

    #[test]
    fn lone_boat_is_never_shadowed() {
        let positions = [(BoatId(1), Vec2::new(400.0, 400.0))];
        assert_eq!(shadow_factor(BoatId(1), &positions, 0.0, 150.0, 0.7), 1.0);
    }
}
