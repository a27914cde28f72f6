//! # regatta-types
//!
//! Shared data structures for the Regatta sailing race simulator.
//!
//! These types are used by:
//! - `regatta-sim`: the race physics and progression engine
//! - render layers: read-only `RaceSnapshot` consumed every frame
//! - persistence layers: `FinishRecord` emitted on each legitimate finish
//!
//! ## Coordinate Conventions
//!
//! - **Course frame**: screen pixels, X = right, Y = down
//! - **Bearings**: compass degrees in [0, 360), 0 = North (up the screen), 90 = East
//! - **Wind direction**: bearing the wind blows *from*
//! - **Current direction**: bearing the current sets *from* (water flows toward +180°)

use serde::{Deserialize, Serialize};

// ── 2D Vector ────────────────────────────────────────────────────────────────

/// 2D vector in the course frame (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }

    /// Unit vector for a compass bearing on screen axes: (sin θ, −cos θ)
    pub fn from_bearing(deg: f64) -> Self {
        let rad = deg.to_radians();
        Self::new(rad.sin(), -rad.cos())
    }

    pub fn add(&self, other: &Vec2) -> Vec2 { Vec2::new(self.x + other.x, self.y + other.y) }
    pub fn sub(&self, other: &Vec2) -> Vec2 { Vec2::new(self.x - other.x, self.y - other.y) }
    pub fn scale(&self, s: f64) -> Vec2 { Vec2::new(self.x * s, self.y * s) }
    pub fn dot(&self, other: &Vec2) -> f64 { self.x * other.x + self.y * other.y }
    pub fn length(&self) -> f64 { (self.x * self.x + self.y * self.y).sqrt() }
    pub fn dist(&self, other: &Vec2) -> f64 { self.sub(other).length() }

    /// Unit vector in the same direction, or None for a (near) zero vector
    pub fn normalized(&self) -> Option<Vec2> {
        let len = self.length();
        if len < 1e-9 { None } else { Some(self.scale(1.0 / len)) }
    }
}

// ── Compass helpers ──────────────────────────────────────────────────────────

/// Wrap any angle into [0, 360).
pub fn normalize_deg(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

/// Signed shortest rotation from `from` to `to`, in (−180, 180].
pub fn angle_diff(from: f64, to: f64) -> f64 {
    let d = normalize_deg(to - from);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Unsigned angle between two bearings, folded to [0, 180].
pub fn angle_between(a: f64, b: f64) -> f64 {
    angle_diff(a, b).abs()
}

/// Compass bearing from `from` toward `to`.
pub fn bearing_to(from: Vec2, to: Vec2) -> f64 {
    let d = to.sub(&from);
    normalize_deg(d.x.atan2(-d.y).to_degrees())
}

// ── Identity ─────────────────────────────────────────────────────────────────

/// Stable boat identifier (arena index key, never reused within a session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoatId(pub u32);

impl std::fmt::Display for BoatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boat#{}", self.0)
    }
}

// ── Sailing state ────────────────────────────────────────────────────────────

/// Which side of the boat the wind crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tack {
    Port,
    #[default]
    Starboard,
}

impl Tack {
    pub fn flipped(self) -> Self {
        match self {
            Tack::Port => Tack::Starboard,
            Tack::Starboard => Tack::Port,
        }
    }
}

/// Per-boat course progress. Strictly ordered; transitions never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RaceStage {
    #[default]
    NotStarted = 0,
    StartLeg = 1,
    UpwindLeg = 2,
    DownwindLeg = 3,
    SecondUpwindLeg = 4,
    FinishLeg = 5,
    Finished = 6,
}

impl RaceStage {
    pub fn index(self) -> u8 { self as u8 }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::StartLeg),
            Self::StartLeg => Some(Self::UpwindLeg),
            Self::UpwindLeg => Some(Self::DownwindLeg),
            Self::DownwindLeg => Some(Self::SecondUpwindLeg),
            Self::SecondUpwindLeg => Some(Self::FinishLeg),
            Self::FinishLeg => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

/// Race-wide phase. Forward only, except an explicit reset to PreStart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RacePhase {
    #[default]
    PreStart,
    Starting,
    Racing,
    Finished,
}

// ── Course Elements ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkRole {
    Windward,
    Leeward,
}

/// A fixed course buoy that must be rounded in sequence
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Mark {
    pub pos: Vec2,
    pub radius: f64,
    pub role: MarkRole,
}

/// Start/finish line: two endpoints, each carrying a boundary buoy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CourseLine {
    pub a: Vec2,
    pub b: Vec2,
    pub buoy_radius: f64,
}

impl CourseLine {
    /// Line Y (the course line is laid square to the screen axes)
    pub fn y(&self) -> f64 { (self.a.y + self.b.y) / 2.0 }
    pub fn min_x(&self) -> f64 { self.a.x.min(self.b.x) }
    pub fn max_x(&self) -> f64 { self.a.x.max(self.b.x) }
    pub fn midpoint(&self) -> Vec2 { Vec2::new((self.a.x + self.b.x) / 2.0, self.y()) }
    pub fn buoys(&self) -> [Vec2; 2] { [self.a, self.b] }
}

/// Race course. Geometry is fixed for the duration of a race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub width: f64,
    pub height: f64,
    /// Shared start and finish line
    pub line: CourseLine,
    /// Ordered marks: windward first, then leeward
    pub marks: Vec<Mark>,
}

impl Course {
    /// Standard triangle: line across the lower middle, windward mark near the
    /// top, leeward mark down and to the left of the line.
    pub fn triangle(width: f64, height: f64) -> Self {
        let line_y = height * 7.0 / 12.0;
        let half_line = width * 0.125;
        let mid_x = width / 2.0;
        Self {
            width,
            height,
            line: CourseLine {
                a: Vec2::new(mid_x - half_line, line_y),
                b: Vec2::new(mid_x + half_line, line_y),
                buoy_radius: 8.0,
            },
            marks: vec![
                Mark {
                    pos: Vec2::new(mid_x, height * 2.0 / 15.0),
                    radius: 10.0,
                    role: MarkRole::Windward,
                },
                Mark {
                    pos: Vec2::new(width * 0.275, height * 4.0 / 5.0),
                    radius: 10.0,
                    role: MarkRole::Leeward,
                },
            ],
        }
    }

    /// First mark with the given role, with its index in `marks`
    pub fn mark(&self, role: MarkRole) -> Option<(usize, &Mark)> {
        self.marks.iter().enumerate().find(|(_, m)| m.role == role)
    }

    pub fn bounds(&self) -> Vec2 { Vec2::new(self.width, self.height) }
}

impl Default for Course {
    fn default() -> Self { Self::triangle(800.0, 600.0) }
}

// ── Results ──────────────────────────────────────────────────────────────────

/// One ranked finisher. Ranks are reassigned 1..N whenever a result is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub user_id: String,
    pub boat_id: BoatId,
    pub boat_number: u32,
    pub finish_time_ms: u64,
    pub rank: u32,
}

/// Emitted once per legitimate finish, for an external store to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRecord {
    pub user_id: String,
    pub boat_number: u32,
    pub finish_position: u32,
    pub finish_time_ms: u64,
}

// ── Events (audio cues, persistence hooks) ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollisionKind {
    BoatBoat,
    BoatMark,
    BoatBuoy,
}

/// Discrete fire-and-forget events raised during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RaceEvent {
    PhaseChanged { from: RacePhase, to: RacePhase },
    StageChanged { boat: BoatId, from: RaceStage, to: RaceStage },
    Collision { kind: CollisionKind, boat: BoatId, other: Option<BoatId> },
    BoatFinished(FinishRecord),
    /// Boat reached the finish region without completing the leg sequence
    PrematureFinish { boat: BoatId, from: RaceStage },
}

// ── Snapshot (engine → render layer, every frame) ────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatSnapshot {
    pub id: BoatId,
    pub boat_number: u32,
    pub user_id: String,
    pub name: String,
    pub is_local: bool,
    pub pos: Vec2,
    pub heading: f64,
    pub speed: f64,
    pub tack: Tack,
    pub sail_trim: f64,
    pub stage: RaceStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mark: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindCellSnapshot {
    pub pos: Vec2,
    pub radius: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindSnapshot {
    pub direction: f64,
    pub strength: f64,
    pub current_direction: f64,
    pub current_strength: f64,
    pub cells: Vec<WindCellSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuffSnapshot {
    pub pos: Vec2,
    pub half_width: f64,
    pub half_height: f64,
    pub strength: f64,
    pub opacity: f64,
}

/// Complete post-tick state for a draw layer. Never mutated by readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshot {
    pub venue: String,
    pub phase: RacePhase,
    pub clock: f64,
    pub countdown_remaining: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub paused: bool,
    pub boats: Vec<BoatSnapshot>,
    pub wind: WindSnapshot,
    pub puffs: Vec<PuffSnapshot>,
    pub course: Course,
    pub results: Vec<RaceResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearing_vectors_follow_screen_axes() {
        let north = Vec2::from_bearing(0.0);
        assert!(north.x.abs() < 1e-9 && (north.y + 1.0).abs() < 1e-9);
        let east = Vec2::from_bearing(90.0);
        assert!((east.x - 1.0).abs() < 1e-9 && east.y.abs() < 1e-9);
    }

    #[test]
    fn angle_helpers_wrap_through_north() {
        assert_eq!(normalize_deg(-10.0), 350.0);
        assert_eq!(normalize_deg(360.0), 0.0);
        assert!((angle_diff(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((angle_diff(10.0, 350.0) + 20.0).abs() < 1e-9);
        assert!((angle_between(170.0, 190.0) - 20.0).abs() < 1e-9);
        assert!((bearing_to(Vec2::new(0.0, 0.0), Vec2::new(0.0, -5.0))).abs() < 1e-9);
        assert!((bearing_to(Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0)) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn stage_order_is_total_and_ends_at_finished() {
        let mut stage = RaceStage::NotStarted;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(stage, RaceStage::Finished);
        assert_eq!(RaceStage::Finished.index(), 6);
    }

    #[test]
    fn triangle_course_has_line_between_marks() {
        let course = Course::default();
        let (_, windward) = course.mark(MarkRole::Windward).unwrap();
        let (_, leeward) = course.mark(MarkRole::Leeward).unwrap();
        assert!(windward.pos.y < course.line.y());
        assert!(leeward.pos.y > course.line.y());
        assert_eq!(course.line.y(), 350.0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = RaceEvent::StageChanged {
            boat: BoatId(1),
            from: RaceStage::StartLeg,
            to: RaceStage::UpwindLeg,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "STAGE_CHANGED");
        assert_eq!(json["to"], "UPWIND_LEG");
    }
}
