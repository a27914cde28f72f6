//! race.rs — Race orchestrator
//!
//! Owns the fleet, the course, the phase machine and the ranked results.
//! Phase only moves forward (PreStart → Starting → Racing → Finished) except
//! for an explicit reset. Boats finish independently; the race is over once
//! every boat still in contention holds a result.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use regatta_types::{
    BoatId, Course, FinishRecord, RaceEvent, RacePhase, RaceResult, RaceStage, Vec2,
};

use crate::boat_sim::{Boat, BoatEntry};
use crate::config::MAX_BOATS;
use crate::error::SimError;

/// Boats spawn this far below the line, pixels
const SPAWN_OFFSET_Y: f64 = 40.0;
/// Pre-start heading: starboard close-hauled under a northerly
const SPAWN_HEADING: f64 = 45.0;

#[derive(Debug, Clone)]
pub struct Race {
    phase: RacePhase,
    /// Session clock at the gun
    start_time: Option<f64>,
    countdown_secs: f64,
    countdown_remaining: f64,
    course: Course,
    boats: Vec<Boat>,
    results: Vec<RaceResult>,
    /// (user_id, boat_number) pairs that already hold a result
    recorded: HashSet<(String, u32)>,
    entries: Vec<BoatEntry>,
    events: Vec<RaceEvent>,
}

impl Race {
    pub fn new(course: Course, entries: Vec<BoatEntry>, countdown_secs: f64) -> Result<Self, SimError> {
        if entries.is_empty() || entries.len() > MAX_BOATS {
            return Err(SimError::InvalidBoatCount { count: entries.len(), max: MAX_BOATS });
        }
        let boats = spawn_fleet(&course, &entries);
        Ok(Self {
            phase: RacePhase::PreStart,
            start_time: None,
            countdown_secs,
            countdown_remaining: countdown_secs,
            course,
            boats,
            results: Vec::new(),
            recorded: HashSet::new(),
            entries,
            events: Vec::new(),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn phase(&self) -> RacePhase { self.phase }
    pub fn start_time(&self) -> Option<f64> { self.start_time }
    pub fn countdown_remaining(&self) -> f64 { self.countdown_remaining }
    pub fn course(&self) -> &Course { &self.course }
    pub fn boats(&self) -> &[Boat] { &self.boats }
    pub fn results(&self) -> &[RaceResult] { &self.results }

    pub(crate) fn boats_mut(&mut self) -> &mut [Boat] { &mut self.boats }

    /// Fleet and course borrowed together for per-boat geometry checks
    pub(crate) fn fleet_on_course(&mut self) -> (&mut [Boat], &Course) {
        (&mut self.boats, &self.course)
    }

    pub fn boat(&self, id: BoatId) -> Option<&Boat> {
        self.boats.iter().find(|b| b.id == id)
    }

    pub(crate) fn boat_mut(&mut self, id: BoatId) -> Option<&mut Boat> {
        self.boats.iter_mut().find(|b| b.id == id)
    }

    /// Milliseconds since the gun, if it has gone
    pub fn elapsed_ms(&self, clock: f64) -> Option<u64> {
        self.start_time.map(|t| to_millis(clock - t))
    }

    pub(crate) fn drain_events(&mut self) -> impl Iterator<Item = RaceEvent> + '_ {
        self.events.drain(..)
    }

    // ── Phase machine ────────────────────────────────────────────────────────

    fn set_phase(&mut self, to: RacePhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        info!(?from, ?to, "race phase");
        self.events.push(RaceEvent::PhaseChanged { from, to });
    }

    fn set_stage(&mut self, index: usize, to: RaceStage) {
        let boat = &mut self.boats[index];
        let from = boat.stage;
        if to <= from {
            return;
        }
        boat.stage = to;
        self.events.push(RaceEvent::StageChanged { boat: boat.id, from, to });
    }

    /// PreStart → Starting with a full countdown. Ignored in any other phase.
    pub fn start_countdown(&mut self) {
        if self.phase != RacePhase::PreStart {
            debug!(phase = ?self.phase, "countdown request ignored");
            return;
        }
        self.countdown_remaining = self.countdown_secs;
        self.set_phase(RacePhase::Starting);
    }

    /// Fire the gun. Callable straight from PreStart to skip the countdown.
    pub fn start_race(&mut self, clock: f64) {
        if !matches!(self.phase, RacePhase::PreStart | RacePhase::Starting) {
            debug!(phase = ?self.phase, "start request ignored");
            return;
        }
        self.countdown_remaining = 0.0;
        self.start_time = Some(clock);
        self.set_phase(RacePhase::Racing);
        for i in 0..self.boats.len() {
            if self.boats[i].stage == RaceStage::NotStarted {
                self.set_stage(i, RaceStage::StartLeg);
            }
        }
    }

    /// Count down by `dt`; the gun fires at zero, timed at `clock`.
    pub fn tick_countdown(&mut self, dt: f64, clock: f64) {
        if self.phase != RacePhase::Starting {
            return;
        }
        self.countdown_remaining = (self.countdown_remaining - dt).max(0.0);
        if self.countdown_remaining <= 0.0 {
            self.start_race(clock);
        }
    }

    /// Record a finish for `id` at session time `clock`.
    ///
    /// Boats that never went through FinishLeg are marked Finished without a
    /// result. Unknown boats, boats that have not started, and repeat
    /// attempts are no-ops.
    pub fn finish_race(&mut self, id: BoatId, clock: f64) -> Option<FinishRecord> {
        if self.phase != RacePhase::Racing {
            debug!(boat = %id, phase = ?self.phase, "finish outside racing ignored");
            return None;
        }
        let Some(index) = self.boats.iter().position(|b| b.id == id) else {
            debug!(boat = %id, "finish for unknown boat ignored");
            return None;
        };
        let boat = &self.boats[index];
        if boat.stage == RaceStage::NotStarted {
            return None;
        }
        let key = (boat.user_id.clone(), boat.boat_number);
        if self.recorded.contains(&key) {
            warn!(boat = %id, "duplicate finish ignored");
            return None;
        }

        if !boat.passed_finish_leg {
            let from = boat.stage;
            if from == RaceStage::Finished {
                return None;
            }
            warn!(boat = %id, ?from, "premature finish: course not completed, no result");
            self.set_stage(index, RaceStage::Finished);
            self.events.push(RaceEvent::PrematureFinish { boat: id, from });
            self.check_completion();
            return None;
        }

        self.set_stage(index, RaceStage::Finished);
        let boat = &self.boats[index];
        let finish_time_ms = self.elapsed_ms(clock).unwrap_or(0);
        self.results.push(RaceResult {
            user_id: boat.user_id.clone(),
            boat_id: boat.id,
            boat_number: boat.boat_number,
            finish_time_ms,
            rank: 0,
        });
        self.recorded.insert(key);
        rank_results(&mut self.results);

        let finish_position = self
            .results
            .iter()
            .find(|r| r.boat_id == id)
            .map_or(self.results.len() as u32, |r| r.rank);
        let record = FinishRecord {
            user_id: boat.user_id.clone(),
            boat_number: boat.boat_number,
            finish_position,
            finish_time_ms,
        };
        info!(boat = %id, position = finish_position, time_ms = finish_time_ms, "boat finished");
        self.events.push(RaceEvent::BoatFinished(record.clone()));
        self.check_completion();
        Some(record)
    }

    /// Boats still able to earn a result: everyone except premature finishers
    fn contenders(&self) -> usize {
        self.boats
            .iter()
            .filter(|b| b.stage != RaceStage::Finished || b.passed_finish_leg)
            .count()
    }

    fn check_completion(&mut self) {
        if self.phase == RacePhase::Racing && self.results.len() >= self.contenders() {
            self.set_phase(RacePhase::Finished);
        }
    }

    /// Back to PreStart: fresh fleet from the original entries, no results.
    pub fn reset(&mut self) {
        self.boats = spawn_fleet(&self.course, &self.entries);
        self.results.clear();
        self.recorded.clear();
        self.start_time = None;
        self.countdown_remaining = self.countdown_secs;
        self.set_phase(RacePhase::PreStart);
    }
}

/// Sort by finish time and reassign ranks 1..N. Ties keep boat-number order.
pub fn rank_results(results: &mut [RaceResult]) {
    results.sort_by(|a, b| {
        a.finish_time_ms
            .cmp(&b.finish_time_ms)
            .then(a.boat_number.cmp(&b.boat_number))
    });
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = i as u32 + 1;
    }
}

fn to_millis(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

/// Line up the fleet below the start line, evenly spaced across its width.
fn spawn_fleet(course: &Course, entries: &[BoatEntry]) -> Vec<Boat> {
    let line = &course.line;
    let gap = (line.max_x() - line.min_x()) / (entries.len() as f64 + 1.0);
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let number = i as u32 + 1;
            let pos = Vec2::new(line.min_x() + gap * number as f64, line.y() + SPAWN_OFFSET_Y);
            Boat::new(BoatId(number), number, entry, pos, SPAWN_HEADING)
        })
        .collect()
}
