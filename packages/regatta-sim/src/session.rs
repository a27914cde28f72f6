//! session.rs — Simulation session: one object owning every piece of race state
//!
//! Tick order:
//!   1. queued control input
//!   2. wind shifts, cell walk, puff drift/spawn
//!   3. countdown
//!   4. autopilot helm for non-local boats
//!   5. kinematics (shadows judged on pre-tick positions)
//!   6. collisions
//!   7. stage progression and finishes
//!
//! A tick never fails. Readers only see whole ticks through `snapshot()`.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use regatta_types::{
    BoatId, Course, FinishRecord, RaceEvent, RacePhase, RaceSnapshot, RaceStage, Vec2, WindSnapshot,
};

use crate::autopilot;
use crate::boat_sim::{Boat, Helm, SailingConditions, TrimMode};
use crate::collision;
use crate::config::RaceConfig;
use crate::error::SimError;
use crate::gusts::{GustField, Puff};
use crate::progression;
use crate::race::Race;
use crate::shadow;
use crate::tuning::PhysicsTuning;
use crate::venue::VenueProfile;
use crate::wind::WindField;

/// Longest frame the engine will integrate in one step, seconds
pub const MAX_FRAME_DT: f64 = 0.1;
/// Wind cells take one random-walk step per this many seconds
const CELL_WALK_SECS: f64 = 1.0;

// ── Control input ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Helm(Helm),
    Tack,
    Trim(TrimMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub boat: BoatId,
    pub intent: Intent,
}

// ── Session ──────────────────────────────────────────────────────────────────

pub struct Simulation {
    venue: VenueProfile,
    tuning: PhysicsTuning,
    wind: WindField,
    gusts: GustField,
    race: Race,
    rng: StdRng,
    inputs: VecDeque<ControlInput>,
    events: Vec<RaceEvent>,
    /// Simulated seconds since the session began (pauses excluded)
    clock: f64,
    paused: bool,
    /// Swallow the first frame after a resume
    resume_guard: bool,
    shift_timer: f64,
    cell_timer: f64,
}

impl Simulation {
    pub fn new(cfg: &RaceConfig) -> Result<Self, SimError> {
        cfg.validate()?;
        let venue = VenueProfile::by_id(&cfg.venue)?;
        let course = Course::triangle(cfg.course_width, cfg.course_height);
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut wind = WindField::new(course.bounds());
        wind.initialize(&venue, 0.0, &mut rng);
        let gusts = GustField::new(course.bounds());
        let race = Race::new(course, cfg.boats.clone(), cfg.countdown_secs)?;

        info!(
            venue = venue.id,
            boats = cfg.boats.len(),
            seed = ?cfg.seed,
            wind_dir = wind.direction,
            wind_kn = wind.strength,
            current_kn = wind.current.strength,
            "race session ready"
        );

        Ok(Self {
            venue,
            tuning: cfg.tuning,
            wind,
            gusts,
            race,
            rng,
            inputs: VecDeque::new(),
            events: Vec::new(),
            clock: 0.0,
            paused: false,
            resume_guard: false,
            shift_timer: 0.0,
            cell_timer: 0.0,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn venue(&self) -> &VenueProfile { &self.venue }
    pub fn tuning(&self) -> &PhysicsTuning { &self.tuning }
    pub fn wind(&self) -> &WindField { &self.wind }
    pub fn gusts(&self) -> &GustField { &self.gusts }
    pub fn race(&self) -> &Race { &self.race }
    pub fn phase(&self) -> RacePhase { self.race.phase() }
    pub fn clock(&self) -> f64 { self.clock }
    pub fn is_paused(&self) -> bool { self.paused }

    pub fn boat(&self, id: BoatId) -> Option<&Boat> {
        self.race.boat(id)
    }

    // ── Host commands ────────────────────────────────────────────────────────

    /// Queue input for the start of the next tick
    pub fn queue_input(&mut self, input: ControlInput) {
        self.inputs.push_back(input);
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            info!(clock = self.clock, "simulation paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.resume_guard = true;
            info!(clock = self.clock, "simulation resumed");
        }
    }

    pub fn start_countdown(&mut self) {
        self.race.start_countdown();
        self.collect_race_events();
    }

    pub fn start_race(&mut self) {
        self.race.start_race(self.clock);
        self.collect_race_events();
    }

    /// Record a finish for `id` at the current clock. See [`Race::finish_race`].
    pub fn finish_race(&mut self, id: BoatId) -> Option<FinishRecord> {
        let record = self.race.finish_race(id, self.clock);
        self.collect_race_events();
        record
    }

    /// Fresh fleet, no results, new wind, back to PreStart
    pub fn reset_race(&mut self) {
        self.race.reset();
        self.gusts.clear();
        self.inputs.clear();
        self.wind.initialize(&self.venue, self.clock, &mut self.rng);
        self.shift_timer = 0.0;
        self.cell_timer = 0.0;
        self.collect_race_events();
        info!(venue = self.venue.id, "race reset");
    }

    /// Move a boat, e.g. to set up a drill. Stage and speed are untouched.
    pub fn reposition(&mut self, id: BoatId, pos: Vec2, heading: f64) -> bool {
        match self.race.boat_mut(id) {
            Some(boat) => {
                boat.pos = pos;
                boat.heading = regatta_types::normalize_deg(heading);
                true
            }
            None => false,
        }
    }

    /// Drop a puff onto the course. It drifts and expires like a spawned one.
    pub fn place_puff(&mut self, puff: Puff) {
        self.gusts.puffs.push(puff);
    }

    /// Events raised since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Frame loop ───────────────────────────────────────────────────────────

    /// Wall-clock delta to integrate this frame
    fn frame_delta(&mut self, raw: f64) -> f64 {
        if self.paused {
            return 0.0;
        }
        if self.resume_guard {
            self.resume_guard = false;
            return 0.0;
        }
        if !raw.is_finite() || raw <= 0.0 {
            return 0.0;
        }
        raw.min(MAX_FRAME_DT)
    }

    /// Advance the whole race by one frame of `raw_dt` wall-clock seconds.
    pub fn tick(&mut self, raw_dt: f64) {
        if self.paused {
            return;
        }
        self.apply_inputs();
        let dt = self.frame_delta(raw_dt);
        if dt <= 0.0 {
            return;
        }
        self.clock += dt;

        self.advance_fields(dt);
        self.race.tick_countdown(dt, self.clock);

        let phase = self.race.phase();
        self.run_autopilot(phase, dt);
        if matches!(phase, RacePhase::Starting | RacePhase::Racing) {
            self.sail(dt);
        }

        let (boats, course) = self.race.fleet_on_course();
        let contacts = collision::resolve(boats, course, &self.tuning);
        self.events.extend(contacts.into_iter().map(|c| c.into_event()));

        if phase == RacePhase::Racing {
            self.progress();
        }
        self.collect_race_events();
    }

    fn apply_inputs(&mut self) {
        while let Some(input) = self.inputs.pop_front() {
            let wind_direction = self.wind.direction;
            let tuning = self.tuning;
            let Some(boat) = self.race.boat_mut(input.boat) else {
                debug!(boat = %input.boat, "input for unknown boat dropped");
                continue;
            };
            match input.intent {
                Intent::Helm(helm) => boat.helm = helm,
                Intent::Trim(mode) => boat.trim_mode = mode,
                Intent::Tack => boat.tack_through(wind_direction, &tuning),
            }
        }
    }

    fn advance_fields(&mut self, dt: f64) {
        if self.venue.shift_interval_secs > 0.0 {
            self.shift_timer += dt;
            while self.shift_timer >= self.venue.shift_interval_secs {
                self.shift_timer -= self.venue.shift_interval_secs;
                self.wind.advance_direction(&self.venue, &mut self.rng);
            }
        }
        self.cell_timer += dt;
        while self.cell_timer >= CELL_WALK_SECS {
            self.cell_timer -= CELL_WALK_SECS;
            self.wind.advance_cells(&self.venue, &mut self.rng);
        }
        self.gusts.advance(dt, self.wind.direction, self.tuning.puff_speed, &self.venue, &mut self.rng);
    }

    fn run_autopilot(&mut self, phase: RacePhase, dt: f64) {
        let wind_direction = self.wind.direction;
        let tuning = self.tuning;
        let (boats, course) = self.race.fleet_on_course();
        for boat in boats.iter_mut().filter(|b| !b.is_local) {
            autopilot::steer(boat, course, phase, wind_direction, &tuning, dt);
        }
    }

    fn sail(&mut self, dt: f64) {
        let positions: Vec<(BoatId, Vec2)> = self
            .race
            .boats()
            .iter()
            .filter(|b| b.stage != RaceStage::Finished)
            .map(|b| (b.id, b.pos))
            .collect();

        let tuning = self.tuning;
        let wind = &self.wind;
        let gusts = &self.gusts;
        for boat in self.race.boats_mut() {
            let sample = wind.wind_at(boat.pos);
            let conditions = SailingConditions {
                wind_direction: sample.direction,
                wind_strength: sample.strength,
                shadow_factor: shadow::shadow_factor(
                    boat.id,
                    &positions,
                    sample.direction,
                    tuning.shadow_length,
                    tuning.shadow_penalty,
                ),
                puff_boost: gusts.boost_at(boat.pos),
                current: wind.current,
            };
            boat.step(&conditions, &tuning, dt);
        }
    }

    fn progress(&mut self) {
        let tuning = self.tuning;
        let mut finished = Vec::new();
        let (boats, course) = self.race.fleet_on_course();
        for boat in boats.iter_mut() {
            if let Some((from, to)) = progression::advance(boat, course, &tuning) {
                self.events.push(RaceEvent::StageChanged { boat: boat.id, from, to });
                if to == RaceStage::Finished {
                    finished.push(boat.id);
                }
            }
        }
        for id in finished {
            self.race.finish_race(id, self.clock);
        }
    }

    fn collect_race_events(&mut self) {
        self.events.extend(self.race.drain_events());
    }

    // ── Read side ────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            venue: self.venue.id.to_string(),
            phase: self.race.phase(),
            clock: self.clock,
            countdown_remaining: self.race.countdown_remaining(),
            elapsed_ms: self.race.elapsed_ms(self.clock),
            paused: self.paused,
            boats: self.race.boats().iter().map(Boat::snapshot).collect(),
            wind: WindSnapshot {
                direction: self.wind.direction,
                strength: self.wind.strength,
                current_direction: self.wind.current.direction,
                current_strength: self.wind.current.strength,
                cells: self.wind.cell_snapshots(),
            },
            puffs: self.gusts.snapshots(),
            course: self.race.course().clone(),
            results: self.race.results().to_vec(),
        }
    }
}
