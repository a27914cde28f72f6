//! # regatta-sim
//!
//! Race physics and progression engine for a multi-boat 2D sailing race.
//!
//! ```text
//!  venue ──► wind ──┐
//!            gusts ─┼──► boat_sim ──► collision ──► progression ──► race
//!           shadow ─┘        ▲
//!                       autopilot
//! ```
//!
//! [`Simulation`] owns all state and advances it one frame at a time. Hosts
//! queue [`ControlInput`]s, call [`Simulation::tick`], then read
//! [`Simulation::snapshot`] and drain [`RaceEvent`](regatta_types::RaceEvent)s.

pub mod autopilot;
pub mod boat_sim;
pub mod collision;
pub mod config;
pub mod error;
pub mod gusts;
pub mod progression;
pub mod race;
pub mod session;
pub mod shadow;
pub mod tuning;
pub mod venue;
pub mod wind;

pub use boat_sim::{Boat, BoatEntry, Helm, TrimMode};
pub use config::RaceConfig;
pub use error::SimError;
pub use race::Race;
pub use session::{ControlInput, Intent, Simulation};
pub use tuning::PhysicsTuning;
pub use venue::VenueProfile;
