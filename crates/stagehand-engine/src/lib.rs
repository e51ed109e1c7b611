//! The activity simulation engine.
//!
//! One [`cycle::CycleDriver`] tick reads the synthetic agents and open
//! synthetic contests, lets the [`population::PopulationController`]
//! possibly spawn a new contest, then walks the open contests in random
//! order closing expired ones ([`closer::LifecycleCloser`]) and pacing
//! live ones ([`pacer::SubmissionPacer`]). All randomness flows through
//! the [`roller::Roller`] seam so tests can script exact outcomes.

pub mod closer;
pub mod config;
pub mod cycle;
pub mod generator;
pub mod pacer;
pub mod population;
pub mod roller;

pub use closer::{CloseOutcome, LifecycleCloser};
pub use config::EngineConfig;
pub use cycle::{CycleDriver, CycleReport};
pub use generator::ContentGenerator;
pub use pacer::{PaceOutcome, SubmissionPacer};
pub use population::PopulationController;
pub use roller::{Roller, ScriptRoller, StdRoller};
