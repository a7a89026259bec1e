pub mod commands;
pub mod controller;
pub mod phase;
pub mod state;

pub use commands::Intent;
pub use controller::{SessionController, SessionSnapshot};
pub use phase::{next_phase, Phase, PhaseStep, WALK_CUE};
pub use state::SessionRunState;
