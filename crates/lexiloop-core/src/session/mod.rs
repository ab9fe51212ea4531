mod engine;
mod state;

pub use engine::{SessionEngine, SessionSnapshot, StageCounts};
pub use state::SessionState;
