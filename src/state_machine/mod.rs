mod job;
mod state;

pub use job::AnalysisJob;
pub use state::{AnalysisStatus, JobEvent, StateMachine, Transition};
