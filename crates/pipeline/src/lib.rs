//! Campaign pipeline: sequences data generation, analysis, optimisation,
//! charting and reporting over one session.

pub mod menu;
pub mod session;

pub use menu::{execute, run_steps, Flow, MenuAction, StepsOutcome, MENU};
pub use session::{PipelineOutputs, Session};
