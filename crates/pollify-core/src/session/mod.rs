//! Per-respondent fill session.

mod engine;

pub use engine::{AdvanceOutcome, SessionEngine, SessionState};
