//! Level sessions: question generation and the answer state machine.

pub mod engine;
mod question;

pub use engine::{
    Evaluation, GameOverSummary, LevelError, Session, SessionEngine, SessionEvent, SessionState,
    Submission, Transition, DEFAULT_PAUSE_MS, MAX_STEPS, SECONDS_PER_TABLE,
};
pub use question::{Question, DISTRACTOR_SPREAD, MAX_MULTIPLIER, OPTION_COUNT};
