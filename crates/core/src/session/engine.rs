use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    feedback::{self, FeedbackCue},
    models::{date_label, EventTime, HistoryEntry, Player, TABLE_COUNT},
    progression::{
        apply_outcome, complete_level, is_out_of_lives, refill_lives, LevelSummary, Outcome,
    },
};

use super::question::Question;

/// Questions per level.
pub const MAX_STEPS: u32 = 10;
/// Seconds allowed per question, multiplied by the table number.
pub const SECONDS_PER_TABLE: u32 = 2;
/// Gap between an answer and the next question becoming visible.
pub const DEFAULT_PAUSE_MS: u64 = 2_000;

/// Why a level could not be started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("table {0} is not on the map")]
    OutOfRange(u32),
    #[error("table {table} is locked; unlock the previous tables first (unlocked up to {unlocked})")]
    Locked { table: u32, unlocked: u32 },
}

/// One level attempt in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub table: u32,
    /// Zero-based index of the question currently shown.
    pub step_index: u32,
    pub max_steps: u32,
    pub correct_count: u32,
    pub timeout_seconds: u32,
    pub question: Question,
    /// Increments with every question; timeouts carry the value they were armed for.
    pub question_seq: u64,
    /// When the current question became (or becomes) visible.
    pub started_at_ms: u64,
}

impl Session {
    /// Moment the current question times out.
    pub fn deadline_ms(&self) -> u64 {
        self.started_at_ms + u64::from(self.timeout_seconds) * 1_000
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.deadline_ms().saturating_sub(now_ms.max(self.started_at_ms))
    }

    /// False while the feedback pause after the previous answer is running.
    pub fn is_question_visible(&self, now_ms: u64) -> bool {
        now_ms >= self.started_at_ms
    }

    pub fn is_timed_out(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms()
    }
}

/// Inputs accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The player picked an option.
    Answer { value: u32, at: EventTime },
    /// The countdown armed for `question_seq` expired.
    Timeout { question_seq: u64, at: EventTime },
}

/// What was evaluated for a single answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Value(u32),
    Timeout,
}

/// Summary of a level that ended because the player ran out of lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOverSummary {
    pub table: u32,
    /// Questions answered before the last life was lost.
    pub answered: u32,
    pub correct_count: u32,
}

/// Engine state between events.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No level selected.
    #[default]
    Idle,
    AwaitingAnswer(Session),
    LevelComplete(LevelSummary),
    GameOver(GameOverSummary),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::AwaitingAnswer(session) => Some(session),
            _ => None,
        }
    }
}

/// Details of an evaluated answer, for feedback display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub outcome: Outcome,
    pub submission: Submission,
    /// The precomputed product.
    pub answer: u32,
    pub entry: HistoryEntry,
    pub cue: FeedbackCue,
}

/// Result of feeding one event to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub player: Player,
    /// `None` when the event was ignored.
    pub evaluation: Option<Evaluation>,
}

impl Transition {
    fn ignored(state: SessionState, player: Player) -> Self {
        Self {
            state,
            player,
            evaluation: None,
        }
    }
}

/// Drives level attempts. Owns only the random source and pacing, never game state.
pub struct SessionEngine<R = StdRng> {
    rng: R,
    pause_ms: u64,
}

impl SessionEngine<StdRng> {
    /// Engine seeded from system entropy.
    pub fn new(pause_ms: u64) -> Self {
        Self::with_rng(StdRng::from_entropy(), pause_ms)
    }
}

impl<R: Rng> SessionEngine<R> {
    pub fn with_rng(rng: R, pause_ms: u64) -> Self {
        Self { rng, pause_ms }
    }

    /// Begin a level on `table` for `player`, showing the first question at `at`.
    pub fn start(
        &mut self,
        player: &Player,
        table: u32,
        at: EventTime,
    ) -> Result<SessionState, LevelError> {
        if !(1..=TABLE_COUNT).contains(&table) {
            return Err(LevelError::OutOfRange(table));
        }
        if !player.can_play(table) {
            return Err(LevelError::Locked {
                table,
                unlocked: player.unlocked,
            });
        }

        let session = Session {
            table,
            step_index: 0,
            max_steps: MAX_STEPS,
            correct_count: 0,
            timeout_seconds: table * SECONDS_PER_TABLE,
            question: Question::generate(table, &mut self.rng),
            question_seq: 1,
            started_at_ms: at.millis,
        };
        info!(player = %player.name, table, timeout = session.timeout_seconds, "Level started");
        Ok(SessionState::AwaitingAnswer(session))
    }

    /// Apply `event` to `state`, returning the next state and updated player.
    pub fn handle(
        &mut self,
        state: SessionState,
        player: Player,
        event: SessionEvent,
    ) -> Transition {
        let session = match state {
            SessionState::AwaitingAnswer(session) => session,
            other => {
                debug!(?event, "Event ignored without an active session");
                return Transition::ignored(other, player);
            }
        };

        match event {
            SessionEvent::Answer { value, at } => {
                if !session.is_question_visible(at.millis) {
                    debug!(
                        at = at.millis,
                        visible_at = session.started_at_ms,
                        "Answer during feedback pause ignored"
                    );
                    return Transition::ignored(SessionState::AwaitingAnswer(session), player);
                }
                self.evaluate(session, player, Submission::Value(value), at)
            }
            SessionEvent::Timeout { question_seq, at } => {
                if question_seq != session.question_seq || !session.is_timed_out(at.millis) {
                    debug!(
                        question_seq,
                        current = session.question_seq,
                        at = at.millis,
                        deadline = session.deadline_ms(),
                        "Stale or early timeout ignored"
                    );
                    return Transition::ignored(SessionState::AwaitingAnswer(session), player);
                }
                self.evaluate(session, player, Submission::Timeout, at)
            }
        }
    }

    fn evaluate(
        &mut self,
        mut session: Session,
        mut player: Player,
        submission: Submission,
        at: EventTime,
    ) -> Transition {
        let correct = match submission {
            Submission::Value(value) => session.question.is_correct(value),
            Submission::Timeout => false,
        };
        let outcome = Outcome::from_correct(correct);

        let entry = HistoryEntry {
            table: session.table,
            operation: session.question.text(),
            elapsed_ms: at.millis.saturating_sub(session.started_at_ms),
            was_correct: correct,
            date_label: date_label(at.date),
        };
        player.history.push(entry.clone());
        let mut player = apply_outcome(player, outcome);
        if correct {
            session.correct_count += 1;
        }
        debug!(
            table = session.table,
            step = session.step_index,
            ?submission,
            correct,
            lives = player.lives,
            "Answer evaluated"
        );

        let evaluation = Evaluation {
            outcome,
            submission,
            answer: session.question.answer,
            entry,
            cue: feedback::pick(&mut self.rng, correct),
        };

        if outcome == Outcome::Incorrect && is_out_of_lives(&player) {
            player = refill_lives(player);
            info!(player = %player.name, table = session.table, "Out of lives; level abandoned");
            let summary = GameOverSummary {
                table: session.table,
                answered: session.step_index + 1,
                correct_count: session.correct_count,
            };
            return Transition {
                state: SessionState::GameOver(summary),
                player,
                evaluation: Some(evaluation),
            };
        }

        if session.step_index + 1 >= session.max_steps {
            let (player, summary) = complete_level(
                player,
                session.table,
                session.correct_count,
                session.max_steps,
            );
            info!(
                player = %player.name,
                table = summary.table,
                correct = summary.correct_count,
                unlocked = player.unlocked,
                "Level complete"
            );
            return Transition {
                state: SessionState::LevelComplete(summary),
                player,
                evaluation: Some(evaluation),
            };
        }

        session.step_index += 1;
        session.question = Question::generate(session.table, &mut self.rng);
        session.question_seq += 1;
        session.started_at_ms = at.millis + self.pause_ms;
        Transition {
            state: SessionState::AwaitingAnswer(session),
            player,
            evaluation: Some(evaluation),
        }
    }
}
