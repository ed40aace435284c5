//! Pure progression rules: coins, lives, unlocks and high scores.

use crate::models::{Player, MAX_LIVES};

/// Share of correct answers needed to unlock the next table.
pub const UNLOCK_ACCURACY: f64 = 0.70;

/// Result of one evaluated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The submitted value matched the product.
    Correct,
    /// Wrong value or timeout.
    Incorrect,
}

impl Outcome {
    /// Map a comparison result onto an outcome.
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }
}

/// Apply the per-answer reward or penalty.
pub fn apply_outcome(mut player: Player, outcome: Outcome) -> Player {
    match outcome {
        Outcome::Correct => player.coins = player.coins.saturating_add(1),
        Outcome::Incorrect => player.lives = player.lives.min(MAX_LIVES).saturating_sub(1),
    }
    player
}

/// True once the player has no lives left.
pub fn is_out_of_lives(player: &Player) -> bool {
    player.lives == 0
}

/// Grant the full set of lives after a game over.
pub fn refill_lives(mut player: Player) -> Player {
    player.lives = MAX_LIVES;
    player
}

/// What changed when a level was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSummary {
    /// Table that was played.
    pub table: u32,
    /// Correct answers in the level.
    pub correct_count: u32,
    /// Questions in the level.
    pub max_steps: u32,
    /// Set when this level raised `unlocked`.
    pub unlocked_table: Option<u32>,
    /// Set when `correct_count` beat the previous high score.
    pub new_high_score: Option<u32>,
}

impl LevelSummary {
    /// Share of correct answers, `0.0..=1.0`.
    pub fn accuracy(&self) -> f64 {
        if self.max_steps == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) / f64::from(self.max_steps)
    }
}

/// Apply unlock and high-score rules for a finished level.
pub fn complete_level(
    mut player: Player,
    table: u32,
    correct_count: u32,
    max_steps: u32,
) -> (Player, LevelSummary) {
    let mut summary = LevelSummary {
        table,
        correct_count,
        max_steps,
        unlocked_table: None,
        new_high_score: None,
    };

    if summary.accuracy() >= UNLOCK_ACCURACY {
        // clearing the last table leaves `unlocked` one past the map
        let next = table + 1;
        if next > player.unlocked {
            player.unlocked = next;
            summary.unlocked_table = Some(next);
        }
    }

    if correct_count > player.high_score {
        player.high_score = correct_count;
        summary.new_high_score = Some(correct_count);
    }

    (player, summary)
}
