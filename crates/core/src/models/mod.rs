//! Shared domain models.

use std::collections::BTreeSet;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shop::STARTER_AVATARS;

/// Number of tables on the level map.
pub const TABLE_COUNT: u32 = 12;
/// Lives granted to a fresh player and after every game over.
pub const MAX_LIVES: u32 = 3;
/// Longest accepted player name, in characters.
pub const MAX_NAME_LEN: usize = 15;

/// A locally stored player profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Display name. Lookups compare the trimmed, lowercased form.
    pub name: String,
    /// Identifier of the avatar currently worn.
    pub avatar: String,
    /// Highest table the player may attempt.
    pub unlocked: u32,
    /// Coins earned from correct answers, spent in the avatar shop.
    pub coins: u32,
    /// Remaining lives in `0..=MAX_LIVES`.
    pub lives: u32,
    /// Best `correct_count` reached in any completed level.
    pub high_score: u32,
    /// Every answer ever given, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Avatars bought in the shop (starter avatars are always owned).
    #[serde(default)]
    pub unlocked_avatars: BTreeSet<String>,
}

impl Player {
    /// Create a profile with first-login defaults.
    pub fn new(name: impl Into<String>, avatar: impl Into<String>) -> Self {
        let mut unlocked_avatars = BTreeSet::new();
        if let Some(first) = STARTER_AVATARS.first() {
            unlocked_avatars.insert((*first).to_string());
        }
        Self {
            name: name.into(),
            avatar: avatar.into(),
            unlocked: 1,
            coins: 0,
            lives: MAX_LIVES,
            high_score: 0,
            history: Vec::new(),
            unlocked_avatars,
        }
    }

    /// Normalised lookup key for this player.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether the given table is on the map and already unlocked.
    pub fn can_play(&self, table: u32) -> bool {
        (1..=TABLE_COUNT).contains(&table) && table <= self.unlocked
    }

    /// Repair a loaded record: lives are clamped to `MAX_LIVES` and at least
    /// the first table stays unlocked. Only a blank name is unrecoverable.
    pub fn sanitize(mut self) -> Result<Self, InvalidPlayer> {
        if self.name.trim().is_empty() {
            return Err(InvalidPlayer::BlankName);
        }
        self.lives = self.lives.min(MAX_LIVES);
        self.unlocked = self.unlocked.max(1);
        Ok(self)
    }
}

/// Reasons a stored player record is discarded on load.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidPlayer {
    /// The record has no usable name to look it up by.
    #[error("player name is blank")]
    BlankName,
}

/// One recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Table the question belonged to.
    pub table: u32,
    /// Question text, e.g. `3 x 7 = ?`.
    pub operation: String,
    /// Time between the question appearing and the answer (or timeout).
    pub elapsed_ms: u64,
    /// Whether the answer matched the product.
    pub was_correct: bool,
    /// Local calendar date, `d/m/YYYY`.
    pub date_label: String,
}

impl HistoryEntry {
    /// `elapsed_ms` in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}

/// Lowercased, trimmed form used for case-insensitive name matching.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Format a date the way history entries label it.
pub fn date_label(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// Point in time at which an event reached the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTime {
    /// Monotonic-enough wall clock in milliseconds.
    pub millis: u64,
    /// Local date used for history labels.
    pub date: NaiveDate,
}

impl EventTime {
    /// Build an event time from explicit parts.
    pub fn new(millis: u64, date: NaiveDate) -> Self {
        Self { millis, date }
    }

    /// Current local time.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            millis: u64::try_from(now.timestamp_millis()).unwrap_or_default(),
            date: now.date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_uses_first_login_defaults() {
        let player = Player::new("Ana", "🦊");
        assert_eq!(player.unlocked, 1);
        assert_eq!(player.coins, 0);
        assert_eq!(player.lives, MAX_LIVES);
        assert_eq!(player.high_score, 0);
        assert!(player.history.is_empty());
        assert!(player.unlocked_avatars.contains(STARTER_AVATARS[0]));
    }

    #[test]
    fn can_play_respects_map_bounds() {
        let mut player = Player::new("Ana", "🦊");
        player.unlocked = 13;
        assert!(!player.can_play(0));
        assert!(player.can_play(1));
        assert!(player.can_play(12));
        assert!(!player.can_play(13));
    }

    #[test]
    fn sanitize_clamps_out_of_range_fields() {
        let mut player = Player::new("Ana", "🦊");
        player.lives = 7;
        player.unlocked = 0;
        player.coins = 40;
        let repaired = player.sanitize().unwrap();
        assert_eq!(repaired.lives, MAX_LIVES);
        assert_eq!(repaired.unlocked, 1);
        assert_eq!(repaired.coins, 40);

        let blank = Player::new("  ", "🦊");
        assert_eq!(blank.sanitize(), Err(InvalidPlayer::BlankName));
    }

    #[test]
    fn date_label_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(date_label(date), "7/3/2026");
    }

    #[test]
    fn player_serializes_with_camel_case_keys() -> anyhow::Result<()> {
        let value = serde_json::to_value(Player::new("Ana", "🦊"))?;
        assert!(value.get("highScore").is_some());
        assert!(value.get("unlockedAvatars").is_some());
        Ok(())
    }
}
