//! In-memory player registry, loaded from and flushed to a [`KeyValueStore`].

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    models::{normalize_name, Player, MAX_NAME_LEN},
    storage::KeyValueStore,
};

/// Store key holding the JSON array of players.
pub const PLAYERS_KEY: &str = "multiPlayers";

/// All known player profiles, in storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    /// Build a registry from `players`, collapsing duplicate names.
    pub fn new(players: Vec<Player>) -> Self {
        let mut registry = Self::default();
        for player in players {
            registry.upsert(player);
        }
        registry
    }

    /// Load the registry. A missing or corrupt blob yields an empty registry;
    /// records that fail to parse or have a blank name are skipped, and
    /// out-of-range counters are clamped rather than dropped.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let Some(raw) = store.get(PLAYERS_KEY) else {
            return Self::default();
        };
        let records: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!("Stored player list is corrupt, starting fresh: {err}");
                return Self::default();
            }
        };

        let mut players = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Player>(record) {
                Ok(player) => match player.sanitize() {
                    Ok(player) => players.push(player),
                    Err(err) => warn!(index, "Skipping invalid player record: {err}"),
                },
                Err(err) => warn!(index, "Skipping malformed player record: {err}"),
            }
        }
        info!(total = players.len(), "Players loaded");
        Self::new(players)
    }

    /// Write every player back to the store.
    pub fn flush(&self, store: &dyn KeyValueStore) -> Result<()> {
        let serialised =
            serde_json::to_string(&self.players).context("failed to serialize players")?;
        store
            .set(PLAYERS_KEY, &serialised)
            .context("failed to persist players")
    }

    /// Case-insensitive, whitespace-trimmed lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        let key = normalize_name(name);
        self.players.iter().find(|player| player.key() == key)
    }

    /// Insert `player`, or replace the profile with the same normalised name.
    pub fn upsert(&mut self, player: Player) {
        let key = player.key();
        match self.players.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
    }

    /// Every player, in storage order.
    pub fn all(&self) -> &[Player] {
        &self.players
    }

    /// Number of known players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when no player has logged in yet.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Log in by name, creating the profile on first use.
    pub fn login(&mut self, name: &str, avatar: &str) -> Result<LoginOutcome, LoginError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LoginError::BlankName);
        }
        let name: String = trimmed.chars().take(MAX_NAME_LEN).collect();

        if let Some(existing) = self.find_by_name(&name) {
            let mut player = existing.clone();
            if player.avatar != avatar {
                player.avatar = avatar.to_string();
                self.upsert(player.clone());
            }
            info!(player = %player.name, "Player logged in");
            return Ok(LoginOutcome {
                player,
                is_new: false,
            });
        }

        let player = Player::new(name, avatar);
        self.upsert(player.clone());
        info!(player = %player.name, "New player created");
        Ok(LoginOutcome {
            player,
            is_new: true,
        })
    }

    /// Players ranked by high score, best first. Ties keep storage order.
    pub fn leaderboard(&self) -> Vec<LeaderboardRow<'_>> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.high_score.cmp(&a.high_score));
        ranked
            .into_iter()
            .enumerate()
            .map(|(index, player)| LeaderboardRow {
                rank: index + 1,
                player,
            })
            .collect()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    /// The logged-in profile.
    pub player: Player,
    /// True when the profile was created by this login.
    pub is_new: bool,
}

/// Login failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    /// The name was empty after trimming.
    #[error("please enter your name")]
    BlankName,
}

/// One leaderboard line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderboardRow<'a> {
    /// 1-based position.
    pub rank: usize,
    /// Ranked player.
    pub player: &'a Player,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{HistoryEntry, MAX_LIVES},
        storage::MemoryStore,
    };

    #[test]
    fn find_by_name_ignores_case_and_whitespace() {
        let registry = PlayerRegistry::new(vec![Player::new("Sofía", "🦊")]);
        assert!(registry.find_by_name("  sofía ").is_some());
        assert!(registry.find_by_name("SOFÍA").is_some());
        assert!(registry.find_by_name("sofi").is_none());
    }

    #[test]
    fn upsert_replaces_by_normalised_name() {
        let mut registry = PlayerRegistry::default();
        registry.upsert(Player::new("Leo", "🦊"));
        let mut updated = Player::new("leo ", "🤖");
        updated.coins = 9;
        registry.upsert(updated);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all()[0].coins, 9);
    }

    #[test]
    fn login_creates_then_reuses_profiles() {
        let mut registry = PlayerRegistry::default();
        let first = registry.login("  Mia ", "🦊").unwrap();
        assert!(first.is_new);
        assert_eq!(first.player.name, "Mia");

        let second = registry.login("mia", "🚀").unwrap();
        assert!(!second.is_new);
        assert_eq!(second.player.avatar, "🚀");
        assert_eq!(registry.find_by_name("MIA").unwrap().avatar, "🚀");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn login_rejects_blank_and_truncates_long_names() {
        let mut registry = PlayerRegistry::default();
        assert_eq!(registry.login("   ", "🦊"), Err(LoginError::BlankName));
        let outcome = registry.login("Maximiliano Alejandro", "🦊").unwrap();
        assert_eq!(outcome.player.name.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn round_trip_through_store_preserves_every_field() -> Result<()> {
        let store = MemoryStore::new();
        let mut player = Player::new("Eva", "🦄");
        player.unlocked = 4;
        player.coins = 12;
        player.lives = 2;
        player.high_score = 9;
        player.unlocked_avatars.insert("🐉".to_string());
        player.history.push(HistoryEntry {
            table: 3,
            operation: "3 x 4 = ?".to_string(),
            elapsed_ms: 2_345,
            was_correct: true,
            date_label: "1/2/2026".to_string(),
        });
        PlayerRegistry::new(vec![player.clone()]).flush(&store)?;

        let first = PlayerRegistry::load(&store);
        let second = PlayerRegistry::load(&store);
        assert_eq!(first, second);
        assert_eq!(first.find_by_name("eva"), Some(&player));
        Ok(())
    }

    #[test]
    fn corrupt_blob_loads_as_empty() -> Result<()> {
        let store = MemoryStore::new();
        store.set(PLAYERS_KEY, "not json at all")?;
        assert!(PlayerRegistry::load(&store).is_empty());
        Ok(())
    }

    #[test]
    fn malformed_records_are_skipped() -> Result<()> {
        let store = MemoryStore::new();
        let valid = serde_json::to_value(Player::new("Ok", "🦊"))?;
        let blob = serde_json::json!([
            valid,
            {"name": "Broken"},
            {"name": "  ", "avatar": "🦊", "unlocked": 1, "coins": 0, "lives": 3, "highScore": 0},
            42
        ]);
        store.set(PLAYERS_KEY, &blob.to_string())?;
        let registry = PlayerRegistry::load(&store);
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_name("broken").is_none());
        Ok(())
    }

    #[test]
    fn legacy_records_without_avatar_list_still_load() -> Result<()> {
        let store = MemoryStore::new();
        let blob = r#"[{"name":"Old","avatar":"🐶","unlocked":2,"coins":5,"lives":3,"highScore":4,"history":[]}]"#;
        store.set(PLAYERS_KEY, blob)?;
        let registry = PlayerRegistry::load(&store);
        let player = registry.find_by_name("old").expect("legacy player");
        assert!(player.unlocked_avatars.is_empty());
        assert_eq!(player.unlocked, 2);
        Ok(())
    }

    #[test]
    fn out_of_range_records_are_clamped_not_dropped() -> Result<()> {
        let store = MemoryStore::new();
        let blob = r#"[{"name":"Old","avatar":"🐶","unlocked":7,"coins":250,"lives":4,"highScore":9,"history":[]}]"#;
        store.set(PLAYERS_KEY, blob)?;

        let mut registry = PlayerRegistry::load(&store);
        let player = registry.find_by_name("old").expect("clamped player");
        assert_eq!(player.lives, MAX_LIVES);
        assert_eq!(player.unlocked, 7);
        assert_eq!(player.coins, 250);

        let login = registry.login("Old", "🐶").unwrap();
        assert!(!login.is_new);
        registry.flush(&store)?;
        let reloaded = PlayerRegistry::load(&store);
        assert_eq!(reloaded.find_by_name("old").map(|player| player.coins), Some(250));
        Ok(())
    }

    #[test]
    fn leaderboard_sorts_by_high_score_descending() {
        let mut low = Player::new("Low", "🦊");
        low.high_score = 3;
        let mut high = Player::new("High", "🦊");
        high.high_score = 10;
        let mut mid = Player::new("Mid", "🦊");
        mid.high_score = 7;
        let registry = PlayerRegistry::new(vec![low, high, mid]);

        let rows = registry.leaderboard();
        let names: Vec<&str> = rows.iter().map(|row| row.player.name.as_str()).collect();
        assert_eq!(names, ["High", "Mid", "Low"]);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[2].rank, 3);
    }
}
