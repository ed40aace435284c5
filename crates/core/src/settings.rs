//! Device-wide preferences persisted as boolean strings.

use anyhow::Result;

use crate::storage::KeyValueStore;

/// Store key of the mute flag.
pub const MUTED_KEY: &str = "isMuted";
/// Store key of the dark-mode flag.
pub const DARK_MODE_KEY: &str = "darkMode";

/// Preferences shared by every player on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// Suppress audio cues.
    pub muted: bool,
    /// Use the dark colour theme.
    pub dark_mode: bool,
}

impl Settings {
    /// Read both flags; anything but `"true"` counts as off.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            muted: read_flag(store, MUTED_KEY),
            dark_mode: read_flag(store, DARK_MODE_KEY),
        }
    }

    /// Flip the mute flag and persist it, returning the new value.
    pub fn toggle_mute(&mut self, store: &dyn KeyValueStore) -> Result<bool> {
        self.muted = !self.muted;
        store.set(MUTED_KEY, &self.muted.to_string())?;
        Ok(self.muted)
    }

    /// Flip the theme flag and persist it, returning the new value.
    pub fn toggle_dark_mode(&mut self, store: &dyn KeyValueStore) -> Result<bool> {
        self.dark_mode = !self.dark_mode;
        store.set(DARK_MODE_KEY, &self.dark_mode.to_string())?;
        Ok(self.dark_mode)
    }
}

fn read_flag(store: &dyn KeyValueStore, key: &str) -> bool {
    store.get(key).as_deref() == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn missing_or_garbage_flags_are_off() -> Result<()> {
        let store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());
        store.set(MUTED_KEY, "yes")?;
        assert!(!Settings::load(&store).muted);
        Ok(())
    }

    #[test]
    fn toggles_are_written_back() -> Result<()> {
        let store = MemoryStore::new();
        let mut settings = Settings::load(&store);
        assert!(settings.toggle_mute(&store)?);
        assert!(settings.toggle_dark_mode(&store)?);
        assert_eq!(store.get(MUTED_KEY).as_deref(), Some("true"));

        let reloaded = Settings::load(&store);
        assert!(reloaded.muted);
        assert!(reloaded.dark_mode);

        let mut settings = reloaded;
        assert!(!settings.toggle_mute(&store)?);
        assert_eq!(store.get(MUTED_KEY).as_deref(), Some("false"));
        Ok(())
    }
}
