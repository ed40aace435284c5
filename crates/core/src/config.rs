//! Application configuration loaded from defaults, an optional TOML file and
//! `MULTIAVENTURA_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{session::DEFAULT_PAUSE_MS, storage::DEFAULT_STORE_FILE};

/// Directory name used under the platform config and data roots.
pub const APP_DIR: &str = "multiaventura";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "MULTIAVENTURA";

const DEFAULT_CONFIG: &str = r#"# MultiAventura configuration.

# Where the player store lives.
# data_dir = "~/.local/share/multiaventura"
# store_file = "store.json"

# Milliseconds the answer feedback stays on screen before the next question.
# question_pause_ms = 2000

# Where exported progress reports are written.
# report_dir = "."
"#;

/// Runtime settings for the game and its storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the key-value store.
    pub data_dir: PathBuf,
    /// Store file name inside `data_dir`.
    pub store_file: String,
    /// Pause between an answer and the next question, in milliseconds.
    pub question_pause_ms: u64,
    /// Destination for exported reports.
    pub report_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            store_file: DEFAULT_STORE_FILE.to_string(),
            question_pause_ms: DEFAULT_PAUSE_MS,
            report_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load from the default config file location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load using `path` as the optional config file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let pause = i64::try_from(defaults.question_pause_ms).unwrap_or(i64::MAX);

        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
            .set_default("store_file", defaults.store_file)?
            .set_default("question_pause_ms", pause)?
            .set_default(
                "report_dir",
                defaults.report_dir.to_string_lossy().into_owned(),
            )?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("invalid configuration values")
    }

    /// Full path of the key-value store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }
}

/// Location of the user config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.question_pause_ms, DEFAULT_PAUSE_MS);
        assert_eq!(config.store_file, DEFAULT_STORE_FILE);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "data_dir = \"/tmp/multi\"\nquestion_pause_ms = 500\n",
        )?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/tmp/multi"));
        assert_eq!(config.question_pause_ms, 500);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/multi/store.json"));
        Ok(())
    }

    #[test]
    fn default_config_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(APP_DIR).join(CONFIG_FILE);
        write_default_config(path.clone())?;
        fs::write(&path, "question_pause_ms = 10\n")?;
        write_default_config(path.clone())?;
        assert_eq!(AppConfig::load_from(&path)?.question_pause_ms, 10);
        Ok(())
    }
}
