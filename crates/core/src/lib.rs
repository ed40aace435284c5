#![warn(clippy::all, missing_docs)]

//! Core domain logic for MultiAventura, a multiplication-table game.
//!
//! This crate hosts the player model, the level session engine, the
//! progression rules, the avatar shop, and the persistence layers used
//! by the terminal UI and any future frontends.

pub mod config;
pub mod feedback;
pub mod models;
pub mod progression;
pub mod registry;
pub mod report;
#[allow(missing_docs)]
pub mod session;
pub mod settings;
pub mod shop;
pub mod storage;

pub use config::AppConfig;
pub use models::{EventTime, HistoryEntry, Player};
pub use registry::{LoginOutcome, PlayerRegistry};
pub use session::{SessionEngine, SessionEvent, SessionState, Transition};
pub use settings::Settings;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
