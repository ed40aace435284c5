//! Comma-separated progress report for one player.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::info;

use crate::models::{HistoryEntry, Player};

/// First line of every report.
pub const REPORT_HEADER: &str = "Name,Date,Operation,Time(s),Result,Suggestions";
const BYTE_ORDER_MARK: &str = "\u{FEFF}";

/// Report export failures.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The player has not answered anything yet.
    #[error("there is no data to build a report for {0}")]
    NoHistory(String),
    /// The report file could not be written.
    #[error("failed to write report {path}: {source}")]
    Io {
        /// Target file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Aggregates appended to every report row.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestions {
    /// Table with the most wrong answers; the higher table wins ties.
    pub weakest_table: Option<u32>,
    /// Mean answer time.
    pub average_seconds: f64,
    /// Correct answers as a percentage of all answers.
    pub accuracy_percent: f64,
}

impl Suggestions {
    /// `None` for an empty history.
    pub fn from_history(history: &[HistoryEntry]) -> Option<Self> {
        if history.is_empty() {
            return None;
        }

        let mut failures: BTreeMap<u32, u32> = BTreeMap::new();
        let mut total_ms = 0u64;
        let mut correct = 0usize;
        for entry in history {
            if entry.was_correct {
                correct += 1;
            } else {
                *failures.entry(entry.table).or_default() += 1;
            }
            total_ms += entry.elapsed_ms;
        }

        let mut weakest: Option<(u32, u32)> = None;
        for (table, count) in failures {
            if weakest.map_or(true, |(_, best)| count >= best) {
                weakest = Some((table, count));
            }
        }

        let answers = history.len() as f64;
        Some(Self {
            weakest_table: weakest.map(|(table, _)| table),
            average_seconds: total_ms as f64 / 1000.0 / answers,
            accuracy_percent: correct as f64 / answers * 100.0,
        })
    }

    /// Human-readable sentences for the suggestion column.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if let Some(table) = self.weakest_table {
            lines.push(format!(
                "We recommend practising the {table} table (most mistakes detected)."
            ));
        }
        lines.push(format!(
            "Average time per answer: {:.2} seconds.",
            self.average_seconds
        ));
        lines.push(format!("Overall accuracy: {:.1}%", self.accuracy_percent));
        lines
    }
}

/// Build the report text for `player`.
pub fn render(player: &Player) -> Result<String, ReportError> {
    let suggestions = Suggestions::from_history(&player.history)
        .ok_or_else(|| ReportError::NoHistory(player.name.clone()))?;
    let suggestion_cell = quote(&suggestions.lines().join("; "));
    let name = escape(&player.name);

    let mut csv = String::from(REPORT_HEADER);
    csv.push('\n');
    for entry in &player.history {
        let result = if entry.was_correct { "Correct" } else { "Error" };
        csv.push_str(&format!(
            "{name},{},{},{:.2},{result},{suggestion_cell}\n",
            escape(&entry.date_label),
            escape(&entry.operation),
            entry.elapsed_seconds(),
        ));
    }
    Ok(csv)
}

/// File name used when exporting `player`'s report.
pub fn file_name(player: &Player) -> String {
    format!("Report_{}.csv", sanitize_component(&player.name))
}

/// Write the report into `dir`, prefixed with a UTF-8 byte-order mark.
pub fn export(player: &Player, dir: impl AsRef<Path>) -> Result<PathBuf, ReportError> {
    let csv = render(player)?;
    let dir = dir.as_ref();
    let path = dir.join(file_name(player));
    let io_error = |source| ReportError::Io {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(io_error)?;
    fs::write(&path, format!("{BYTE_ORDER_MARK}{csv}")).map_err(io_error)?;
    info!(player = %player.name, path = %path.display(), "Report exported");
    Ok(path)
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        quote(field)
    } else {
        field.to_string()
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn sanitize_component(input: &str) -> String {
    let result: String = input
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_'))
        .collect();
    if result.is_empty() {
        "player".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn entry(table: u32, elapsed_ms: u64, was_correct: bool) -> HistoryEntry {
        HistoryEntry {
            table,
            operation: format!("{table} x 2 = ?"),
            elapsed_ms,
            was_correct,
            date_label: "5/1/2026".to_string(),
        }
    }

    fn player_with_history() -> Player {
        let mut player = Player::new("Ana", "🦊");
        player.history = vec![
            entry(2, 1_000, true),
            entry(3, 2_000, false),
            entry(3, 3_000, false),
            entry(4, 4_000, false),
        ];
        player
    }

    #[test]
    fn suggestions_aggregate_history() {
        let suggestions = Suggestions::from_history(&player_with_history().history).unwrap();
        assert_eq!(suggestions.weakest_table, Some(3));
        assert!((suggestions.average_seconds - 2.5).abs() < f64::EPSILON);
        assert!((suggestions.accuracy_percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weakest_table_ties_go_to_the_higher_table() {
        let history = vec![entry(2, 1_000, false), entry(5, 1_000, false)];
        let suggestions = Suggestions::from_history(&history).unwrap();
        assert_eq!(suggestions.weakest_table, Some(5));
    }

    #[test]
    fn perfect_history_has_no_weakest_table() {
        let history = vec![entry(2, 1_000, true)];
        let suggestions = Suggestions::from_history(&history).unwrap();
        assert_eq!(suggestions.weakest_table, None);
        assert_eq!(suggestions.lines().len(), 2);
    }

    #[test]
    fn render_writes_one_row_per_answer() -> Result<()> {
        let csv = render(&player_with_history())?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("Ana,5/1/2026,2 x 2 = ?,1.00,Correct,\""));
        assert!(lines[2].contains(",Error,"));
        assert!(lines[1].contains("practising the 3 table"));
        assert!(lines[1].contains("Overall accuracy: 25.0%"));
        Ok(())
    }

    #[test]
    fn empty_history_is_reported() {
        let player = Player::new("Ana", "🦊");
        assert!(matches!(render(&player), Err(ReportError::NoHistory(name)) if name == "Ana"));
    }

    #[test]
    fn export_writes_bom_prefixed_file() -> Result<()> {
        let dir = tempdir()?;
        let mut player = player_with_history();
        player.name = "Ana María!".to_string();
        let path = export(&player, dir.path())?;
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("Report_AnaMaría.csv")
        );
        let content = fs::read_to_string(&path)?;
        assert!(content.starts_with('\u{FEFF}'));
        Ok(())
    }
}
