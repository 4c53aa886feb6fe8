//! Score records and recorders
//!
//! The judge hands a finished exam's record to a [`ScoreRecorder`] and moves
//! on; recorders must not block the caller.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Default number of leaderboard entries
pub const LEADERBOARD_LIMIT: usize = 20;

/// Final result of one exam attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub exam_id: String,
    pub user_name: String,
    pub score: u32,
    /// Unix time in milliseconds
    pub completed_at: u64,
}

impl ScoreRecord {
    /// Record stamped with the current time
    pub fn now(exam_id: impl Into<String>, user_name: impl Into<String>, score: u32) -> Self {
        let completed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            exam_id: exam_id.into(),
            user_name: user_name.into(),
            score,
            completed_at,
        }
    }
}

/// Sink for finished exam records. Implementations must return promptly.
pub trait ScoreRecorder: Send + Sync {
    fn record(&self, record: ScoreRecord);
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<ScoreRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ScoreRecord> {
        self.records.lock().clone()
    }
}

impl ScoreRecorder for MemoryRecorder {
    fn record(&self, record: ScoreRecord) {
        self.records.lock().push(record);
    }
}

/// Drops every record; for sessions nobody is tracking
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl ScoreRecorder for NullRecorder {
    fn record(&self, record: ScoreRecord) {
        debug!("Discarding score record for {}", record.user_name);
    }
}

/// Appends records as JSON lines from a background writer thread
pub struct JsonLinesRecorder {
    path: PathBuf,
    sender: Option<Sender<ScoreRecord>>,
    writer: Option<JoinHandle<()>>,
}

impl JsonLinesRecorder {
    /// Start the writer thread for `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (sender, receiver) = unbounded::<ScoreRecord>();
        let writer_path = path.clone();

        let writer = std::thread::spawn(move || {
            debug!("Score writer started for {:?}", writer_path);
            for record in receiver {
                if let Err(e) = append_record(&writer_path, &record) {
                    warn!("Failed to store score record for {}: {:#}", record.user_name, e);
                }
            }
            debug!("Score writer exiting");
        });

        Self {
            path,
            sender: Some(sender),
            writer: Some(writer),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreRecorder for JsonLinesRecorder {
    fn record(&self, record: ScoreRecord) {
        let Some(sender) = &self.sender else {
            return;
        };
        info!("Submitting score {} for {} on {}", record.score, record.user_name, record.exam_id);
        if sender.send(record).is_err() {
            warn!("Score writer has stopped; record dropped");
        }
    }
}

impl Drop for JsonLinesRecorder {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain and exit
        self.sender.take();
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}

fn append_record(path: &Path, record: &ScoreRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open records file: {:?}", path))?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Read every record from a JSON lines file. A missing file has no records.
/// Unparseable lines are skipped.
pub fn load_records(path: &Path) -> Result<Vec<ScoreRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open records file: {:?}", path))?;

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ScoreRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping malformed record on line {}: {}", number + 1, e),
        }
    }
    Ok(records)
}

/// Top records, optionally for a single exam: highest score first, most
/// recent first among equal scores.
pub fn leaderboard(records: &[ScoreRecord], exam_id: Option<&str>, limit: usize) -> Vec<ScoreRecord> {
    let mut ranked: Vec<ScoreRecord> = records
        .iter()
        .filter(|r| exam_id.map_or(true, |id| r.exam_id == id))
        .cloned()
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then(b.completed_at.cmp(&a.completed_at)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(exam: &str, user: &str, score: u32, at: u64) -> ScoreRecord {
        ScoreRecord {
            exam_id: exam.to_string(),
            user_name: user.to_string(),
            score,
            completed_at: at,
        }
    }

    #[test]
    fn test_record_json_layout() {
        let json = serde_json::to_value(record("drill", "ana", 40, 1700000000000)).unwrap();
        assert_eq!(json["examId"], "drill");
        assert_eq!(json["userName"], "ana");
        assert_eq!(json["score"], 40);
        assert_eq!(json["completedAt"], 1700000000000u64);
    }

    #[test]
    fn test_memory_recorder() {
        let recorder = MemoryRecorder::new();
        recorder.record(record("drill", "ana", 40, 1));
        recorder.record(record("drill", "ben", 20, 2));
        assert_eq!(recorder.records().len(), 2);
    }

    #[test]
    fn test_json_lines_recorder_writes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions").join("records.jsonl");

        {
            let recorder = JsonLinesRecorder::open(&path);
            recorder.record(record("drill", "ana", 40, 1));
            recorder.record(record("drill", "ben", 20, 2));
        }

        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded, vec![record("drill", "ana", 40, 1), record("drill", "ben", 20, 2)]);
    }

    #[test]
    fn test_json_lines_recorder_write_failure_is_not_propagated() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("records.jsonl");

        {
            let recorder = JsonLinesRecorder::open(&path);
            recorder.record(record("drill", "ana", 40, 1));
            recorder.record(record("drill", "ben", 20, 2));
        }

        assert!(!path.exists());
        assert!(blocker.is_file());
    }

    #[test]
    fn test_load_records_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load_records(&dir.path().join("none.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn test_load_records_skips_bad_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");
        std::fs::write(
            &path,
            "{\"examId\":\"d\",\"userName\":\"a\",\"score\":1,\"completedAt\":5}\nnot json\n\n",
        )
        .unwrap();
        assert_eq!(load_records(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_leaderboard_order_and_filter() {
        let records = vec![
            record("drill", "ana", 40, 1),
            record("drill", "ben", 60, 2),
            record("other", "cy", 90, 3),
            record("drill", "dee", 40, 4),
        ];

        let board = leaderboard(&records, Some("drill"), LEADERBOARD_LIMIT);
        let names: Vec<_> = board.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["ben", "dee", "ana"]);

        let board = leaderboard(&records, None, 2);
        let names: Vec<_> = board.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["cy", "ben"]);
    }
}
