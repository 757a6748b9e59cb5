//! Write-ahead log and snapshot persistence under `<data_dir>/node<id>/`
//! (spec §6 "Persisted state"). One JSON-lines file per committed entry,
//! plus a single snapshot file the state machine can recover from.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub index: u64,
    pub term: u64,
    pub command: govern_core::Command,
}

/// Append-only log file plus snapshot file, both rooted at `node_dir`.
pub struct Wal {
    node_dir: PathBuf,
}

impl Wal {
    pub fn open(node_dir: &Path) -> Result<Self, ConsensusError> {
        std::fs::create_dir_all(node_dir)?;
        Ok(Self { node_dir: node_dir.to_path_buf() })
    }

    fn log_path(&self) -> PathBuf {
        self.node_dir.join("wal.log")
    }

    fn snapshot_path(&self) -> PathBuf {
        self.node_dir.join("snapshot.json")
    }

    /// Replay every persisted entry in file order — used at startup to
    /// rebuild the in-memory log and rehydrate the state machine.
    pub fn replay(&self) -> Result<Vec<LogEntry>, ConsensusError> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    pub fn append(&self, entry: &LogEntry) -> Result<(), ConsensusError> {
        let mut file = OpenOptions::new().create(true).append(true).open(self.log_path())?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        file.sync_data()?;
        Ok(())
    }

    pub fn write_snapshot(&self, state_machine: &crate::state_machine::CommandStateMachine) -> Result<(), ConsensusError> {
        let file = File::create(self.snapshot_path())?;
        state_machine.save_snapshot(file)
    }

    pub fn read_snapshot(&self, state_machine: &mut crate::state_machine::CommandStateMachine) -> Result<(), ConsensusError> {
        let path = self.snapshot_path();
        if !path.exists() {
            return state_machine.recover_from_snapshot(&[][..]);
        }
        let file = File::open(path)?;
        state_machine.recover_from_snapshot(file)
    }

    /// Truncate the log once a snapshot covers everything before
    /// `up_to_index`, retaining `compaction_overhead` trailing entries —
    /// mirrors the config's `compaction_overhead` knob (spec §4.G).
    pub fn compact(&self, entries: &[LogEntry], up_to_index: u64, overhead: u64) -> Result<Vec<LogEntry>, ConsensusError> {
        let keep_from = up_to_index.saturating_sub(overhead);
        let retained: Vec<LogEntry> = entries.iter().filter(|e| e.index > keep_from).cloned().collect();

        let mut file = File::create(self.log_path())?;
        for entry in &retained {
            writeln!(file, "{}", serde_json::to_string(entry)?)?;
        }
        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::CommandStateMachine;
    use govern_core::{Command, CommandType};
    use tempfile::tempdir;

    #[test]
    fn append_then_replay_round_trips() {
        let dir = tempdir().unwrap();
        let wal = Wal::open(dir.path()).unwrap();
        let entry = LogEntry { index: 1, term: 1, command: Command::new(CommandType::Facts, serde_json::json!({})) };
        wal.append(&entry).unwrap();
        let replayed = wal.replay().unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].command.id, entry.command.id);
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let wal = Wal::open(dir.path()).unwrap();
        let mut sm = CommandStateMachine::new();
        sm.update(Command::with_id(CommandType::Facts, serde_json::json!({}), Some("a".into())));
        wal.write_snapshot(&sm).unwrap();

        let mut restored = CommandStateMachine::new();
        wal.read_snapshot(&mut restored).unwrap();
        assert_eq!(restored.command_count(), 1);
    }

    #[test]
    fn missing_snapshot_yields_empty_state() {
        let dir = tempdir().unwrap();
        let wal = Wal::open(dir.path()).unwrap();
        let mut sm = CommandStateMachine::new();
        wal.read_snapshot(&mut sm).unwrap();
        assert_eq!(sm.command_count(), 0);
    }

    #[test]
    fn compact_retains_only_the_trailing_overhead_and_rewrites_the_log_file() {
        let dir = tempdir().unwrap();
        let wal = Wal::open(dir.path()).unwrap();
        let entries: Vec<LogEntry> = (1..=10)
            .map(|i| LogEntry { index: i, term: 1, command: Command::new(CommandType::Facts, serde_json::json!({})) })
            .collect();
        for entry in &entries {
            wal.append(entry).unwrap();
        }

        let retained = wal.compact(&entries, 10, 3).unwrap();
        assert_eq!(retained.iter().map(|e| e.index).collect::<Vec<_>>(), vec![8, 9, 10]);

        let replayed = wal.replay().unwrap();
        assert_eq!(replayed.iter().map(|e| e.index).collect::<Vec<_>>(), vec![8, 9, 10]);
    }
}
