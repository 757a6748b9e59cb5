//! Command state machine (spec §4.H): the deterministic applier behind the
//! replicated log. Holds two tables — proposed commands and locally
//! recorded results — and never reads the clock, a PRNG, or scheduler
//! state during `update`; every value it needs arrives inside the log
//! entry (the `Command` itself already carries its own `timestamp`,
//! stamped by the proposer before the entry reached the log).

use std::collections::BTreeMap;
use std::io::{Read, Write};

use govern_core::{Command, CommandResult};
use serde::{Deserialize, Serialize};

/// A `Lookup` query (spec §4.H): empty means "all commands"; otherwise a
/// command or result id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LookupQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupResult {
    All { commands: Vec<Command> },
    Command(Box<Command>),
    Result(Box<CommandResult>),
    NotFound,
}

/// Snapshot wire shape. `BTreeMap` (not `HashMap`) so `save_snapshot`'s
/// JSON encoding is byte-stable across runs with the same contents — the
/// round-trip law in spec §8 requires it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    commands: BTreeMap<String, Command>,
    results: BTreeMap<String, CommandResult>,
}

/// Owned exclusively by the log-apply thread (spec §5); external readers
/// go through `lookup`, which the replica serializes on its behalf.
#[derive(Clone, Debug, Default)]
pub struct CommandStateMachine {
    commands: BTreeMap<String, Command>,
    results: BTreeMap<String, CommandResult>,
}

impl CommandStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one log entry. Returns the same opaque "bytes applied" value
    /// the original state machine returns from `Update` — callers don't
    /// interpret it, they only check that `update` succeeded.
    pub fn update(&mut self, command: Command) -> usize {
        let encoded_len = serde_json::to_vec(&command).map(|b| b.len()).unwrap_or(0);
        self.commands.insert(command.id.clone(), command);
        encoded_len
    }

    pub fn lookup(&self, query: &LookupQuery) -> LookupResult {
        if let Some(id) = &query.command_id {
            return match self.commands.get(id) {
                Some(cmd) => LookupResult::Command(Box::new(cmd.clone())),
                None => LookupResult::NotFound,
            };
        }
        if let Some(id) = &query.result_id {
            return match self.results.get(id) {
                Some(result) => LookupResult::Result(Box::new(result.clone())),
                None => LookupResult::NotFound,
            };
        }
        LookupResult::All { commands: self.commands.values().cloned().collect() }
    }

    /// Local-only: not invoked by log application (spec §4.H).
    pub fn store_result(&mut self, result: CommandResult) {
        self.results.insert(result.id.clone(), result);
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn save_snapshot<W: Write>(&self, mut writer: W) -> Result<(), crate::error::ConsensusError> {
        let snapshot = Snapshot { commands: self.commands.clone(), results: self.results.clone() };
        let bytes = serde_json::to_vec(&snapshot)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Replaces both maps wholesale. A reader with no bytes (fresh node,
    /// never snapshotted) yields two empty maps rather than an error.
    pub fn recover_from_snapshot<R: Read>(&mut self, mut reader: R) -> Result<(), crate::error::ConsensusError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            self.commands = BTreeMap::new();
            self.results = BTreeMap::new();
            return Ok(());
        }
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        self.commands = snapshot.commands;
        self.results = snapshot.results;
        Ok(())
    }

    /// No-op, matching the spec's `Close` contract — nothing here owns a
    /// handle that needs releasing.
    pub fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use govern_core::CommandType;

    fn command(id: &str) -> Command {
        Command::with_id(CommandType::Facts, serde_json::json!({}), Some(id.to_string()))
    }

    #[test]
    fn update_then_lookup_by_id() {
        let mut sm = CommandStateMachine::new();
        sm.update(command("a"));
        let result = sm.lookup(&LookupQuery { command_id: Some("a".into()), result_id: None });
        assert!(matches!(result, LookupResult::Command(_)));
    }

    #[test]
    fn empty_query_returns_all() {
        let mut sm = CommandStateMachine::new();
        sm.update(command("a"));
        sm.update(command("b"));
        let LookupResult::All { commands } = sm.lookup(&LookupQuery::default()) else {
            panic!("expected All variant");
        };
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn snapshot_round_trip_preserves_lookup_behavior() {
        let mut sm = CommandStateMachine::new();
        sm.update(command("a"));
        sm.store_result(CommandResult::ok("a", serde_json::json!({"ok": true})));

        let mut bytes = Vec::new();
        sm.save_snapshot(&mut bytes).unwrap();

        let mut restored = CommandStateMachine::new();
        restored.recover_from_snapshot(&bytes[..]).unwrap();

        assert_eq!(restored.command_count(), sm.command_count());
        let result = restored.lookup(&LookupQuery { command_id: None, result_id: Some("a".into()) });
        assert!(matches!(result, LookupResult::Result(_)));
    }

    #[test]
    fn save_snapshot_is_byte_stable_for_same_contents() {
        let mut a = CommandStateMachine::new();
        a.update(command("x"));
        a.update(command("y"));
        let mut b = CommandStateMachine::new();
        // Insert in the opposite order — BTreeMap ordering makes the
        // encoded bytes independent of insertion order.
        b.update(command("y"));
        b.update(command("x"));

        let mut bytes_a = Vec::new();
        let mut bytes_b = Vec::new();
        a.save_snapshot(&mut bytes_a).unwrap();
        b.save_snapshot(&mut bytes_b).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn recover_from_empty_reader_yields_empty_state() {
        let mut sm = CommandStateMachine::new();
        sm.update(command("a"));
        sm.recover_from_snapshot(&[][..]).unwrap();
        assert_eq!(sm.command_count(), 0);
    }
}
