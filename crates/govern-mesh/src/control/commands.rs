//! Node-local execution of a `Command` (spec §4.I, §9 Open Question (c)).
//!
//! Every command type is executed against this node only — including
//! `apply_laws`, which (per the canonicalized Open Question (c)) never
//! replicates the YAML file contents themselves through the log, only the
//! `Command` record that it ran.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use govern_core::{ApplyLawsPayload, Command, CommandResult, CommandType, ExecPayload, ExecResult, FactsPayload};
use tokio::process::Command as ProcessCommand;
use tracing::{info, warn};

/// Execute `command` against this node, honoring `timeout` for subprocess
/// and child-process work (spec §5 "Cancellation / timeouts": every
/// externally issued command carries a deadline).
pub async fn execute(command: &Command, timeout: Duration, laws_root: &std::path::Path) -> CommandResult {
    let result = match command.kind {
        CommandType::Exec => execute_exec(command, timeout).await,
        CommandType::Facts => execute_facts(command),
        CommandType::ApplyLaws => execute_apply_laws(command, laws_root).await,
    };

    match result {
        Ok(output) => CommandResult::ok(command.id.clone(), output),
        Err(error) => CommandResult::err(command.id.clone(), error),
    }
}

async fn execute_exec(command: &Command, timeout: Duration) -> Result<serde_json::Value, String> {
    let payload: ExecPayload =
        serde_json::from_value(command.payload.clone()).map_err(|e| format!("invalid exec payload: {e}"))?;

    if payload.command.is_empty() {
        return Err("exec payload missing `command`".to_string());
    }

    let mut cmd = ProcessCommand::new(&payload.command);
    cmd.args(&payload.args);
    cmd.envs(&payload.env);
    if let Some(dir) = &payload.work_dir {
        cmd.current_dir(dir);
    }
    cmd.kill_on_drop(true);

    info!(command = %payload.command, "executing exec command");
    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| format!("command timed out after {timeout:?}"))?
        .map_err(|e| format!("failed to spawn `{}`: {e}", payload.command))?;

    let result = ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    serde_json::to_value(result).map_err(|e| e.to_string())
}

fn execute_facts(command: &Command) -> Result<serde_json::Value, String> {
    let payload: FactsPayload =
        serde_json::from_value(command.payload.clone()).map_err(|e| format!("invalid facts payload: {e}"))?;

    let facts = govern_facts::Facts::collect();
    let mut value = serde_json::to_value(&facts).map_err(|e| e.to_string())?;

    if !payload.categories.is_empty() {
        if let Some(obj) = value.as_object() {
            let filtered: serde_json::Map<String, serde_json::Value> = obj
                .iter()
                .filter(|(key, _)| payload.categories.iter().any(|c| c == *key))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            value = serde_json::Value::Object(filtered);
        }
    }
    Ok(value)
}

async fn execute_apply_laws(command: &Command, laws_root: &std::path::Path) -> Result<serde_json::Value, String> {
    let payload: ApplyLawsPayload =
        serde_json::from_value(command.payload.clone()).map_err(|e| format!("invalid apply_laws payload: {e}"))?;

    let facts = govern_facts::Facts::collect();
    let mut per_file: Vec<HashMap<String, serde_json::Value>> = Vec::new();

    let files: Vec<PathBuf> = if payload.law_files.is_empty() {
        vec![laws_root.to_path_buf()]
    } else {
        payload.law_files.iter().map(PathBuf::from).collect()
    };

    let mut applied_total = 0usize;
    let mut failed_total = 0usize;

    for file in &files {
        match govern_laws::load_and_apply(file, &facts, payload.dry_run).await {
            Ok(report) => {
                applied_total += report.applied.len();
                failed_total += report.failed.len();
                let mut entry = HashMap::new();
                entry.insert("file".to_string(), serde_json::json!(file.display().to_string()));
                entry.insert("law_count".to_string(), serde_json::json!(report.applied.len() + report.skipped.len() + report.failed.len()));
                entry.insert("failed".to_string(), serde_json::json!(report.failed.len()));
                per_file.push(entry);
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "apply_laws failed for file");
                return Err(format!("{}: {e}", file.display()));
            }
        }
    }

    Ok(serde_json::json!({
        "dry_run": payload.dry_run,
        "files": per_file,
        "applied": applied_total,
        "failed": failed_total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use govern_core::CommandType;

    #[tokio::test]
    async fn facts_command_returns_hostname() {
        let command = Command::new(CommandType::Facts, serde_json::json!({}));
        let result = execute(&command, Duration::from_secs(5), std::path::Path::new(".")).await;
        assert!(result.success);
        assert!(result.output.unwrap().get("hostname").is_some());
    }

    #[tokio::test]
    async fn exec_command_runs_and_captures_output() {
        let command = Command::new(
            CommandType::Exec,
            serde_json::json!({"command": "echo", "args": ["hi"]}),
        );
        let result = execute(&command, Duration::from_secs(5), std::path::Path::new(".")).await;
        assert!(result.success);
        let output = result.output.unwrap();
        assert_eq!(output["stdout"].as_str().unwrap().trim(), "hi");
    }

    #[tokio::test]
    async fn exec_command_missing_field_is_a_failure() {
        let command = Command::new(CommandType::Exec, serde_json::json!({}));
        let result = execute(&command, Duration::from_secs(5), std::path::Path::new(".")).await;
        assert!(!result.success);
    }
}
