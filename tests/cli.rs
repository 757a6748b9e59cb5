//! Black-box tests against the `govern` binary itself (spec §6).

use std::process::Command;

fn govern() -> Command {
    Command::new(env!("CARGO_BIN_EXE_govern"))
}

#[test]
fn local_facts_prints_hostname_row() {
    let output = govern().arg("local").arg("facts").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.lines().any(|l| l.starts_with("hostname")));
}

#[test]
fn local_lint_without_path_flag_exits_non_zero() {
    let output = govern().arg("local").arg("lint").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--file") || stderr.contains("--directory"));
}

#[test]
fn local_apply_empty_directory_reports_zero_failures() {
    let dir = tempfile::tempdir().unwrap();
    let output = govern().args(["local", "apply", "--directory"]).arg(dir.path()).output().unwrap();
    assert!(output.status.success());
}

#[test]
fn local_lint_rejects_dependency_cycle() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("cycle.yaml"),
        "users:\n  present:\n    - name: a\n      after: [\"users::present::b\"]\n    - name: b\n      after: [\"users::present::a\"]\n",
    )
    .unwrap();
    let output = govern().args(["local", "lint", "--directory"]).arg(dir.path()).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn mesh_start_rejects_zero_replica_id() {
    let output = govern()
        .args(["mesh", "start", "--replica-id", "0", "--raft-address", "127.0.0.1:0", "--http-address", "127.0.0.1:0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn mesh_facts_broadcast_flag_is_accepted() {
    // No listener on this port: we only care that `--broadcast` parses and
    // the failure is a connection error, not a clap usage error.
    let output = govern()
        .args(["mesh", "facts", "--node", "127.0.0.1:1", "--broadcast"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(!stderr.contains("unexpected argument"));
}

#[test]
fn mesh_start_rejects_join_without_initial_members() {
    let output = govern()
        .args([
            "mesh",
            "start",
            "--replica-id",
            "1",
            "--raft-address",
            "127.0.0.1:0",
            "--http-address",
            "127.0.0.1:0",
            "--join",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
