// Integration tests for CLI commands
// These drive the built binary against a state file in a temp directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Run charter with this workspace's config and state file.
    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_charter"))
            .arg("--config")
            .arg(self.path("config.toml"))
            .arg("--state")
            .arg(self.path("state.json"))
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute command")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_charter"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Operator CLI for the charter governance constitution"));
    for command in ["validate", "resolve", "apply", "propose", "vote", "withdraw", "show", "add-member", "init"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_charter"))
        .arg("version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(stdout(&output).contains("charter"));
}

#[test]
fn test_cli_validate_exit_status() {
    let ws = Workspace::new();
    let good = ws.write("good.json", r#"{"actions": [{"name": "set_recovery_threshold", "args": {"threshold": 3}}]}"#);
    let bad = ws.write("bad.json", r#"{"actions": [{"name": "set_recovery_threshold", "args": {"threshold": 0}}]}"#);

    let output = ws.run(&["validate", "--proposal", path_arg(&good)]);
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["valid"], true);

    let output = ws.run(&["validate", "--proposal", path_arg(&bad)]);
    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["valid"], false);
    assert_eq!(
        result["description"],
        "set_recovery_threshold at position 0 failed validation: threshold must be greater than or equal to 1"
    );
}

#[test]
fn test_cli_resolve() {
    let ws = Workspace::new();
    let proposal = ws.write("p.json", r#"{"actions": [{"name": "always_accept_with_two_votes"}]}"#);
    let votes = ws.write(
        "votes.json",
        r#"[{"member_id": "a", "vote": true}, {"member_id": "b", "vote": true}]"#,
    );

    let output = ws.run(&["resolve", "--proposal", path_arg(&proposal), "--proposer", "a"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "Open");

    let output = ws.run(&[
        "resolve",
        "--proposal",
        path_arg(&proposal),
        "--proposer",
        "a",
        "--votes",
        path_arg(&votes),
    ]);
    assert_eq!(stdout(&output).trim(), "Accepted");
}

#[test]
fn test_cli_lifecycle() {
    let ws = Workspace::new();
    for member in ["m0", "m1", "m2"] {
        assert!(ws.run(&["add-member", "--member-id", member]).status.success());
    }
    let proposal = ws.write("p.json", r#"{"actions": [{"name": "rekey_ledger"}]}"#);

    let output = ws.run(&["propose", "--proposal", path_arg(&proposal), "--proposer", "m0"]);
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["state"], "Open");
    let id = summary["proposal_id"].as_str().unwrap().to_string();

    assert!(ws.run(&["vote", "--proposal-id", &id, "--member", "m0", "--accept"]).status.success());
    let output = ws.run(&["vote", "--proposal-id", &id, "--member", "m1", "--accept"]);
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["state"], "Accepted");

    let output = ws.run(&["vote", "--proposal-id", &id, "--member", "m2", "--reject"]);
    assert_eq!(output.status.code(), Some(1));

    let output = ws.run(&["show", "--proposal-id", &id]);
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["info"]["ballots"]["m1"], true);
    assert_eq!(shown["proposal"]["actions"][0]["name"], "rekey_ledger");

    let state: serde_json::Value = serde_json::from_str(&fs::read_to_string(ws.path("state.json")).unwrap()).unwrap();
    assert_eq!(state["node"]["ledger_generation"], 1);
}

#[test]
fn test_cli_init_writes_config() {
    let ws = Workspace::new();
    assert!(ws.run(&["init"]).status.success());
    assert!(ws.path("config.toml").exists());

    let output = ws.run(&["init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert!(ws.run(&["init", "--force"]).status.success());
}
