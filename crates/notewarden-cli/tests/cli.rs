use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

fn notewarden(data_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("notewarden"));
    cmd.env("NOTEWARDEN_DIR", data_dir.path())
        .env_remove("NOTEWARDEN_MASTER_KEY")
        .env_remove("NOTEWARDEN_DB_PATH")
        .arg("--config")
        .arg(data_dir.path().join("config.toml"));
    cmd
}

fn create_agent(data_dir: &TempDir) -> String {
    let output = notewarden(data_dir)
        .args([
            "agent",
            "create",
            "--name",
            "helper",
            "--provider",
            "openai",
            "--model",
            "gpt-4o",
            "--folders",
            "notes/*,journal",
            "--can-write",
            "--format",
            "json",
        ])
        .output()
        .expect("failed to run notewarden");
    assert!(output.status.success());
    let agent: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("create did not print JSON");
    agent["id"].as_str().expect("agent id missing").to_string()
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("notewarden"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("Notewarden"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("notewarden"));
    cmd.arg("--version").assert().success();
}

#[test]
fn test_agent_create_show_list() {
    let dir = TempDir::new().unwrap();
    let id = create_agent(&dir);

    notewarden(&dir)
        .args(["agent", "show", &id])
        .assert()
        .success()
        .stdout(contains("notes/*, journal"))
        .stdout(contains("read,write"));

    notewarden(&dir)
        .args(["agent", "list"])
        .assert()
        .success()
        .stdout(contains("helper"));

    notewarden(&dir)
        .args(["agent", "disable", &id])
        .assert()
        .success()
        .stdout(contains("Agent disabled"));
}

#[test]
fn test_credential_value_never_printed() {
    let dir = TempDir::new().unwrap();
    let id = create_agent(&dir);

    notewarden(&dir)
        .args(["credential", "set", &id, "api_key", "sk-very-secret"])
        .assert()
        .success();

    notewarden(&dir)
        .args(["credential", "list", &id, "--format", "json"])
        .assert()
        .success()
        .stdout(contains("api_key"))
        .stdout(contains("sk-very-secret").not());
}

#[test]
fn test_invalid_agent_rejected() {
    let dir = TempDir::new().unwrap();
    notewarden(&dir)
        .args([
            "agent",
            "create",
            "--name",
            "bad",
            "--provider",
            "openai",
            "--model",
            "gpt-4o",
            "--max-requests-per-hour",
            "0",
        ])
        .assert()
        .failure()
        .stderr(contains("max_requests_per_hour"));
}

#[test]
fn test_delete_and_missing_agent() {
    let dir = TempDir::new().unwrap();
    let id = create_agent(&dir);

    notewarden(&dir)
        .args(["agent", "delete", &id])
        .assert()
        .success()
        .stdout(contains("Agent deleted"));

    notewarden(&dir)
        .args(["agent", "show", &id])
        .assert()
        .failure()
        .stderr(contains("not found"));
}

#[test]
fn test_empty_lists_print_notice() {
    let data_dir = TempDir::new().unwrap();
    notewarden(&data_dir)
        .args(["agent", "list"])
        .assert()
        .success()
        .stdout(contains("No agents found."));
    notewarden(&data_dir)
        .args(["session", "list"])
        .assert()
        .success()
        .stdout(contains("No sessions found."));
}
