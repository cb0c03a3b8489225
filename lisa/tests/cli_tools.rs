//! CLI tests: spawn the `lisa` binary against a throwaway project and check
//! the JSON it prints and the exit codes.

use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use lisa::exit_codes;
use lisa::io::state_store::load_epic_state;
use lisa::test_support::TestProject;
use serde_json::Value;

fn project() -> TestProject {
    let project = TestProject::new();
    project.write_project_config("[notifications]\nenabled = false\n");
    project
}

fn lisa(project: &TestProject, args: &[&str], stdin: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lisa"));
    cmd.arg("--root")
        .arg(project.root())
        .args(args)
        .env("HOME", project.root())
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().expect("spawn lisa");
    {
        let mut child_stdin = child.stdin.take().expect("stdin");
        if let Some(input) = stdin {
            child_stdin.write_all(input.as_bytes()).expect("write stdin");
        }
    }
    child.wait_with_output().expect("lisa output")
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

#[test]
fn available_prints_partition() {
    let project = project();
    project.write_spec("auth", "# Auth\n");
    project.write_plan("auth", "## Dependencies\n- 02: [01]\n");
    project.write_task("auth", "01-setup.md", "## Status: pending\n");
    project.write_task("auth", "02-login.md", "");

    let output = lisa(&project, &["available", "auth"], None);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let value = json(&output);
    assert_eq!(value["success"], true);
    assert_eq!(value["available"][0]["taskId"], "01");
    assert_eq!(value["blocked"][0]["taskId"], "02");
    assert_eq!(value["blocked"][0]["blockedBy"], serde_json::json!(["01"]));
}

#[test]
fn missing_epic_exits_not_found() {
    let project = project();

    let output = lisa(&project, &["context", "ghost", "01"], None);
    assert_eq!(output.status.code(), Some(exit_codes::NOT_FOUND));
    let value = json(&output);
    assert_eq!(value["success"], false);
    assert!(value["error"].as_str().expect("error").contains("ghost"));

    let output = lisa(&project, &["status", "ghost"], None);
    assert_eq!(output.status.code(), Some(exit_codes::NOT_FOUND));
    assert_eq!(json(&output)["found"], false);
}

#[test]
fn invalid_input_exits_invalid() {
    let project = project();
    project.write_spec("auth", "# Auth\n");

    let output = lisa(&project, &["context", "auth", "setup"], None);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert_eq!(json(&output)["success"], false);
}

#[test]
fn context_prints_prompt() {
    let project = project();
    project.write_spec("auth", "# Auth\nSPEC-TEXT\n");
    project.write_task("auth", "01-setup.md", "# Setup\n");

    let output = lisa(&project, &["context", "auth", "1"], None);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let value = json(&output);
    assert_eq!(value["taskFile"], "01-setup.md");
    assert!(value["prompt"].as_str().expect("prompt").contains("SPEC-TEXT"));
}

#[test]
fn epics_lists_names() {
    let project = project();
    project.write_spec("b", "spec");
    project.write_spec("a", "spec");

    let value = json(&lisa(&project, &["epics"], None));
    let names: Vec<&str> = value["epics"]
        .as_array()
        .expect("epics")
        .iter()
        .map(|e| e["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn idle_hook_emits_block_decision_and_persists_iteration() {
    let project = project();
    project.write_spec("auth", "spec");
    project.write_task("auth", "01-setup.md", "");
    let output = lisa(&project, &["yolo", "start", "auth", "--max-iterations", "3"], None);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let output = lisa(&project, &["idle"], Some(r#"{"session_id":"sess-1"}"#));
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let value = json(&output);
    assert_eq!(value["decision"], "block");
    assert!(value["reason"]
        .as_str()
        .expect("reason")
        .contains("Iteration: 1 of 3"));

    let state = load_epic_state(&project.epic("auth").state_path).expect("state");
    assert_eq!(state.yolo.map(|y| y.iteration), Some(1));
}

#[test]
fn idle_without_active_epic_prints_nothing() {
    let project = project();
    project.write_spec("auth", "spec");

    let output = lisa(&project, &["idle", "--session", "s"], None);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(output.stdout.is_empty());
}

#[test]
fn idle_does_not_wait_forever_on_open_stdin() {
    let project = TestProject::new();
    project.write_project_config(
        "[notifications]\nenabled = false\n\n[host]\nsend_timeout_secs = 1\n",
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_lisa"))
        .arg("--root")
        .arg(project.root())
        .arg("idle")
        .env("HOME", project.root())
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn lisa");
    let _held_open = child.stdin.take().expect("stdin");

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll lisa") {
            break Some(status);
        }
        if Instant::now() >= deadline {
            break None;
        }
        thread::sleep(Duration::from_millis(50));
    };
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    assert_eq!(status.and_then(|s| s.code()), Some(exit_codes::OK));
}

#[test]
fn config_init_then_view() {
    let project = TestProject::new();

    let output = lisa(&project, &["config", "init"], None);
    assert_eq!(json(&output)["configWritten"], true);

    let value = json(&lisa(&project, &["config", "view"], None));
    assert_eq!(value["config"]["yolo"]["default_max_iterations"], 100);
    assert!(value["sources"]["project"].is_string());
    assert_eq!(value["warnings"], serde_json::json!([]));
}
