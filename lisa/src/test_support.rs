//! Test-only fixtures: task records, throwaway projects and recording fakes for
//! the host session and notifier.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tempfile::TempDir;

use crate::core::types::{Phase, TaskId, TaskRecord, TaskStatus, YoloState};
use crate::io::layout::{EpicPaths, ProjectPaths};
use crate::io::notify::Notifier;
use crate::io::session::HostSession;
use crate::io::state_store::{EpicState, write_epic_state};

/// A record whose body carries only the status marker (none for pending).
pub fn record(id: u64, file_name: &str, status: TaskStatus) -> TaskRecord {
    let label = TaskId::from_file_name(file_name).map_or_else(
        || file_name.trim_end_matches(".md").to_string(),
        |(_, prefix)| prefix.to_string(),
    );
    let body = match status {
        TaskStatus::Pending => format!("# {file_name}\n"),
        other => format!("# {file_name}\n\n{}\n", other.marker()),
    };
    TaskRecord {
        id: TaskId::new(id),
        label,
        file_name: file_name.to_string(),
        status,
        body,
    }
}

/// A project root in a temp directory with helpers for writing epic files.
pub struct TestProject {
    temp: TempDir,
    pub paths: ProjectPaths,
}

impl TestProject {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = ProjectPaths::new(temp.path());
        Self { temp, paths }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn epic(&self, name: &str) -> EpicPaths {
        self.paths.epic(name)
    }

    /// Create the epic directory with a spec.
    pub fn write_spec(&self, epic: &str, spec: &str) -> PathBuf {
        let paths = self.epic(epic);
        write(&paths.spec_path, spec)
    }

    pub fn write_research(&self, epic: &str, research: &str) -> PathBuf {
        write(&self.epic(epic).research_path, research)
    }

    pub fn write_plan(&self, epic: &str, plan: &str) -> PathBuf {
        write(&self.epic(epic).plan_path, plan)
    }

    pub fn write_task(&self, epic: &str, file_name: &str, body: &str) -> PathBuf {
        write(&self.epic(epic).tasks_dir.join(file_name), body)
    }

    pub fn write_state(&self, epic: &str, state: &EpicState) {
        let mut state = state.clone();
        write_epic_state(&self.epic(epic).state_path, &mut state).expect("write state");
    }

    /// Write an execute-phase state with yolo mode in the given shape.
    pub fn start_yolo(&self, epic: &str, iteration: u32, max_iterations: u32) {
        let mut state = EpicState::new(epic, Phase::Execute);
        state.spec_complete = true;
        state.plan_complete = true;
        state.yolo = Some(YoloState {
            active: true,
            iteration,
            max_iterations,
            started_at: "2026-01-01T00:00:00.000Z".to_string(),
            ..YoloState::default()
        });
        self.write_state(epic, &state);
    }

    pub fn write_project_config(&self, toml: &str) {
        write(&self.paths.config_path, toml);
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

fn write(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write fixture");
    path.to_path_buf()
}

/// Records every directive instead of delivering it.
#[derive(Default)]
pub struct RecordingSession {
    pub sent: RefCell<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingSession {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.borrow().clone()
    }
}

impl HostSession for RecordingSession {
    fn send_text(&self, session_id: &str, text: &str) -> Result<()> {
        self.sent
            .borrow_mut()
            .push((session_id.to_string(), text.to_string()));
        if self.fail {
            bail!("session {session_id} is gone");
        }
        Ok(())
    }
}

/// Records `(title, message)` pairs.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.sent
            .borrow_mut()
            .push((title.to_string(), message.to_string()));
    }
}
