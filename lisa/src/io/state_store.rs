//! Epic state records (`.lisa/epics/<name>/.state`).
//!
//! A record is read whole, merged in memory and written whole. There is no
//! locking: concurrent writers race and the last one wins. Writes go through a
//! temp file and a rename so readers never see a torn record.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::types::{Phase, YoloState};
use crate::io::layout::ProjectPaths;

/// Persisted state of one epic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_phase: Phase,
    #[serde(default)]
    pub spec_complete: bool,
    #[serde(default)]
    pub research_complete: bool,
    #[serde(default)]
    pub plan_complete: bool,
    #[serde(default)]
    pub execute_complete: bool,
    /// ISO-8601 timestamp, refreshed on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yolo: Option<YoloState>,
    /// Keys written by other tools; carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EpicState {
    pub fn new(name: &str, phase: Phase) -> Self {
        Self {
            name: name.to_string(),
            current_phase: phase,
            ..Self::default()
        }
    }

    pub fn yolo_active(&self) -> bool {
        self.yolo.as_ref().is_some_and(|yolo| yolo.active)
    }
}

/// Current UTC time in the record's timestamp format.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Load a state record, failing on missing or malformed files.
pub fn load_epic_state(path: &Path) -> Result<EpicState> {
    debug!(path = %path.display(), "loading epic state");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read epic state {}", path.display()))?;
    let state: EpicState = serde_json::from_str(&contents)
        .with_context(|| format!("parse epic state {}", path.display()))?;
    Ok(state)
}

/// Load a state record, treating a missing or unreadable record as absent.
pub fn read_epic_state(path: &Path) -> Option<EpicState> {
    if !path.exists() {
        return None;
    }
    match load_epic_state(path) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!(path = %path.display(), err = format!("{err:#}"), "ignoring unreadable epic state");
            None
        }
    }
}

/// Write a state record, stamping `lastUpdated`.
pub fn write_epic_state(path: &Path, state: &mut EpicState) -> Result<()> {
    state.last_updated = Some(now_timestamp());
    debug!(path = %path.display(), phase = %state.current_phase, "writing epic state");
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Read-modify-write a state record and return what was written.
pub fn update_epic_state<F: FnOnce(&mut EpicState)>(path: &Path, apply: F) -> Result<EpicState> {
    let mut state = load_epic_state(path)?;
    apply(&mut state);
    write_epic_state(path, &mut state)?;
    Ok(state)
}

/// The first epic, in name order, whose state has yolo mode active.
///
/// Only one epic should be active at a time; if several are, the others are
/// not serviced until the first one stops.
pub fn find_active_yolo_epic(paths: &ProjectPaths) -> Option<(String, EpicState)> {
    paths.epic_names().into_iter().find_map(|name| {
        let state = read_epic_state(&paths.epic(&name).state_path)?;
        state.yolo_active().then_some((name, state))
    })
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("epic state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp epic state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace epic state {}", path.display()))?;
    Ok(())
}
