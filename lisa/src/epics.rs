//! Epic listing and per-epic status for `lisa epics` and `lisa status`.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::core::status::TaskStats;
use crate::core::types::{Phase, YoloState};
use crate::error::LisaError;
use crate::io::layout::{EpicPaths, ProjectPaths};
use crate::io::state_store::read_epic_state;
use crate::io::task_store::task_stats;

/// Which of an epic's files exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    pub spec: bool,
    pub research: bool,
    pub plan: bool,
    pub tasks: bool,
    pub state: bool,
}

impl Artifacts {
    pub fn probe(paths: &EpicPaths) -> Self {
        Self {
            spec: paths.spec_path.exists(),
            research: paths.research_path.exists(),
            plan: paths.plan_path.exists(),
            tasks: paths.tasks_dir.exists(),
            state: paths.state_path.exists(),
        }
    }

    /// Phase implied by the most advanced artifact present.
    pub const fn inferred_phase(&self) -> Phase {
        if self.tasks {
            Phase::Execute
        } else if self.plan {
            Phase::Plan
        } else if self.research {
            Phase::Research
        } else if self.spec {
            Phase::Spec
        } else {
            Phase::New
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicSummary {
    pub name: String,
    pub phase: Phase,
    /// Only reported during execution.
    pub tasks: Option<TaskProgress>,
    pub yolo_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpicList {
    pub epics: Vec<EpicSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Summarize every epic directory in name order.
pub fn list_epics(root: &Path) -> EpicList {
    let paths = ProjectPaths::new(root);
    if !paths.epics_dir.is_dir() {
        return EpicList {
            epics: Vec::new(),
            message: Some("No epics found. Start one with `/lisa <name>`".to_string()),
        };
    }

    let epics = paths
        .epic_names()
        .into_iter()
        .map(|name| summarize(&paths.epic(&name)))
        .collect();
    EpicList {
        epics,
        message: None,
    }
}

fn summarize(paths: &EpicPaths) -> EpicSummary {
    let (phase, yolo_active) = if paths.state_path.exists() {
        // A record that exists but cannot be read reports `unknown`.
        read_epic_state(&paths.state_path)
            .map_or((Phase::Unknown, false), |state| {
                (state.current_phase, state.yolo_active())
            })
    } else {
        (Artifacts::probe(paths).inferred_phase(), false)
    };
    let tasks = (phase == Phase::Execute).then(|| {
        let stats = task_stats(&paths.tasks_dir);
        TaskProgress {
            done: stats.done,
            total: stats.total,
        }
    });
    debug!(epic = %paths.name, phase = %phase, "summarized epic");
    EpicSummary {
        name: paths.name.clone(),
        phase,
        tasks,
        yolo_active,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicStatus {
    pub found: bool,
    pub name: String,
    pub current_phase: Phase,
    pub artifacts: Artifacts,
    pub tasks: TaskStats,
    pub yolo: Option<YoloState>,
    pub last_updated: Option<String>,
    pub next_action: String,
}

/// Detailed status of one epic.
pub fn get_epic_status(root: &Path, epic: &str) -> Result<EpicStatus, LisaError> {
    let paths = ProjectPaths::new(root).checked_epic(epic)?;
    if !paths.dir.is_dir() {
        return Err(LisaError::EpicNotFound {
            name: epic.to_string(),
        });
    }

    let artifacts = Artifacts::probe(&paths);
    let state = artifacts
        .state
        .then(|| read_epic_state(&paths.state_path))
        .flatten();
    let tasks = task_stats(&paths.tasks_dir);

    let current_phase = match state.as_ref().map(|s| s.current_phase) {
        Some(phase) if phase != Phase::Unknown => phase,
        _ => artifacts.inferred_phase(),
    };

    Ok(EpicStatus {
        found: true,
        name: epic.to_string(),
        current_phase,
        artifacts,
        tasks,
        next_action: next_action(epic, &artifacts, &tasks),
        yolo: state.as_ref().and_then(|s| s.yolo.clone()),
        last_updated: state.and_then(|s| s.last_updated),
    })
}

fn next_action(epic: &str, artifacts: &Artifacts, tasks: &TaskStats) -> String {
    if !artifacts.spec {
        format!("Create spec with `/lisa {epic} spec`")
    } else if !artifacts.research {
        format!("Run `/lisa {epic}` to start research")
    } else if !artifacts.plan {
        format!("Run `/lisa {epic}` to create plan")
    } else if tasks.remaining() > 0 {
        format!(
            "Run `/lisa {epic}` to continue execution or `/lisa {epic} yolo` for auto mode"
        )
    } else if tasks.blocked > 0 {
        format!("{} task(s) blocked - review and unblock", tasks.blocked)
    } else {
        "Epic complete!".to_string()
    }
}
