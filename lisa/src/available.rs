//! `get_available_tasks`: which open tasks of an epic can run now.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::availability::{AvailableTask, BlockedTask, resolve};
use crate::core::graph::{GraphWarning, diagnose};
use crate::error::LisaError;
use crate::io::layout::ProjectPaths;
use crate::io::plan::load_dependency_graph;
use crate::io::task_store::load_tasks;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailableTasks {
    pub available: Vec<AvailableTask>,
    pub blocked: Vec<BlockedTask>,
    /// Declarations that can never be satisfied. Present only when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<GraphWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AvailableTasks {
    fn empty(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::default()
        }
    }
}

/// Partition the epic's open tasks using the plan's dependency section.
///
/// Both the records and the plan are read fresh on every call.
pub fn get_available_tasks(root: &Path, epic: &str) -> Result<AvailableTasks, LisaError> {
    let paths = ProjectPaths::new(root).checked_epic(epic)?;
    if !paths.dir.is_dir() {
        return Err(LisaError::EpicNotFound {
            name: epic.to_string(),
        });
    }
    if !paths.tasks_dir.is_dir() {
        return Ok(AvailableTasks::empty("No tasks directory found"));
    }
    let records = load_tasks(&paths.tasks_dir);
    if records.is_empty() {
        return Ok(AvailableTasks::empty("No task files found"));
    }

    let graph = load_dependency_graph(&paths.plan_path);
    let known: BTreeSet<_> = records.iter().map(|record| record.id).collect();
    let warnings = diagnose(&graph, &known);
    for warning in &warnings {
        warn!(epic, warning = %warning, "unsatisfiable dependency");
    }

    let availability = resolve(&records, &graph);
    debug!(
        epic,
        available = availability.available.len(),
        blocked = availability.blocked.len(),
        "resolved availability"
    );
    Ok(AvailableTasks {
        available: availability.available,
        blocked: availability.blocked,
        warnings,
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TaskStatus;
    use crate::test_support::TestProject;

    #[test]
    fn missing_epic_is_an_error() {
        let project = TestProject::new();
        assert!(matches!(
            get_available_tasks(project.root(), "nope"),
            Err(LisaError::EpicNotFound { .. })
        ));
        assert!(matches!(
            get_available_tasks(project.root(), "../up"),
            Err(LisaError::InvalidEpicName { .. })
        ));
    }

    #[test]
    fn missing_tasks_reports_message() {
        let project = TestProject::new();
        project.write_spec("e", "spec");
        let result = get_available_tasks(project.root(), "e").expect("result");
        assert_eq!(result.message.as_deref(), Some("No tasks directory found"));

        std::fs::create_dir_all(project.epic("e").tasks_dir).expect("mkdir");
        let result = get_available_tasks(project.root(), "e").expect("result");
        assert_eq!(result.message.as_deref(), Some("No task files found"));
        assert!(result.available.is_empty() && result.blocked.is_empty());
    }

    #[test]
    fn resolves_against_plan_on_disk() {
        let project = TestProject::new();
        project.write_spec("e", "spec");
        project.write_plan("e", "## Dependencies\n- 01: []\n- 02: [01]\n- 03: [07]\n");
        project.write_task("e", "01-a.md", "## Status: in-progress\n");
        project.write_task("e", "02-b.md", "");
        project.write_task("e", "03-c.md", "");

        let result = get_available_tasks(project.root(), "e").expect("result");
        assert_eq!(result.available.len(), 1);
        assert_eq!(result.available[0].task_id, "01");
        assert_eq!(result.available[0].status, TaskStatus::InProgress);
        let blocked: Vec<&str> = result.blocked.iter().map(|b| b.task_id.as_str()).collect();
        assert_eq!(blocked, vec!["02", "03"]);
        assert_eq!(
            result.warnings,
            vec![GraphWarning::UnknownReference {
                task_id: "3".to_string(),
                dependency: "07".to_string(),
            }]
        );

        project.write_task("e", "01-a.md", "## Status: done\n");
        let result = get_available_tasks(project.root(), "e").expect("result");
        assert_eq!(result.available[0].task_id, "02");
    }
}
