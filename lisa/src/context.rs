//! `build_task_context`: the self-contained bundle a sub-agent executes one
//! task from.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::core::types::{TaskId, TaskRecord, TaskStatus};
use crate::error::LisaError;
use crate::io::layout::ProjectPaths;
use crate::io::plan::{load_dependency_graph, read_optional_document};
use crate::io::prompt::{DependencyBody, PromptEngine, TaskPromptInputs};
use crate::io::task_store::load_tasks;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlreadyDone {
    pub already_done: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBundle {
    pub task_file: String,
    pub task_path: String,
    pub prompt: String,
    /// Files of the dependency records included in the prompt.
    pub dependencies: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TaskContext {
    AlreadyDone(AlreadyDone),
    Ready(TaskBundle),
}

/// Build the execution bundle for `task_id` of `epic`.
///
/// Only the task's direct dependencies are included; siblings and the task's
/// own record never appear in the dependency section.
pub fn build_task_context(
    root: &Path,
    epic: &str,
    task_id: &str,
) -> Result<TaskContext, LisaError> {
    let paths = ProjectPaths::new(root).checked_epic(epic)?;
    if !paths.dir.is_dir() {
        return Err(LisaError::EpicNotFound {
            name: epic.to_string(),
        });
    }
    let spec = read_optional_document(&paths.spec_path)
        .filter(|spec| !spec.trim().is_empty())
        .ok_or_else(|| LisaError::SpecMissing {
            name: epic.to_string(),
        })?;
    let id = TaskId::parse(task_id).ok_or_else(|| LisaError::InvalidTaskId(task_id.to_string()))?;

    let records = load_tasks(&paths.tasks_dir);
    let target = find_record(&records, id).ok_or_else(|| LisaError::TaskNotFound {
        task_id: task_id.to_string(),
        tasks_dir: paths.tasks_dir.display().to_string(),
    })?;

    if target.status == TaskStatus::Done {
        return Ok(TaskContext::AlreadyDone(AlreadyDone {
            already_done: true,
            message: format!("Task {task_id} is already complete"),
        }));
    }

    let graph = load_dependency_graph(&paths.plan_path);
    let mut seen = BTreeSet::new();
    let dependencies: Vec<DependencyBody> = graph
        .dependencies_of(id)
        .iter()
        .filter_map(|dep| dep.id())
        .filter(|dep_id| *dep_id != id && seen.insert(*dep_id))
        .filter_map(|dep_id| find_record(&records, dep_id))
        .map(|record| DependencyBody {
            file: record.file_name.clone(),
            body: record.body.clone(),
        })
        .collect();

    let task_path = paths.task_display_path(&target.file_name);
    let prompt = PromptEngine::new().render_task(&TaskPromptInputs {
        epic: epic.to_string(),
        task_id: task_id.to_string(),
        task_path: task_path.clone(),
        task_body: target.body.clone(),
        spec,
        research: read_optional_document(&paths.research_path),
        plan: read_optional_document(&paths.plan_path),
        dependencies: dependencies.clone(),
    })?;

    info!(
        epic,
        task_id,
        dependencies = dependencies.len(),
        "built task context"
    );
    Ok(TaskContext::Ready(TaskBundle {
        task_file: target.file_name.clone(),
        task_path,
        prompt,
        dependencies: dependencies.into_iter().map(|dep| dep.file).collect(),
        message: format!(
            "Context built for task {task_id}. Pass the 'prompt' field to a sub-agent to execute it."
        ),
    }))
}

/// First record, in id order, whose file name carries `id` as its prefix.
fn find_record(records: &[TaskRecord], id: TaskId) -> Option<&TaskRecord> {
    records
        .iter()
        .find(|record| record.id == id && TaskId::from_file_name(&record.file_name).is_some())
}
