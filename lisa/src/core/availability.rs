//! Deterministic partition of open tasks into available and blocked.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::dependencies::{DependencyGraph, DependencyRef};
use crate::core::types::{TaskId, TaskRecord, TaskStatus};

/// A task whose declared dependencies are all done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTask {
    pub task_id: String,
    pub file: String,
    pub status: TaskStatus,
}

/// A task waiting on at least one dependency.
///
/// This is distinct from the `blocked` status marker: a status-blocked task is
/// never listed here, it is excluded from the partition altogether.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedTask {
    pub task_id: String,
    pub file: String,
    /// Unmet dependencies, as written in the plan, in declaration order.
    pub blocked_by: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: Vec<AvailableTask>,
    pub blocked: Vec<BlockedTask>,
}

/// Partition every pending or in-progress record.
///
/// `records` must already be in ascending id order; the output keeps that order.
/// A dependency counts as met only when it names an existing task whose status
/// is `done`, so references to missing tasks block their dependents forever.
pub fn resolve(records: &[TaskRecord], graph: &DependencyGraph) -> Availability {
    let statuses = status_index(records);
    let mut availability = Availability::default();

    for record in records.iter().filter(|r| !r.status.is_closed()) {
        let unmet: Vec<String> = graph
            .dependencies_of(record.id)
            .iter()
            .filter(|dep| !is_met(dep, &statuses))
            .map(|dep| dep.raw().to_string())
            .collect();

        if unmet.is_empty() {
            availability.available.push(AvailableTask {
                task_id: record.label.clone(),
                file: record.file_name.clone(),
                status: record.status,
            });
        } else {
            availability.blocked.push(BlockedTask {
                task_id: record.label.clone(),
                file: record.file_name.clone(),
                blocked_by: unmet,
            });
        }
    }

    availability
}

/// Status per task id. If two records share an id, the later one in sort order
/// decides.
fn status_index(records: &[TaskRecord]) -> BTreeMap<TaskId, TaskStatus> {
    records
        .iter()
        .map(|record| (record.id, record.status))
        .collect()
}

fn is_met(dep: &DependencyRef, statuses: &BTreeMap<TaskId, TaskStatus>) -> bool {
    dep.id()
        .and_then(|id| statuses.get(&id))
        .is_some_and(|status| *status == TaskStatus::Done)
}
