//! Diagnostics for dependency declarations that can never be satisfied.
//!
//! The resolver itself keeps the plain semantics (an unmet dependency blocks),
//! so a cycle or a reference to a task that does not exist leaves tasks blocked
//! forever. These checks name the cause instead of leaving it silent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::core::dependencies::DependencyGraph;
use crate::core::types::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum GraphWarning {
    /// `task_id` depends on something that is not a known task.
    UnknownReference { task_id: String, dependency: String },
    /// The listed tasks depend on each other in a loop (a self-dependency is a
    /// cycle of one).
    Cycle { tasks: Vec<String> },
}

impl fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownReference {
                task_id,
                dependency,
            } => write!(
                f,
                "task {task_id} depends on '{dependency}', which is not a known task"
            ),
            Self::Cycle { tasks } => write!(f, "dependency cycle: {}", tasks.join(" -> ")),
        }
    }
}

/// Check a graph against the set of task ids that actually exist.
///
/// Unknown references come first (in graph order), then cycles.
pub fn diagnose(graph: &DependencyGraph, known: &BTreeSet<TaskId>) -> Vec<GraphWarning> {
    let mut warnings = Vec::new();

    for (task, deps) in graph.iter() {
        for dep in deps {
            let resolved = dep.id().is_some_and(|id| known.contains(&id));
            if !resolved {
                warnings.push(GraphWarning::UnknownReference {
                    task_id: task.to_string(),
                    dependency: dep.raw().to_string(),
                });
            }
        }
    }

    warnings.extend(
        find_cycles(graph)
            .into_iter()
            .map(|cycle| GraphWarning::Cycle {
                tasks: cycle.iter().map(TaskId::to_string).collect(),
            }),
    );
    warnings
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Finished,
}

/// Depth-first search for back edges. Each reported cycle starts and ends on
/// the same task id.
fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<TaskId>> {
    let mut marks: BTreeMap<TaskId, Mark> = BTreeMap::new();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();

    for (task, _) in graph.iter() {
        if !marks.contains_key(&task) {
            visit(graph, task, &mut marks, &mut stack, &mut cycles);
        }
    }
    cycles
}

fn visit(
    graph: &DependencyGraph,
    task: TaskId,
    marks: &mut BTreeMap<TaskId, Mark>,
    stack: &mut Vec<TaskId>,
    cycles: &mut Vec<Vec<TaskId>>,
) {
    marks.insert(task, Mark::Visiting);
    stack.push(task);

    for dep in graph.dependencies_of(task).iter().filter_map(|dep| dep.id()) {
        match marks.get(&dep) {
            Some(Mark::Visiting) => {
                if let Some(start) = stack.iter().position(|id| *id == dep) {
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(dep);
                    cycles.push(cycle);
                }
            }
            Some(Mark::Finished) => {}
            None => visit(graph, dep, marks, stack, cycles),
        }
    }

    stack.pop();
    marks.insert(task, Mark::Finished);
}
