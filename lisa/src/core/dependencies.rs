//! Parser for the `## Dependencies` section of an epic plan.
//!
//! The section is a line-oriented list:
//!
//! ```text
//! ## Dependencies
//! - 01: []
//! - 02: [01]
//! - 03: [01, 02]
//! ```
//!
//! It ends at the next `##` heading or at the end of the document. Lines that do
//! not match the entry shape are skipped; there is no partial-parse error.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::TaskId;

const SECTION_HEADING: &str = "## Dependencies";

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s*(\d+):\s*\[(.*)\]").unwrap());

/// A prerequisite as written in the plan.
///
/// The raw token is kept for reporting; `id` is set only when the token is a
/// bare number. A reference without an id can never be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    raw: String,
    id: Option<TaskId>,
}

impl DependencyRef {
    pub fn parse(token: &str) -> Self {
        Self {
            raw: token.to_string(),
            id: TaskId::parse(token),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub const fn id(&self) -> Option<TaskId> {
        self.id
    }
}

/// Mapping from task id to its ordered direct prerequisites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<TaskId, Vec<DependencyRef>>,
}

impl DependencyGraph {
    /// Parse the dependency section out of a plan document.
    ///
    /// A plan without the section yields an empty graph, which means every task
    /// is immediately available. When a task id appears twice the last entry wins.
    pub fn parse(plan: &str) -> Self {
        let mut graph = Self::default();
        for line in section_lines(plan) {
            let Some(caps) = ENTRY_RE.captures(line.trim_start()) else {
                continue;
            };
            let Some(task) = TaskId::parse(&caps[1]) else {
                continue;
            };
            let deps = caps[2]
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(DependencyRef::parse)
                .collect();
            graph.edges.insert(task, deps);
        }
        graph
    }

    /// Direct prerequisites of `task`; empty when the plan declares none.
    pub fn dependencies_of(&self, task: TaskId) -> &[DependencyRef] {
        self.edges.get(&task).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &[DependencyRef])> {
        self.edges.iter().map(|(id, deps)| (*id, deps.as_slice()))
    }
}

/// Lines between the `## Dependencies` heading and the next `##` heading.
fn section_lines(plan: &str) -> impl Iterator<Item = &str> {
    plan.lines()
        .skip_while(|line| line.trim_end() != SECTION_HEADING)
        .skip(1)
        .take_while(|line| !line.starts_with("##"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_deps(graph: &DependencyGraph, task: u64) -> Vec<&str> {
        graph
            .dependencies_of(TaskId::new(task))
            .iter()
            .map(DependencyRef::raw)
            .collect()
    }

    #[test]
    fn parses_entries_until_next_heading() {
        let plan = "# Plan\n\n## Tasks\n- 09: [01]\n\n## Dependencies\n- 01: []\n- 02: [01]\n- 03: [01, 02]\n\n## Risks\n- 04: [03]\n";
        let graph = DependencyGraph::parse(plan);

        assert_eq!(graph.len(), 3);
        assert!(raw_deps(&graph, 1).is_empty());
        assert_eq!(raw_deps(&graph, 2), vec!["01"]);
        assert_eq!(raw_deps(&graph, 3), vec!["01", "02"]);
        assert!(raw_deps(&graph, 4).is_empty(), "entries after the section are ignored");
        assert!(raw_deps(&graph, 9).is_empty(), "entries before the section are ignored");
    }

    #[test]
    fn missing_section_yields_empty_graph() {
        let graph = DependencyGraph::parse("# Plan\n\n## Tasks\n- 02: [01]\n");
        assert!(graph.is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let plan = "## Dependencies\n- 02 [01]\n* 03: [01]\nnotes here\n- xx: [01]\n- 04: [02]\n";
        let graph = DependencyGraph::parse(plan);
        assert_eq!(graph.len(), 1);
        assert_eq!(raw_deps(&graph, 4), vec!["02"]);
    }

    #[test]
    fn empty_tokens_are_discarded_and_tokens_trimmed() {
        let graph = DependencyGraph::parse("## Dependencies\n-   05:[ 01 ,, 03 , ]\n");
        assert_eq!(raw_deps(&graph, 5), vec!["01", "03"]);
    }

    #[test]
    fn padded_keys_share_one_entry_and_last_wins() {
        let graph = DependencyGraph::parse("## Dependencies\n- 02: [01]\n- 2: [03]\n");
        assert_eq!(graph.len(), 1);
        assert_eq!(raw_deps(&graph, 2), vec!["03"]);
    }

    #[test]
    fn non_numeric_dependency_keeps_raw_text_without_id() {
        let graph = DependencyGraph::parse("## Dependencies\n- 02: [setup]\n");
        let deps = graph.dependencies_of(TaskId::new(2));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].raw(), "setup");
        assert_eq!(deps[0].id(), None);
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let graph = DependencyGraph::parse("## Dependencies\r\n- 02: [01]\r\n");
        assert_eq!(raw_deps(&graph, 2), vec!["01"]);
    }
}
