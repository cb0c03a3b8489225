//! Loading of the plan document's dependency graph.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::dependencies::DependencyGraph;

/// Parse the dependency graph from `plan_path`.
///
/// The graph is re-read on every call. A missing or unreadable plan yields an
/// empty graph.
pub fn load_dependency_graph(plan_path: &Path) -> DependencyGraph {
    let Some(plan) = read_optional_document(plan_path) else {
        return DependencyGraph::default();
    };
    let graph = DependencyGraph::parse(&plan);
    debug!(path = %plan_path.display(), entries = graph.len(), "parsed dependency graph");
    graph
}

/// Read a markdown document, treating a missing or unreadable file as absent.
pub fn read_optional_document(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(err) => {
            warn!(path = %path.display(), err = %err, "ignoring unreadable document");
            None
        }
    }
}
