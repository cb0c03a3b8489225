//! Rendering of the task execution bundle and the yolo continuation directive.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

const TASK_TEMPLATE: &str = include_str!("prompts/task.md");
const CONTINUATION_TEMPLATE: &str = include_str!("prompts/continuation.md");

/// A dependency record included in the bundle.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyBody {
    pub file: String,
    pub body: String,
}

/// Everything the task bundle template needs.
#[derive(Debug, Clone)]
pub struct TaskPromptInputs {
    pub epic: String,
    pub task_id: String,
    /// Project-relative path of the target record.
    pub task_path: String,
    pub task_body: String,
    pub spec: String,
    pub research: Option<String>,
    pub plan: Option<String>,
    /// Direct dependencies only, in declaration order.
    pub dependencies: Vec<DependencyBody>,
}

#[derive(Debug, Clone)]
pub struct ContinuationInputs {
    pub epic: String,
    pub remaining: usize,
    pub iteration: u32,
    /// Zero renders no bound.
    pub max_iterations: u32,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("task", TASK_TEMPLATE)
            .expect("task template should be valid");
        env.add_template("continuation", CONTINUATION_TEMPLATE)
            .expect("continuation template should be valid");
        Self { env }
    }

    pub fn render_task(&self, input: &TaskPromptInputs) -> Result<String> {
        let dependencies: Vec<DependencyBody> = input
            .dependencies
            .iter()
            .map(|dep| DependencyBody {
                file: dep.file.clone(),
                body: dep.body.trim().to_string(),
            })
            .collect();
        let template = self.env.get_template("task")?;
        let rendered = template.render(context! {
            epic => input.epic,
            task_id => input.task_id,
            task_path => input.task_path,
            task_body => input.task_body.trim(),
            spec => input.spec.trim(),
            research => non_blank(input.research.as_deref()),
            plan => non_blank(input.plan.as_deref()),
            dependencies => dependencies,
        })?;
        Ok(rendered)
    }

    pub fn render_continuation(&self, input: &ContinuationInputs) -> Result<String> {
        let template = self.env.get_template("continuation")?;
        let rendered = template.render(context! {
            epic => input.epic,
            remaining => input.remaining,
            iteration => input.iteration,
            max_iterations => (input.max_iterations > 0).then_some(input.max_iterations),
        })?;
        Ok(rendered)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> TaskPromptInputs {
        TaskPromptInputs {
            epic: "auth".to_string(),
            task_id: "02".to_string(),
            task_path: ".lisa/epics/auth/tasks/02-login.md".to_string(),
            task_body: "# Login\n\n## Status: pending\n".to_string(),
            spec: "# Spec\nUsers log in.\n".to_string(),
            research: None,
            plan: Some("   \n".to_string()),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn missing_documents_render_placeholders() {
        let rendered = PromptEngine::new().render_task(&inputs()).expect("render");
        assert!(rendered.contains("(No research conducted yet)"));
        assert!(rendered.contains("(No plan created yet)"));
        assert!(rendered.contains("(No task dependencies - this task is independent)"));
        assert!(rendered.contains("**File: .lisa/epics/auth/tasks/02-login.md**"));
        assert!(rendered.contains("You are executing task 02 of epic \"auth\""));
    }

    #[test]
    fn sections_appear_in_stable_order() {
        let mut input = inputs();
        input.research = Some("notes".to_string());
        input.dependencies = vec![
            DependencyBody {
                file: "01-setup.md".to_string(),
                body: "setup body\n".to_string(),
            },
            DependencyBody {
                file: "03-db.md".to_string(),
                body: "db body".to_string(),
            },
        ];
        let rendered = PromptEngine::new().render_task(&input).expect("render");

        let order = [
            "## Sandbox Constraints",
            "## Epic Spec",
            "## Research",
            "## Plan",
            "### 01-setup.md",
            "### 03-db.md",
            "## Current Task to Execute",
            "## Instructions",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|heading| rendered.find(heading).unwrap_or_else(|| panic!("missing {heading}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
        assert!(!rendered.contains("(No task dependencies"));
    }

    #[test]
    fn continuation_shows_bound_only_when_set() {
        let engine = PromptEngine::new();
        let bounded = engine
            .render_continuation(&ContinuationInputs {
                epic: "auth".to_string(),
                remaining: 3,
                iteration: 4,
                max_iterations: 10,
            })
            .expect("render");
        assert!(bounded.contains("Iteration: 4 of 10\n"));
        assert!(bounded.contains("Tasks remaining: 3"));
        assert!(bounded.contains("get_available_tasks(\"auth\")"));

        let unbounded = engine
            .render_continuation(&ContinuationInputs {
                epic: "auth".to_string(),
                remaining: 1,
                iteration: 7,
                max_iterations: 0,
            })
            .expect("render");
        assert!(unbounded.contains("Iteration: 7\n"));
        assert!(!unbounded.contains(" of "));
    }
}
