//! Canonical paths within `.lisa/` for a project root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::LisaError;

pub const LISA_DIR: &str = ".lisa";

/// Project-level paths under `.lisa/`.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub lisa_dir: PathBuf,
    pub epics_dir: PathBuf,
    pub config_path: PathBuf,
    pub local_config_path: PathBuf,
    pub gitignore_path: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let lisa_dir = root.join(LISA_DIR);
        Self {
            root: root.clone(),
            lisa_dir: lisa_dir.clone(),
            epics_dir: lisa_dir.join("epics"),
            config_path: lisa_dir.join("config.toml"),
            local_config_path: lisa_dir.join("config.local.toml"),
            gitignore_path: lisa_dir.join(".gitignore"),
        }
    }

    /// Paths for one epic. The name is not validated here; use
    /// [`ProjectPaths::checked_epic`] for caller-supplied names.
    pub fn epic(&self, name: &str) -> EpicPaths {
        EpicPaths::new(&self.epics_dir, name)
    }

    /// Validate `name` and return the epic paths.
    pub fn checked_epic(&self, name: &str) -> Result<EpicPaths, LisaError> {
        validate_epic_name(name)?;
        Ok(self.epic(name))
    }

    /// Names of all epic directories, in ascending order.
    ///
    /// A missing `.lisa/epics` is an empty project, not an error.
    pub fn epic_names(&self) -> Vec<String> {
        if !self.epics_dir.is_dir() {
            return Vec::new();
        }
        let entries = match fs::read_dir(&self.epics_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.epics_dir.display(), err = %err, "cannot list epics");
                return Vec::new();
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| fs::metadata(entry.path()).is_ok_and(|meta| meta.is_dir()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}

/// Paths for a single epic under `.lisa/epics/<name>/`.
#[derive(Debug, Clone)]
pub struct EpicPaths {
    pub name: String,
    pub dir: PathBuf,
    pub spec_path: PathBuf,
    pub research_path: PathBuf,
    pub plan_path: PathBuf,
    pub tasks_dir: PathBuf,
    pub state_path: PathBuf,
}

impl EpicPaths {
    pub fn new(epics_dir: &Path, name: &str) -> Self {
        let dir = epics_dir.join(name);
        Self {
            name: name.to_string(),
            dir: dir.clone(),
            spec_path: dir.join("spec.md"),
            research_path: dir.join("research.md"),
            plan_path: dir.join("plan.md"),
            tasks_dir: dir.join("tasks"),
            state_path: dir.join(".state"),
        }
    }

    /// Project-relative path of a task record, as shown to agents.
    pub fn task_display_path(&self, file_name: &str) -> String {
        format!("{LISA_DIR}/epics/{}/tasks/{file_name}", self.name)
    }
}

/// Epic names double as directory names and must be safe slugs.
pub fn validate_epic_name(name: &str) -> Result<(), LisaError> {
    let invalid = |reason: &str| LisaError::InvalidEpicName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.starts_with('.') {
        return Err(invalid("name must not start with '.'"));
    }
    if name
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
    {
        return Err(invalid("name must be [A-Za-z0-9._-] only"));
    }
    Ok(())
}
