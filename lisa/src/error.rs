//! Caller-visible failures of the tool surface.
//!
//! Plumbing inside the `io` layer uses `anyhow` with context; these variants are
//! the ones a caller is expected to branch on.

use crate::exit_codes;

#[derive(Debug, thiserror::Error)]
pub enum LisaError {
    #[error("invalid epic name '{name}': {reason}")]
    InvalidEpicName { name: String, reason: String },

    #[error("Epic \"{name}\" not found. Start it with `/lisa {name}`")]
    EpicNotFound { name: String },

    #[error("No spec.md found for epic \"{name}\"")]
    SpecMissing { name: String },

    #[error("Task \"{task_id}\" not found in {tasks_dir}")]
    TaskNotFound { task_id: String, tasks_dir: String },

    #[error("invalid task id '{0}': expected a numeric prefix such as '01'")]
    InvalidTaskId(String),

    #[error("yolo mode is already active for epic \"{active}\"; stop it first")]
    YoloAlreadyActive { active: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LisaError {
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EpicNotFound { .. } | Self::SpecMissing { .. } | Self::TaskNotFound { .. }
        )
    }

    pub const fn exit_code(&self) -> i32 {
        if self.is_not_found() {
            exit_codes::NOT_FOUND
        } else {
            exit_codes::INVALID
        }
    }
}
