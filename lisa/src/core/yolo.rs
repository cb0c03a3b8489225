//! Pure decision step of the autonomous continuation loop.

use crate::core::types::YoloState;

/// What the loop should do for an active epic on one idle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YoloDecision {
    /// No pending or in-progress work is left.
    Complete,
    /// The iteration cap is reached; the counter is left as is.
    MaxIterationsReached { iteration: u32, max_iterations: u32 },
    /// Keep going; `next_iteration` is exactly one more than the current count.
    Continue { next_iteration: u32 },
}

/// Decide the next transition. Completion is checked before the cap, so an epic
/// that finishes on its last allowed iteration is reported complete.
pub fn decide(yolo: &YoloState, remaining: usize) -> YoloDecision {
    if remaining == 0 {
        return YoloDecision::Complete;
    }
    if yolo.max_iterations > 0 && yolo.iteration >= yolo.max_iterations {
        return YoloDecision::MaxIterationsReached {
            iteration: yolo.iteration,
            max_iterations: yolo.max_iterations,
        };
    }
    YoloDecision::Continue {
        next_iteration: yolo.iteration.saturating_add(1),
    }
}
