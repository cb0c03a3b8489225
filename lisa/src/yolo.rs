//! The autonomous continuation loop and its explicit start/stop controls.
//!
//! `on_session_idle` runs once per idle signal from the host. It finds the
//! active epic, decides whether to stop or continue, persists the new state and
//! then (when continuing) sends the next directive to the session. The
//! iteration is written before dispatch, so a failed send still counts.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::types::YoloState;
use crate::core::yolo::{YoloDecision, decide};
use crate::epics::Artifacts;
use crate::error::LisaError;
use crate::io::layout::ProjectPaths;
use crate::io::notify::Notifier;
use crate::io::prompt::{ContinuationInputs, PromptEngine};
use crate::io::session::HostSession;
use crate::io::state_store::{
    EpicState, find_active_yolo_epic, now_timestamp, read_epic_state, update_epic_state,
    write_epic_state,
};
use crate::io::task_store::task_stats;

/// Result of one idle signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum IdleOutcome {
    NoActiveEpic,
    Completed {
        epic: String,
    },
    StoppedMaxIterations {
        epic: String,
        iteration: u32,
        max_iterations: u32,
        remaining: usize,
    },
    Continuing {
        epic: String,
        iteration: u32,
        remaining: usize,
        /// False when there was no session to send to or the send failed.
        dispatched: bool,
    },
}

/// Handle one idle signal.
pub fn on_session_idle(
    root: &Path,
    session_id: Option<&str>,
    host: &dyn HostSession,
    notifier: &dyn Notifier,
) -> Result<IdleOutcome> {
    let paths = ProjectPaths::new(root);
    let Some((epic, state)) = find_active_yolo_epic(&paths) else {
        return Ok(IdleOutcome::NoActiveEpic);
    };
    let Some(yolo) = state.yolo.clone() else {
        return Ok(IdleOutcome::NoActiveEpic);
    };
    let epic_paths = paths.epic(&epic);
    let remaining = task_stats(&epic_paths.tasks_dir).remaining();
    info!(
        service = "lisa",
        epic = %epic,
        remaining,
        iteration = yolo.iteration,
        max_iterations = yolo.max_iterations,
        "yolo idle check"
    );

    match decide(&yolo, remaining) {
        YoloDecision::Complete => {
            update_epic_state(&epic_paths.state_path, |state| {
                state.execute_complete = true;
                deactivate(state);
            })?;
            info!(service = "lisa", epic = %epic, "yolo complete");
            notifier.notify(
                "Lisa Complete",
                &format!("Epic \"{epic}\" finished successfully!"),
            );
            Ok(IdleOutcome::Completed { epic })
        }
        YoloDecision::MaxIterationsReached {
            iteration,
            max_iterations,
        } => {
            update_epic_state(&epic_paths.state_path, deactivate)?;
            info!(
                service = "lisa",
                epic = %epic,
                max_iterations,
                remaining,
                "yolo stopped at max iterations"
            );
            notifier.notify(
                "Lisa Stopped",
                &format!("Epic \"{epic}\" hit max iterations ({max_iterations})"),
            );
            Ok(IdleOutcome::StoppedMaxIterations {
                epic,
                iteration,
                max_iterations,
                remaining,
            })
        }
        YoloDecision::Continue { next_iteration } => {
            update_epic_state(&epic_paths.state_path, |state| {
                if let Some(yolo) = state.yolo.as_mut() {
                    yolo.iteration = next_iteration;
                }
            })?;
            let dispatched = dispatch(
                &epic,
                session_id,
                &ContinuationInputs {
                    epic: epic.clone(),
                    remaining,
                    iteration: next_iteration,
                    max_iterations: yolo.max_iterations,
                },
                host,
            );
            Ok(IdleOutcome::Continuing {
                epic,
                iteration: next_iteration,
                remaining,
                dispatched,
            })
        }
    }
}

fn deactivate(state: &mut EpicState) {
    if let Some(yolo) = state.yolo.as_mut() {
        yolo.active = false;
    }
}

fn dispatch(
    epic: &str,
    session_id: Option<&str>,
    inputs: &ContinuationInputs,
    host: &dyn HostSession,
) -> bool {
    let Some(session_id) = session_id else {
        warn!(service = "lisa", epic, "no session id on idle signal; continuation not sent");
        return false;
    };
    let sent = PromptEngine::new()
        .render_continuation(inputs)
        .and_then(|text| host.send_text(session_id, &text));
    match sent {
        Ok(()) => {
            info!(
                service = "lisa",
                epic,
                session_id,
                iteration = inputs.iteration,
                remaining = inputs.remaining,
                "yolo continuing"
            );
            true
        }
        Err(err) => {
            error!(
                service = "lisa",
                epic,
                session_id,
                err = format!("{err:#}"),
                "failed to send continuation"
            );
            false
        }
    }
}

/// Turn yolo mode on for `epic` with a fresh iteration count.
///
/// Refuses while a different epic is active, since the loop only services one.
pub fn start_yolo(root: &Path, epic: &str, max_iterations: u32) -> Result<EpicState, LisaError> {
    let paths = ProjectPaths::new(root);
    let epic_paths = paths.checked_epic(epic)?;
    if !epic_paths.dir.is_dir() {
        return Err(LisaError::EpicNotFound {
            name: epic.to_string(),
        });
    }
    if let Some((active, _)) = find_active_yolo_epic(&paths)
        && active != epic
    {
        return Err(LisaError::YoloAlreadyActive { active });
    }

    let mut state = read_epic_state(&epic_paths.state_path).unwrap_or_else(|| {
        EpicState::new(epic, Artifacts::probe(&epic_paths).inferred_phase())
    });
    let extra = state.yolo.take().map(|prior| prior.extra).unwrap_or_default();
    state.yolo = Some(YoloState {
        active: true,
        iteration: 0,
        max_iterations,
        started_at: now_timestamp(),
        extra,
    });
    write_epic_state(&epic_paths.state_path, &mut state)?;
    info!(service = "lisa", epic, max_iterations, "yolo started");
    Ok(state)
}

/// Turn yolo mode off for `epic`. Stopping an inactive epic is a no-op.
pub fn stop_yolo(root: &Path, epic: &str) -> Result<Option<EpicState>, LisaError> {
    let epic_paths = ProjectPaths::new(root).checked_epic(epic)?;
    if !epic_paths.dir.is_dir() {
        return Err(LisaError::EpicNotFound {
            name: epic.to_string(),
        });
    }
    match read_epic_state(&epic_paths.state_path) {
        Some(state) if state.yolo_active() => {
            let state = update_epic_state(&epic_paths.state_path, deactivate)?;
            info!(service = "lisa", epic, "yolo stopped");
            Ok(Some(state))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Phase;
    use crate::io::state_store::load_epic_state;
    use crate::test_support::{RecordingNotifier, RecordingSession, TestProject};

    fn state(project: &TestProject, epic: &str) -> EpicState {
        load_epic_state(&project.epic(epic).state_path).expect("state")
    }

    #[test]
    fn no_active_epic_is_a_no_op() {
        let project = TestProject::new();
        project.write_spec("e", "spec");
        let session = RecordingSession::default();
        let notifier = RecordingNotifier::default();

        let outcome = on_session_idle(project.root(), Some("s"), &session, &notifier).expect("idle");
        assert_eq!(outcome, IdleOutcome::NoActiveEpic);
        assert!(session.sent().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn continuing_increments_and_dispatches() {
        let project = TestProject::new();
        project.write_task("e", "01-a.md", "");
        project.write_task("e", "02-b.md", "## Status: done\n");
        project.start_yolo("e", 2, 5);
        let session = RecordingSession::default();
        let notifier = RecordingNotifier::default();

        let outcome = on_session_idle(project.root(), Some("s1"), &session, &notifier).expect("idle");
        assert_eq!(
            outcome,
            IdleOutcome::Continuing {
                epic: "e".to_string(),
                iteration: 3,
                remaining: 1,
                dispatched: true,
            }
        );
        let yolo = state(&project, "e").yolo.expect("yolo");
        assert!(yolo.active);
        assert_eq!(yolo.iteration, 3);

        let sent = session.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "s1");
        assert!(sent[0].1.contains("Iteration: 3 of 5"));
        assert!(sent[0].1.contains("Tasks remaining: 1"));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn failed_dispatch_keeps_persisted_iteration() {
        let project = TestProject::new();
        project.write_task("e", "01-a.md", "");
        project.start_yolo("e", 0, 0);
        let session = RecordingSession::failing();

        let outcome = on_session_idle(
            project.root(),
            Some("s"),
            &session,
            &RecordingNotifier::default(),
        )
        .expect("idle");
        assert!(matches!(outcome, IdleOutcome::Continuing { iteration: 1, dispatched: false, .. }));
        assert_eq!(state(&project, "e").yolo.map(|y| y.iteration), Some(1));
    }

    #[test]
    fn start_resets_iteration_and_refuses_second_epic() {
        let project = TestProject::new();
        project.write_spec("a", "spec");
        project.write_spec("b", "spec");
        project.start_yolo("a", 7, 10);

        let restarted = start_yolo(project.root(), "a", 20).expect("restart");
        let yolo = restarted.yolo.expect("yolo");
        assert_eq!((yolo.active, yolo.iteration, yolo.max_iterations), (true, 0, 20));
        assert_eq!(restarted.current_phase, Phase::Execute);

        assert!(matches!(
            start_yolo(project.root(), "b", 5),
            Err(LisaError::YoloAlreadyActive { active }) if active == "a"
        ));

        let stopped = stop_yolo(project.root(), "a").expect("stop").expect("state");
        assert!(!stopped.yolo_active());
        let started = start_yolo(project.root(), "b", 5).expect("start b");
        assert_eq!(started.current_phase, Phase::Spec);
    }

    #[test]
    fn idle_and_restart_keep_foreign_yolo_keys() {
        let project = TestProject::new();
        project.write_task("e", "01-a.md", "");
        let state_path = project.epic("e").state_path;
        std::fs::write(
            &state_path,
            r#"{"name":"e","currentPhase":"execute","owner":"sam","yolo":{"active":true,"iteration":1,"maxIterations":5,"startedAt":"2026-01-01T00:00:00.000Z","pausedBy":"me"}}"#,
        )
        .expect("write state");

        on_session_idle(
            project.root(),
            Some("s"),
            &RecordingSession::default(),
            &RecordingNotifier::default(),
        )
        .expect("idle");
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&state_path).expect("read")).expect("json");
        assert_eq!(raw["owner"], "sam");
        assert_eq!(raw["yolo"]["pausedBy"], "me");
        assert_eq!(raw["yolo"]["iteration"], 2);

        let restarted = start_yolo(project.root(), "e", 9).expect("restart");
        let yolo = restarted.yolo.expect("yolo");
        assert_eq!(yolo.iteration, 0);
        assert_eq!(yolo.extra.get("pausedBy"), Some(&serde_json::Value::from("me")));
    }

    #[test]
    fn stop_without_state_is_a_no_op() {
        let project = TestProject::new();
        project.write_spec("e", "spec");
        assert!(stop_yolo(project.root(), "e").expect("stop").is_none());
        assert!(!project.epic("e").state_path.exists());
    }
}
