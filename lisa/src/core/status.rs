//! Status classification and aggregate statistics for task records.

use serde::Serialize;

use crate::core::types::{TaskRecord, TaskStatus};

/// Markers checked in precedence order; the first one found in the body wins.
const PRECEDENCE: [TaskStatus; 3] = [TaskStatus::Done, TaskStatus::InProgress, TaskStatus::Blocked];

/// Classify a task body by its status marker.
///
/// Precedence is `done > in-progress > blocked`, and a body without any marker
/// is `pending`. Human-edited records sometimes carry more than one marker, so
/// this is a substring scan rather than a line parse.
pub fn classify(body: &str) -> TaskStatus {
    PRECEDENCE
        .into_iter()
        .find(|status| body.contains(status.marker()))
        .unwrap_or(TaskStatus::Pending)
}

/// Sort records by numeric id, then by file name for a stable tie-break.
pub fn sort_records(records: &mut [TaskRecord]) {
    records.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.file_name.cmp(&b.file_name)));
}

/// Per-status counts over an epic's task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
}

impl TaskStats {
    pub fn from_statuses<I: IntoIterator<Item = TaskStatus>>(statuses: I) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total += 1;
            match status {
                TaskStatus::Done => stats.done += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Blocked => stats.blocked += 1,
            }
        }
        stats
    }

    pub fn from_records(records: &[TaskRecord]) -> Self {
        Self::from_statuses(records.iter().map(|record| record.status))
    }

    /// Work the continuation loop can still make progress on.
    ///
    /// Blocked tasks are excluded: they need a human, not another iteration.
    pub const fn remaining(&self) -> usize {
        self.pending + self.in_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[test]
    fn body_without_marker_is_pending() {
        assert_eq!(classify("# Task\n\nDo things.\n"), TaskStatus::Pending);
        assert_eq!(classify("## Status: pending\n"), TaskStatus::Pending);
    }

    #[test]
    fn done_marker_wins_over_other_markers() {
        let body = "## Status: in-progress\n\n## Report\n\n## Status: done\n## Status: blocked\n";
        assert_eq!(classify(body), TaskStatus::Done);
    }

    #[test]
    fn in_progress_wins_over_blocked() {
        let body = "## Status: blocked\nretrying\n## Status: in-progress\n";
        assert_eq!(classify(body), TaskStatus::InProgress);
    }

    #[test]
    fn counts_always_sum_to_total() {
        let statuses = [
            TaskStatus::Done,
            TaskStatus::Done,
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Blocked,
        ];
        let stats = TaskStats::from_statuses(statuses);
        assert_eq!(stats.total, 5);
        assert_eq!(
            stats.done + stats.in_progress + stats.pending + stats.blocked,
            stats.total
        );
    }

    #[test]
    fn remaining_excludes_blocked_and_done() {
        let stats = TaskStats::from_statuses([
            TaskStatus::Done,
            TaskStatus::Blocked,
            TaskStatus::Pending,
            TaskStatus::InProgress,
        ]);
        assert_eq!(stats.remaining(), 2);
    }

    #[test]
    fn sort_orders_numerically_not_lexically() {
        let mut records = vec![
            record(10, "10-ten.md", TaskStatus::Pending),
            record(2, "2-two.md", TaskStatus::Pending),
            record(0, "notes.md", TaskStatus::Pending),
            record(2, "02-also-two.md", TaskStatus::Pending),
        ];
        sort_records(&mut records);
        let files: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(files, vec!["notes.md", "02-also-two.md", "2-two.md", "10-ten.md"]);
    }
}
