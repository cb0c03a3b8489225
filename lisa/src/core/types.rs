//! Shared deterministic types for the epic workflow core.
//!
//! These types define stable contracts between the status store, the dependency
//! resolver, the context assembler and the continuation loop. They carry no I/O.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical task identifier taken from the numeric prefix of a task record.
///
/// Zero padding in file names is cosmetic: `01-setup.md` and `1-setup.md` both
/// carry task id `1`. Ordering and equality always use the integer value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parse a bare numeric id such as `07`. Signs, whitespace and other
    /// characters are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse::<u64>().ok().map(Self)
    }

    /// Split the leading digits off a record file name.
    ///
    /// Returns the parsed id and the prefix exactly as written, or `None` when
    /// the name does not start with a digit or the prefix does not fit an id.
    pub fn from_file_name(name: &str) -> Option<(Self, &str)> {
        let prefix = numeric_prefix(name);
        Self::parse(prefix).map(|id| (id, prefix))
    }
}

/// Leading ASCII digits of `name`, possibly empty.
pub fn numeric_prefix(name: &str) -> &str {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    &name[..digits]
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a single task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }

    /// The literal marker line that encodes this status in a task record.
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Pending => "## Status: pending",
            Self::InProgress => "## Status: in-progress",
            Self::Done => "## Status: done",
            Self::Blocked => "## Status: blocked",
        }
    }

    /// Done and blocked tasks are never offered for execution.
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Done | Self::Blocked)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow phase of an epic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    New,
    Spec,
    Research,
    Plan,
    Execute,
    Done,
    /// The state record is missing the phase or holds a value we do not know.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Spec => "spec",
            Self::Research => "research",
            Self::Plan => "plan",
            Self::Execute => "execute",
            Self::Done => "done",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task record as read from an epic's task collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,
    /// Numeric prefix as written in the file name (`"01"`); the file stem when
    /// the name has no numeric prefix.
    pub label: String,
    pub file_name: String,
    pub status: TaskStatus,
    pub body: String,
}

/// Autonomous-mode bookkeeping stored inside an epic's state record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YoloState {
    pub active: bool,
    /// Completed continuation cycles since the last explicit start.
    pub iteration: u32,
    /// Upper bound on continuation cycles; `0` means unbounded.
    pub max_iterations: u32,
    pub started_at: String,
    /// Keys written by other tools; carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_ignores_zero_padding() {
        assert_eq!(TaskId::parse("07"), Some(TaskId::new(7)));
        assert_eq!(TaskId::parse("007"), TaskId::parse("7"));
    }

    #[test]
    fn task_id_rejects_non_numeric_text() {
        assert_eq!(TaskId::parse(""), None);
        assert_eq!(TaskId::parse("+1"), None);
        assert_eq!(TaskId::parse(" 1"), None);
        assert_eq!(TaskId::parse("a1"), None);
    }

    #[test]
    fn task_id_from_file_name_keeps_written_prefix() {
        let (id, prefix) = TaskId::from_file_name("03-wire-api.md").expect("prefix");
        assert_eq!(id, TaskId::new(3));
        assert_eq!(prefix, "03");
        assert!(TaskId::from_file_name("notes.md").is_none());
    }

    #[test]
    fn task_id_holds_prefixes_past_u32() {
        let (id, prefix) = TaskId::from_file_name("4294967296-big.md").expect("prefix");
        assert_eq!(id, TaskId::new(4_294_967_296));
        assert_eq!(prefix, "4294967296");
        assert_eq!(TaskId::parse("4294967296"), Some(id));
        assert!(TaskId::from_file_name("99999999999999999999-huge.md").is_none());
        assert_eq!(numeric_prefix("99999999999999999999-huge.md"), "99999999999999999999");
    }

    #[test]
    fn yolo_state_keeps_unknown_keys() {
        let raw = r#"{"active":true,"iteration":2,"maxIterations":5,"startedAt":"x","pausedBy":"me"}"#;
        let yolo: YoloState = serde_json::from_str(raw).expect("parse");
        assert_eq!(yolo.extra.get("pausedBy"), Some(&Value::from("me")));
        let value = serde_json::to_value(&yolo).expect("serialize");
        assert_eq!(value["pausedBy"], "me");
        assert_eq!(value["maxIterations"], 5);
    }

    #[test]
    fn unknown_phase_strings_deserialize_as_unknown() {
        let phase: Phase = serde_json::from_str("\"reviewing\"").expect("parse");
        assert_eq!(phase, Phase::Unknown);
        let phase: Phase = serde_json::from_str("\"execute\"").expect("parse");
        assert_eq!(phase, Phase::Execute);
    }
}
