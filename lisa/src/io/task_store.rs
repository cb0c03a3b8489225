//! Read side of the task record store (`.lisa/epics/<name>/tasks/*.md`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::core::status::{TaskStats, classify, sort_records};
use crate::core::types::{TaskId, TaskRecord, numeric_prefix};

/// Load every `*.md` record in `tasks_dir`, sorted by numeric id.
///
/// A missing directory is an empty collection. Records that cannot be read are
/// skipped with a warning and so count toward nothing.
pub fn load_tasks(tasks_dir: &Path) -> Vec<TaskRecord> {
    let mut records: Vec<TaskRecord> = task_file_names(tasks_dir)
        .into_iter()
        .filter_map(|file_name| match read_record(tasks_dir, &file_name) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(file = %file_name, err = format!("{err:#}"), "skipping unreadable task record");
                None
            }
        })
        .collect();
    sort_records(&mut records);
    debug!(dir = %tasks_dir.display(), count = records.len(), "loaded task records");
    records
}

pub fn task_stats(tasks_dir: &Path) -> TaskStats {
    TaskStats::from_records(&load_tasks(tasks_dir))
}

/// Names of the `*.md` files in `tasks_dir`, unsorted. Symlinks count when
/// their target is a regular file.
pub fn task_file_names(tasks_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(tasks_dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".md"))
        .collect()
}

fn read_record(tasks_dir: &Path, file_name: &str) -> Result<TaskRecord> {
    let path = tasks_dir.join(file_name);
    let (id, label) = match TaskId::from_file_name(file_name) {
        Some((id, prefix)) => (id, prefix.to_string()),
        None if !numeric_prefix(file_name).is_empty() => {
            bail!("task id prefix of {file_name} is out of range")
        }
        None => (TaskId::default(), file_name.trim_end_matches(".md").to_string()),
    };
    let body = fs::read_to_string(&path)
        .with_context(|| format!("read task record {}", path.display()))?;
    Ok(TaskRecord {
        id,
        label,
        file_name: file_name.to_string(),
        status: classify(&body),
        body,
    })
}
