//! Stable exit codes for `lisa` CLI commands.

/// Command succeeded (including an idle check that found nothing to do).
pub const OK: i32 = 0;
/// Invalid input, unreadable configuration or an I/O failure.
pub const INVALID: i32 = 1;
/// The named epic, its spec, or the requested task does not exist.
pub const NOT_FOUND: i32 = 2;
