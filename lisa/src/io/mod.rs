//! I/O helpers for the epic workflow.

pub mod config;
pub mod layout;
pub mod notify;
pub mod plan;
pub mod process;
pub mod prompt;
pub mod session;
pub mod state_store;
pub mod task_store;
