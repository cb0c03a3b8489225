//! Deterministic, pure logic shared by the epic workflow.
//!
//! Core modules must be free of I/O side effects. They operate on task records
//! and plan text that the `io` layer has already read, and return deterministic
//! outputs suitable for tests.

pub mod availability;
pub mod dependencies;
pub mod graph;
pub mod status;
pub mod types;
pub mod yolo;
