//! Workflow state manager for multi-phase epics (spec, research, plan,
//! execute) driven by an external agent host.
//!
//! The crate follows a strict split:
//!
//! - **[`core`]**: pure logic (status classification, dependency parsing,
//!   availability, loop decisions). No I/O.
//! - **[`io`]**: filesystem layout, state records, config, prompt rendering,
//!   host session and notification adapters.
//!
//! The orchestration modules ([`epics`], [`available`], [`context`], [`yolo`])
//! combine the two into the operations exposed as tool calls and CLI commands.

pub mod available;
pub mod context;
pub mod core;
pub mod epics;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
pub mod yolo;
