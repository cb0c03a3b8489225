//! Delivery of continuation directives to the host agent session.
//!
//! The loop only needs "send this text to that session". How that happens
//! depends on the host: some expose a command that injects a message, others
//! run `lisa idle` as a stop hook and read a block decision from stdout.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::io::process::run_command_with_timeout;

const SESSION_PLACEHOLDER: &str = "{session}";
const OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

/// Host-side messaging. Delivery is one-shot: no acknowledgement is awaited
/// beyond the call returning.
pub trait HostSession {
    fn send_text(&self, session_id: &str, text: &str) -> Result<()>;
}

/// Runs a configured command with the directive on stdin.
///
/// Every `{session}` in the argv is replaced with the session id.
#[derive(Debug, Clone)]
pub struct CommandSession {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandSession {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }
}

impl HostSession for CommandSession {
    #[instrument(skip(self, text), fields(service = "lisa"))]
    fn send_text(&self, session_id: &str, text: &str) -> Result<()> {
        let Some((program, args)) = self.argv.split_first() else {
            bail!("host send command is empty");
        };
        let mut cmd = Command::new(program);
        cmd.args(args.iter().map(|arg| arg.replace(SESSION_PLACEHOLDER, session_id)));

        let output =
            run_command_with_timeout(cmd, Some(text.as_bytes()), self.timeout, OUTPUT_LIMIT_BYTES)
                .with_context(|| format!("run host send command {program}"))?;
        if output.timed_out {
            bail!("host send command timed out after {}s", self.timeout.as_secs());
        }
        if !output.status.success() {
            bail!(
                "host send command exited with {}: {}",
                output.status,
                output.stderr_lossy()
            );
        }
        debug!("directive delivered");
        Ok(())
    }
}

#[derive(Serialize)]
struct HookDecision<'a> {
    decision: &'static str,
    reason: &'a str,
}

/// Prints a hook decision that keeps the agent working, with the directive
/// as the reason.
pub struct HookOutputSession<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> HookOutputSession<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> HostSession for HookOutputSession<W> {
    fn send_text(&self, _session_id: &str, text: &str) -> Result<()> {
        let decision = HookDecision {
            decision: "block",
            reason: text,
        };
        let mut out = self.out.borrow_mut();
        serde_json::to_writer(&mut *out, &decision).context("write hook decision")?;
        writeln!(out).context("write hook decision")?;
        out.flush().context("flush hook decision")?;
        Ok(())
    }
}

const HOOK_PAYLOAD_LIMIT_BYTES: u64 = 1024 * 1024;

/// Read a hook payload from `reader` until EOF, giving up after `timeout`.
///
/// Hosts that keep the pipe open without writing must not stall the idle
/// handler, so a late, unreadable or oversized payload yields `None` and the
/// reader thread is left behind.
pub fn read_hook_payload<R: Read + Send + 'static>(reader: R, timeout: Duration) -> Option<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut payload = String::new();
        let result = reader
            .take(HOOK_PAYLOAD_LIMIT_BYTES)
            .read_to_string(&mut payload)
            .map(|_| payload);
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(Ok(payload)) => Some(payload),
        Ok(Err(err)) => {
            warn!(err = %err, "cannot read hook payload");
            None
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "hook payload not received in time");
            None
        }
    }
}

/// Pull a session id out of a host event payload.
///
/// Hosts disagree on the key: `session_id`, `sessionID` and
/// `properties.sessionID` are all accepted.
pub fn parse_hook_session_id(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    [
        value.get("session_id"),
        value.get("sessionID"),
        value.get("properties").and_then(|p| p.get("sessionID")),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str())
    .filter(|id| !id.is_empty())
    .map(str::to_string)
}
