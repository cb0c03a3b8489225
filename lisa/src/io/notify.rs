//! Best-effort desktop notifications.

use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::io::process::run_command_with_timeout;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Fire-and-forget notification sink. Implementations must not fail the
/// caller.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str);
}

/// Tries `osascript`, then `notify-send`, then gives up quietly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape_applescript(message),
            escape_applescript(title)
        );
        let mut osascript = Command::new("osascript");
        osascript.args(["-e", script.as_str()]);
        if try_command(osascript) {
            return;
        }
        let mut notify_send = Command::new("notify-send");
        notify_send.args([title, message]);
        if !try_command(notify_send) {
            debug!(title, "no notification mechanism available");
        }
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}

fn try_command(cmd: Command) -> bool {
    run_command_with_timeout(cmd, None, NOTIFY_TIMEOUT, 4096).is_ok_and(|output| output.success())
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
