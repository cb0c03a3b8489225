//! `lisa` command line: the tool-call surface as JSON-emitting subcommands,
//! the idle hook that drives yolo mode, and config management.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{debug, info};

use lisa::available::get_available_tasks;
use lisa::context::build_task_context;
use lisa::epics::{get_epic_status, list_epics};
use lisa::error::LisaError;
use lisa::exit_codes;
use lisa::io::config::{
    InitOptions, LoadedConfig, global_config_path, init_config, load_config, reset_config,
};
use lisa::io::layout::ProjectPaths;
use lisa::io::notify::{DesktopNotifier, Notifier, SilentNotifier};
use lisa::io::session::{
    CommandSession, HookOutputSession, HostSession, parse_hook_session_id, read_hook_payload,
};
use lisa::logging;
use lisa::tools;
use lisa::yolo::{on_session_idle, start_yolo, stop_yolo};

#[derive(Parser)]
#[command(name = "lisa", version, about = "Epic workflow state manager")]
struct Cli {
    /// Project root containing `.lisa/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every epic with its phase and progress.
    Epics,
    /// Detailed status of one epic.
    Status { epic: String },
    /// Tasks whose dependencies are all done, and the ones still waiting.
    Available { epic: String },
    /// Build the execution prompt for one task.
    Context { epic: String, task_id: String },
    /// Handle an agent idle signal (continues an active yolo epic).
    Idle {
        /// Session to continue. Read from a JSON hook payload on stdin when omitted.
        #[arg(long)]
        session: Option<String>,
    },
    /// Start or stop autonomous mode.
    Yolo {
        #[command(subcommand)]
        action: YoloAction,
    },
    /// View or manage configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum YoloAction {
    Start {
        epic: String,
        /// Iteration cap (0 = unlimited). Defaults to `yolo.default_max_iterations`.
        #[arg(long)]
        max_iterations: Option<u32>,
    },
    Stop {
        epic: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the merged config and where it came from.
    View,
    /// Create `.lisa/config.toml` and `.lisa/.gitignore` if missing.
    Init,
    /// Overwrite `.lisa/config.toml` with defaults.
    Reset,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = cli.root.as_path();
    debug!(root = %root.display(), "lisa invoked");
    match cli.command {
        Command::Epics => emit(&tools::success(&list_epics(root))?),
        Command::Status { epic } => match get_epic_status(root, &epic) {
            Ok(status) => emit(&serde_json::to_value(status)?),
            Err(err) => emit_error(&err, tools::not_found(&err)),
        },
        Command::Available { epic } => respond(get_available_tasks(root, &epic)),
        Command::Context { epic, task_id } => respond(build_task_context(root, &epic, &task_id)),
        Command::Idle { session } => cmd_idle(root, session),
        Command::Yolo { action } => match action {
            YoloAction::Start {
                epic,
                max_iterations,
            } => {
                let max_iterations = match max_iterations {
                    Some(max) => max,
                    None => load_config(&ProjectPaths::new(root)).config.yolo.default_max_iterations,
                };
                respond(start_yolo(root, &epic, max_iterations))
            }
            YoloAction::Stop { epic } => respond(stop_yolo(root, &epic).map(|state| {
                json!({ "epic": epic, "wasActive": state.is_some(), "state": state })
            })),
        },
        Command::Config { action } => cmd_config(root, action),
    }
}

fn cmd_idle(root: &Path, session: Option<String>) -> Result<i32> {
    let LoadedConfig { config, .. } = load_config(&ProjectPaths::new(root));
    let session_id = match session {
        Some(id) => Some(id),
        None => read_hook_session_id(Duration::from_secs(config.host.send_timeout_secs)),
    };

    let host: Box<dyn HostSession> = if config.host.send_command.is_empty() {
        Box::new(HookOutputSession::new(std::io::stdout()))
    } else {
        Box::new(CommandSession::new(
            config.host.send_command.clone(),
            Duration::from_secs(config.host.send_timeout_secs),
        ))
    };
    let notifier: Box<dyn Notifier> = if config.notifications.enabled {
        Box::new(DesktopNotifier)
    } else {
        Box::new(SilentNotifier)
    };

    let outcome = on_session_idle(root, session_id.as_deref(), host.as_ref(), notifier.as_ref())?;
    info!(
        service = "lisa",
        outcome = %serde_json::to_string(&outcome)?,
        "idle handled"
    );
    Ok(exit_codes::OK)
}

/// Session id from a hook payload on stdin; nothing is read from a terminal.
fn read_hook_session_id(timeout: Duration) -> Option<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    read_hook_payload(stdin, timeout).and_then(|payload| parse_hook_session_id(&payload))
}

fn cmd_config(root: &Path, action: ConfigAction) -> Result<i32> {
    let paths = ProjectPaths::new(root);
    match action {
        ConfigAction::View => {
            let loaded = load_config(&paths);
            emit(&json!({
                "config": loaded.config,
                "sources": loaded.sources,
                "warnings": loaded.warnings,
                "paths": {
                    "global": global_config_path(),
                    "project": paths.config_path,
                    "local": paths.local_config_path,
                },
            }))
        }
        ConfigAction::Init => emit(&tools::success(&init_config(
            &paths,
            &InitOptions { force: false },
        )?)?),
        ConfigAction::Reset => emit(&tools::success(&reset_config(&paths)?)?),
    }
}

fn respond<T: serde::Serialize>(result: Result<T, LisaError>) -> Result<i32> {
    match result {
        Ok(value) => emit(&tools::success(&value)?),
        Err(err) => emit_error(&err, tools::failure(&err)),
    }
}

fn emit_error(err: &LisaError, body: Value) -> Result<i32> {
    emit(&body)?;
    Ok(err.exit_code())
}

fn emit(value: &Value) -> Result<i32> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(exit_codes::OK)
}
