//! Layered configuration.
//!
//! Three TOML files are merged table by table, later layers winning:
//! `~/.config/lisa/config.toml`, then `.lisa/config.toml`, then the gitignored
//! `.lisa/config.local.toml`. Configuration never fails a command: a file that
//! does not parse is skipped and a bad value is replaced by its default, each
//! with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};
use tracing::{debug, warn};

use crate::io::layout::ProjectPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LisaConfig {
    pub execution: ExecutionConfig,
    pub git: GitConfig,
    pub yolo: YoloConfig,
    pub host: HostConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Retries for a failed task before the agent gives up on it.
    pub max_retries: u32,
    /// Tasks the agent may run at once; 1 is sequential.
    pub max_parallel_tasks: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_parallel_tasks: 1,
        }
    }
}

/// How an epic is wrapped up once every task is done.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    Pr,
    Commit,
    #[default]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    pub completion_mode: CompletionMode,
    pub branch_prefix: String,
    pub auto_push: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            completion_mode: CompletionMode::None,
            branch_prefix: "epic/".to_string(),
            auto_push: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct YoloConfig {
    /// Iteration cap for `yolo start` without an explicit limit; 0 is unlimited.
    pub default_max_iterations: u32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            default_max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostConfig {
    /// Command that delivers a directive to a session (directive on stdin,
    /// `{session}` substituted). Empty means print a hook decision instead.
    pub send_command: Vec<String>,
    pub send_timeout_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            send_command: Vec::new(),
            send_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl LisaConfig {
    /// Replace out-of-range values with defaults, returning one warning per fix.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.execution.max_parallel_tasks == 0 {
            let default = ExecutionConfig::default().max_parallel_tasks;
            warnings.push(format!(
                "invalid execution.max_parallel_tasks: 0; using default {default}"
            ));
            self.execution.max_parallel_tasks = default;
        }
        if self.git.branch_prefix.trim().is_empty() {
            let default = GitConfig::default().branch_prefix;
            warnings.push(format!(
                "invalid git.branch_prefix: must not be empty; using default \"{default}\""
            ));
            self.git.branch_prefix = default;
        }
        if self.host.send_timeout_secs == 0 {
            let default = HostConfig::default().send_timeout_secs;
            warnings.push(format!(
                "invalid host.send_timeout_secs: 0; using default {default}"
            ));
            self.host.send_timeout_secs = default;
        }
        if self
            .host
            .send_command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            warnings.push("invalid host.send_command: empty program; using hook output".to_string());
            self.host.send_command.clear();
        }
        warnings
    }
}

/// Which layers contributed to a loaded config.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSources {
    pub global: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub local: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedConfig {
    pub config: LisaConfig,
    pub sources: ConfigSources,
    pub warnings: Vec<String>,
}

/// `~/.config/lisa/config.toml`, when a home directory is known.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("lisa").join("config.toml"))
}

/// Load and merge all layers for the project at `paths.root`.
pub fn load_config(paths: &ProjectPaths) -> LoadedConfig {
    load_config_layers(
        global_config_path().as_deref(),
        &paths.config_path,
        &paths.local_config_path,
    )
}

pub fn load_config_layers(global: Option<&Path>, project: &Path, local: &Path) -> LoadedConfig {
    let mut warnings = Vec::new();
    let mut sources = ConfigSources::default();
    let mut merged = Table::new();

    let layers = [
        (global, &mut sources.global),
        (Some(project), &mut sources.project),
        (Some(local), &mut sources.local),
    ];
    for (path, source) in layers {
        let Some(path) = path else { continue };
        if let Some(table) = read_layer(path, &mut warnings) {
            deep_merge(&mut merged, table);
            *source = Some(path.to_path_buf());
        }
    }

    let mut config = LisaConfig {
        execution: lenient_section(&merged, "execution", &mut warnings),
        git: lenient_section(&merged, "git", &mut warnings),
        yolo: lenient_section(&merged, "yolo", &mut warnings),
        host: lenient_section(&merged, "host", &mut warnings),
        notifications: lenient_section(&merged, "notifications", &mut warnings),
    };
    warnings.extend(config.sanitize());

    for warning in &warnings {
        warn!(warning = %warning, "config");
    }
    LoadedConfig {
        config,
        sources,
        warnings,
    }
}

fn read_layer(path: &Path, warnings: &mut Vec<String>) -> Option<Table> {
    if !path.exists() {
        return None;
    }
    debug!(path = %path.display(), "reading config layer");
    let parsed = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))
        .and_then(|contents| {
            toml::from_str::<Table>(&contents).with_context(|| format!("parse {}", path.display()))
        });
    match parsed {
        Ok(table) => Some(table),
        Err(err) => {
            warnings.push(format!("ignoring config file: {err:#}"));
            None
        }
    }
}

/// Merge `overlay` into `base`; nested tables merge, everything else replaces.
fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        let Value::Table(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(Value::Table(existing)) = base.get_mut(&key) {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(key, Value::Table(incoming));
    }
}

/// Deserialize one section, dropping only the keys that fail to deserialize.
fn lenient_section<T>(merged: &Table, name: &str, warnings: &mut Vec<String>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(value) = merged.get(name) else {
        return T::default();
    };
    let Value::Table(section) = value else {
        warnings.push(format!("invalid {name}: expected a table; using defaults"));
        return T::default();
    };
    if let Ok(parsed) = Value::Table(section.clone()).try_into::<T>() {
        return parsed;
    }

    let mut kept = Table::new();
    for (key, field) in section {
        let mut single = Table::new();
        single.insert(key.clone(), field.clone());
        match Value::Table(single).try_into::<T>() {
            Ok(_) => {
                kept.insert(key.clone(), field.clone());
            }
            Err(err) => warnings.push(format!(
                "invalid {name}.{key}: {}; using default",
                err.to_string().trim()
            )),
        }
    }
    Value::Table(kept).try_into::<T>().unwrap_or_default()
}

/// Options for `init_config`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing `.lisa/config.toml`.
    pub force: bool,
}

/// What `init_config` wrote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub config_path: PathBuf,
    pub config_written: bool,
    pub gitignore_written: bool,
}

/// Create `.lisa/` with a commented default `config.toml` and a `.gitignore`
/// for the local override. Existing files are left alone unless forced.
pub fn init_config(paths: &ProjectPaths, options: &InitOptions) -> Result<InitReport> {
    fs::create_dir_all(&paths.lisa_dir)
        .with_context(|| format!("create directory {}", paths.lisa_dir.display()))?;

    let config_written = options.force || !paths.config_path.exists();
    if config_written {
        write_file(&paths.config_path, DEFAULT_CONFIG_TOML)?;
    }
    let gitignore_written = !paths.gitignore_path.exists();
    if gitignore_written {
        write_file(&paths.gitignore_path, LISA_GITIGNORE)?;
    }
    debug!(config_written, gitignore_written, "initialized config");
    Ok(InitReport {
        config_path: paths.config_path.clone(),
        config_written,
        gitignore_written,
    })
}

/// Overwrite the project config with defaults.
pub fn reset_config(paths: &ProjectPaths) -> Result<InitReport> {
    init_config(paths, &InitOptions { force: true })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents).with_context(|| format!("write file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace file {}", path.display()))
}

pub const DEFAULT_CONFIG_TOML: &str = r#"# Lisa configuration
#
# Merge order: ~/.config/lisa/config.toml -> .lisa/config.toml -> .lisa/config.local.toml
# Put personal overrides in .lisa/config.local.toml (gitignored).

[execution]
# Retries for a failed task before stopping.
max_retries = 3
# Tasks run at once. 1 is sequential and cheapest; 3-5 is faster.
max_parallel_tasks = 1

[git]
# What happens when every task is done:
#   "pr"     - branch, commit, push and open a PR (needs the `gh` CLI)
#   "commit" - commits only; push and PR are up to you
#   "none"   - no git operations
completion_mode = "none"
# Branch name prefix, e.g. "epic/my-feature".
branch_prefix = "epic/"
# With "pr": push and open the PR automatically.
auto_push = true

[yolo]
# Iteration cap for yolo mode (0 = unlimited).
default_max_iterations = 100

[host]
# Command that sends a continuation to the agent session. The text arrives on
# stdin and "{session}" is replaced by the session id. Leave empty to print a
# hook decision on stdout instead.
send_command = []
send_timeout_secs = 30

[notifications]
enabled = true
"#;

const LISA_GITIGNORE: &str = "# Local config overrides (not committed)\nconfig.local.toml\n";
