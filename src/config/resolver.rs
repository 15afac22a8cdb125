//! Precedence resolution for launcher settings.
//!
//! ## Workspace (highest to lowest)
//!
//! 1. `-data <dir>` on the command line
//! 2. `LODESTAR_DATA_DIR` environment variable
//! 3. `<data dir>/lodestar/workspace` (e.g. `~/.local/share/lodestar/workspace`)
//!
//! ## Plugin directory
//!
//! 1. `LODESTAR_PLUGIN_DIR` environment variable
//! 2. `<config dir>/lodestar/plugins` (e.g. `~/.config/lodestar/plugins`)
//!
//! ## Remote call timeouts
//!
//! `LODESTAR_CONNECT_TIMEOUT_MS` and `LODESTAR_CALL_TIMEOUT_MS`, falling back
//! to the client defaults. Unparseable values are ignored with a warning.

use crate::instance::{ClientTimeouts, DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "LODESTAR_DATA_DIR";
pub const PLUGIN_DIR_ENV: &str = "LODESTAR_PLUGIN_DIR";
pub const CONNECT_TIMEOUT_ENV: &str = "LODESTAR_CONNECT_TIMEOUT_MS";
pub const CALL_TIMEOUT_ENV: &str = "LODESTAR_CALL_TIMEOUT_MS";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved launcher settings.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Workspace directory; doubles as the instance location
    pub workspace: Resolved<PathBuf>,
    /// Directory scanned for plugin manifests
    pub plugin_dir: Resolved<PathBuf>,
    pub connect_timeout: Resolved<Duration>,
    pub call_timeout: Resolved<Duration>,
}

impl LaunchSettings {
    /// Timeouts for the remote control client.
    pub fn timeouts(&self) -> ClientTimeouts {
        ClientTimeouts {
            connect: self.connect_timeout.value,
            call: self.call_timeout.value,
        }
    }
}

/// Resolve launcher settings from the `-data` flag and the process environment.
pub fn resolve_launch_settings(data_flag: Option<&str>) -> LaunchSettings {
    resolve_launch_settings_with(data_flag, |name| std::env::var(name).ok())
}

/// Resolve launcher settings with an explicit environment lookup.
pub fn resolve_launch_settings_with<E>(data_flag: Option<&str>, env: E) -> LaunchSettings
where
    E: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let workspace = match (data_flag, non_empty(DATA_DIR_ENV)) {
        (Some(dir), _) => Resolved::new(PathBuf::from(dir), ValueSource::CliFlag),
        (None, Some(dir)) => Resolved::new(
            PathBuf::from(dir),
            ValueSource::EnvVar(DATA_DIR_ENV.to_string()),
        ),
        (None, None) => Resolved::new(
            default_dir(dirs::data_dir(), "workspace"),
            ValueSource::Default,
        ),
    };

    let plugin_dir = match non_empty(PLUGIN_DIR_ENV) {
        Some(dir) => Resolved::new(
            PathBuf::from(dir),
            ValueSource::EnvVar(PLUGIN_DIR_ENV.to_string()),
        ),
        None => Resolved::new(
            default_dir(dirs::config_dir(), "plugins"),
            ValueSource::Default,
        ),
    };

    LaunchSettings {
        workspace,
        plugin_dir,
        connect_timeout: resolve_millis(
            non_empty(CONNECT_TIMEOUT_ENV),
            CONNECT_TIMEOUT_ENV,
            DEFAULT_CONNECT_TIMEOUT,
        ),
        call_timeout: resolve_millis(
            non_empty(CALL_TIMEOUT_ENV),
            CALL_TIMEOUT_ENV,
            DEFAULT_CALL_TIMEOUT,
        ),
    }
}

/// `<base>/lodestar/<leaf>`, or `./.lodestar/<leaf>` when no base directory is known.
fn default_dir(base: Option<PathBuf>, leaf: &str) -> PathBuf {
    match base {
        Some(base) => base.join("lodestar").join(leaf),
        None => PathBuf::from(".lodestar").join(leaf),
    }
}

fn resolve_millis(raw: Option<String>, name: &str, default: Duration) -> Resolved<Duration> {
    let Some(raw) = raw else {
        return Resolved::new(default, ValueSource::Default);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Resolved::new(
            Duration::from_millis(ms),
            ValueSource::EnvVar(name.to_string()),
        ),
        _ => {
            tracing::warn!("Ignoring invalid {}={:?}, using {:?}", name, raw, default);
            Resolved::new(default, ValueSource::Default)
        }
    }
}
