//! Locating an already-running instance and talking to it.
//!
//! A running workbench advertises its control endpoint through a PID file in
//! its workspace ([`pid_file`]). The [`PidFileLocator`] turns a workspace
//! path into an [`InstanceLookup`]: a connected controller, an explicit
//! "not running", or a connection error. None of these are fatal to the
//! caller.

pub mod client;
pub mod pid_file;
pub mod protocol;

pub use client::{
    ClientTimeouts, DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, HttpInstanceClient,
    InstanceController, RemoteCallError,
};
pub use pid_file::{InstanceInfo, InstancePidFile, process_exists};
pub use protocol::{ControlRequest, ControlResponse};

use std::fmt;
use std::path::Path;

/// Result of looking for a running instance.
pub enum InstanceLookup {
    /// A live instance answered the handshake
    Connected(Box<dyn InstanceController>),
    /// No instance is running for this location
    NotRunning,
    /// An instance may exist but could not be reached
    ConnectError(String),
}

impl fmt::Debug for InstanceLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceLookup::Connected(_) => write!(f, "Connected(..)"),
            InstanceLookup::NotRunning => write!(f, "NotRunning"),
            InstanceLookup::ConnectError(detail) => f.debug_tuple("ConnectError").field(detail).finish(),
        }
    }
}

/// Finds the running instance for a workspace location.
pub trait InstanceLocator {
    fn locate(&self, location: &Path) -> InstanceLookup;
}

/// Locator reading the workspace PID file and handshaking over HTTP.
#[derive(Debug, Clone, Default)]
pub struct PidFileLocator {
    timeouts: ClientTimeouts,
}

impl PidFileLocator {
    pub fn new(timeouts: ClientTimeouts) -> Self {
        Self { timeouts }
    }
}

impl InstanceLocator for PidFileLocator {
    fn locate(&self, location: &Path) -> InstanceLookup {
        let pid_file = InstancePidFile::new(location);
        let info = match pid_file.read() {
            Ok(Some(info)) => info,
            Ok(None) => return InstanceLookup::NotRunning,
            Err(e) => {
                return InstanceLookup::ConnectError(format!(
                    "Can't read {}: {}",
                    pid_file.path().display(),
                    e
                ));
            }
        };

        if !process_exists(info.pid) {
            tracing::debug!(
                "Ignoring stale instance file {} (pid {} is gone)",
                pid_file.path().display(),
                info.pid
            );
            return InstanceLookup::NotRunning;
        }

        let client = HttpInstanceClient::new(&info.host, info.port, self.timeouts);
        match client.ping() {
            Ok(()) => InstanceLookup::Connected(Box::new(client)),
            Err(e) if e.is_connection_refused() => {
                tracing::debug!("Instance endpoint {} refused connection", client.endpoint());
                InstanceLookup::NotRunning
            }
            Err(e) => InstanceLookup::ConnectError(e.to_string()),
        }
    }
}
