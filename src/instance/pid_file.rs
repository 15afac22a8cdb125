//! PID file advertising a running instance's control endpoint.
//!
//! A running workbench writes `.metadata/instance.pid` inside its workspace
//! so that later launches against the same workspace can find it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Workspace-relative directory holding instance metadata.
pub const METADATA_DIR: &str = ".metadata";

/// File name of the instance PID file.
pub const PID_FILE_NAME: &str = "instance.pid";

/// Information stored in the instance PID file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    /// Process ID of the running instance
    pub pid: u32,
    /// Port the control endpoint is listening on
    pub port: u16,
    /// Host/address the control endpoint is bound to
    pub host: String,
}

/// Manages the instance PID file for a workspace.
///
/// The file contains the process ID, port, and host in a simple format:
/// ```text
/// PID=12345
/// PORT=38211
/// HOST=127.0.0.1
/// ```
#[derive(Debug)]
pub struct InstancePidFile {
    path: PathBuf,
}

impl InstancePidFile {
    /// Create an InstancePidFile for the given workspace directory.
    pub fn new(workspace: &Path) -> Self {
        Self {
            path: workspace.join(METADATA_DIR).join(PID_FILE_NAME),
        }
    }

    /// Get the path to the PID file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the PID file, creating the metadata directory if needed.
    pub fn write(&self, info: &InstanceInfo) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = format!("PID={}\nPORT={}\nHOST={}\n", info.pid, info.port, info.host);

        let mut file = fs::File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Read the PID file and parse its contents.
    ///
    /// # Returns
    /// * `Ok(Some(info))` if the file exists and was parsed successfully
    /// * `Ok(None)` if the file doesn't exist
    /// * `Err(e)` if there was an IO error or parse error
    pub fn read(&self) -> io::Result<Option<InstanceInfo>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Self::parse_contents(&contents).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn parse_contents(contents: &str) -> io::Result<InstanceInfo> {
        let mut pid: Option<u32> = None;
        let mut port: Option<u16> = None;
        let mut host: Option<String> = None;

        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "PID" => pid = Some(parse_field(value, "PID")?),
                "PORT" => port = Some(parse_field(value, "PORT")?),
                "HOST" => host = Some(value.to_string()),
                _ => {} // Ignore unknown keys for forward compatibility
            }
        }

        Ok(InstanceInfo {
            pid: pid.ok_or_else(|| invalid_data("Missing PID field"))?,
            port: port.ok_or_else(|| invalid_data("Missing PORT field"))?,
            host: host.ok_or_else(|| invalid_data("Missing HOST field"))?,
        })
    }
}

fn parse_field<T: std::str::FromStr>(value: &str, key: &str) -> io::Result<T> {
    value
        .parse()
        .map_err(|_| invalid_data(&format!("Invalid {} value", key)))
}

fn invalid_data(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

/// Check whether a process with the given PID exists.
#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    // Signal 0 performs the permission and existence checks only
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Check whether a process with the given PID exists.
///
/// Without a cheap liveness check the endpoint handshake decides.
#[cfg(not(unix))]
pub fn process_exists(_pid: u32) -> bool {
    true
}
