//! Common test utilities for lodestar integration tests.
//!
//! Provides `TestEnv` for isolated launches that don't touch the user's
//! workspace or plugin directory, and `FakeInstance`, a minimal control
//! endpoint standing in for a running workbench.

#![allow(dead_code)]

use assert_cmd::Command;
use lodestar::instance::{ControlRequest, ControlResponse, InstanceInfo, InstancePidFile};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
pub use tempfile::TempDir;

/// Thread dump text returned by [`FakeInstance`].
pub const FAKE_DUMP: &str = "\"main\" #1 prio=5 RUNNABLE";

/// A launch environment with isolated workspace and plugin directories.
///
/// The `lodestar()` method returns a `Command` with `LODESTAR_DATA_DIR` and
/// `LODESTAR_PLUGIN_DIR` set per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub workspace: TempDir,
    pub plugins: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            workspace: TempDir::new().unwrap(),
            plugins: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the lodestar binary bound to this environment.
    pub fn lodestar(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_lodestar"));
        cmd.env("LODESTAR_DATA_DIR", self.workspace.path());
        cmd.env("LODESTAR_PLUGIN_DIR", self.plugins.path());
        cmd.env("LODESTAR_CONNECT_TIMEOUT_MS", "1000");
        cmd.env("LODESTAR_CALL_TIMEOUT_MS", "2000");
        cmd.env_remove("LODESTAR_LOG");
        cmd
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Advertise `instance` as the running workbench for this workspace.
    ///
    /// The PID file names the test process itself so that the liveness
    /// check passes.
    pub fn advertise(&self, instance: &FakeInstance) {
        self.advertise_port(instance.port());
    }

    /// Write a PID file pointing at an arbitrary port.
    pub fn advertise_port(&self, port: u16) {
        InstancePidFile::new(self.workspace.path())
            .write(&InstanceInfo {
                pid: std::process::id(),
                port,
                host: "127.0.0.1".to_string(),
            })
            .unwrap();
    }

    /// Write a plugin manifest into the plugin directory.
    pub fn write_manifest(&self, name: &str, kdl: &str) {
        std::fs::write(self.plugins.path().join(format!("{}.kdl", name)), kdl).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process control endpoint recording every request it receives.
pub struct FakeInstance {
    port: u16,
    requests: Arc<Mutex<Vec<ControlRequest>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl FakeInstance {
    /// Bind an ephemeral port and start serving in a background thread.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(Mutex::new(HashSet::new()));

        let (log, fail) = (Arc::clone(&requests), Arc::clone(&failing));
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve(stream, &log, &fail);
            }
        });

        Self {
            port,
            requests,
            failing,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Make every request with this method name report failure.
    pub fn fail(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_string());
    }

    /// Requests received so far, without handshakes.
    pub fn requests(&self) -> Vec<ControlRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| **r != ControlRequest::Ping)
            .cloned()
            .collect()
    }

    /// Number of handshakes received.
    pub fn pings(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| **r == ControlRequest::Ping)
            .count()
    }
}

fn serve(
    stream: TcpStream,
    log: &Mutex<Vec<ControlRequest>>,
    failing: &Mutex<HashSet<String>>,
) {
    let Ok(reader_stream) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(reader_stream);

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let response = match serde_json::from_slice::<ControlRequest>(&body) {
        Ok(request) => {
            let method = request.method();
            let response = if failing.lock().unwrap().contains(method) {
                ControlResponse::failure(format!("{} failed", method))
            } else if request == ControlRequest::ThreadDump {
                ControlResponse::success(serde_json::Value::String(FAKE_DUMP.to_string()))
            } else {
                ControlResponse::success(serde_json::Value::Null)
            };
            log.lock().unwrap().push(request);
            response
        }
        Err(e) => ControlResponse::failure(e.to_string()),
    };

    let payload = serde_json::to_string(&response).unwrap();
    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let _ = stream.flush();
}

/// Parse the JSON launch report printed on a local start.
pub fn launch_report(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .last()
        .unwrap_or_else(|| panic!("no launch report in output: {:?}", text));
    serde_json::from_str(line).unwrap()
}
