//! Control protocol messages exchanged with a running instance.
//!
//! Every request is a single JSON object posted to `/control`, tagged by a
//! `method` field:
//!
//! ```json
//! {"method": "ping"}
//! {"method": "open_external_files", "files": ["a.sql", "b.sql"]}
//! {"method": "execute_workbench_command", "command_id": "workbench.connection.disconnectAll"}
//! ```
//!
//! The instance answers with a [`ControlResponse`]:
//!
//! ```json
//! {"ok": true, "result": "...thread dump..."}
//! {"ok": false, "error": "no such connection"}
//! ```

use serde::{Deserialize, Serialize};

/// Path of the control endpoint.
pub const CONTROL_PATH: &str = "/control";

/// Requests understood by a running instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Handshake used when locating an instance.
    Ping,
    Quit,
    ThreadDump,
    OpenExternalFiles { files: Vec<String> },
    OpenDatabaseConnection { spec: String },
    CloseAllEditors,
    ExecuteWorkbenchCommand { command_id: String },
    BringToFront,
}

impl ControlRequest {
    /// Wire name of the request, used in logs and errors.
    pub fn method(&self) -> &'static str {
        match self {
            ControlRequest::Ping => "ping",
            ControlRequest::Quit => "quit",
            ControlRequest::ThreadDump => "thread_dump",
            ControlRequest::OpenExternalFiles { .. } => "open_external_files",
            ControlRequest::OpenDatabaseConnection { .. } => "open_database_connection",
            ControlRequest::CloseAllEditors => "close_all_editors",
            ControlRequest::ExecuteWorkbenchCommand { .. } => "execute_workbench_command",
            ControlRequest::BringToFront => "bring_to_front",
        }
    }
}

/// Response to a [`ControlRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            ok: true,
            result,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}
