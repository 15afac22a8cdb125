//! Client side of the remote control channel.

use super::protocol::{CONTROL_PATH, ControlRequest, ControlResponse};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Default bound on establishing a connection to a running instance.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default bound on a whole remote call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(10_000);

/// User-Agent sent with control requests
const USER_AGENT: &str = concat!("lodestar/", env!("CARGO_PKG_VERSION"));

/// Errors from a single remote call.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    /// Transport failure (refused, timed out, reset)
    #[error("Remote call '{method}' failed: {detail}")]
    Transport {
        method: &'static str,
        detail: String,
        refused: bool,
    },

    /// Instance answered with a non-success HTTP status
    #[error("Remote call '{method}' returned HTTP {status}: {detail}")]
    Status {
        method: &'static str,
        status: u16,
        detail: String,
    },

    /// Instance understood the call but reported a failure
    #[error("Remote call '{method}' was rejected: {detail}")]
    Rejected { method: &'static str, detail: String },

    /// Response body could not be interpreted
    #[error("Remote call '{method}' returned a malformed response: {detail}")]
    Protocol { method: &'static str, detail: String },
}

impl RemoteCallError {
    /// True if nothing was listening at the endpoint.
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, RemoteCallError::Transport { refused: true, .. })
    }
}

/// Operations a running instance exposes through its control endpoint.
pub trait InstanceController {
    fn quit(&self) -> Result<(), RemoteCallError>;
    fn thread_dump(&self) -> Result<String, RemoteCallError>;
    fn open_external_files(&self, files: &[String]) -> Result<(), RemoteCallError>;
    fn open_database_connection(&self, spec: &str) -> Result<(), RemoteCallError>;
    fn close_all_editors(&self) -> Result<(), RemoteCallError>;
    fn execute_workbench_command(&self, command_id: &str) -> Result<(), RemoteCallError>;
    fn bring_to_front(&self) -> Result<(), RemoteCallError>;
}

/// Timeouts applied to the control client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub connect: Duration,
    pub call: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            call: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// HTTP/JSON control client bound to one instance endpoint.
#[derive(Debug, Clone)]
pub struct HttpInstanceClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpInstanceClient {
    /// Create a client for `host:port`. No connection is made until the first call.
    pub fn new(host: &str, port: u16, timeouts: ClientTimeouts) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeouts.connect)
            .timeout(timeouts.call)
            .user_agent(USER_AGENT)
            .build();

        // Bare IPv6 literals need brackets in a URL
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };

        Self {
            agent,
            endpoint: format!("http://{}:{}{}", host, port, CONTROL_PATH),
        }
    }

    /// URL the client posts requests to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Handshake confirming the endpoint is a live instance.
    pub fn ping(&self) -> Result<(), RemoteCallError> {
        self.call(&ControlRequest::Ping).map(|_| ())
    }

    /// Send one request and return its `result` payload.
    pub fn call(&self, request: &ControlRequest) -> Result<serde_json::Value, RemoteCallError> {
        let method = request.method();
        tracing::debug!("Remote call '{}' to {}", method, self.endpoint);

        match self.agent.post(&self.endpoint).send_json(request) {
            Ok(resp) => {
                let body: ControlResponse = resp.into_json().map_err(|e| {
                    RemoteCallError::Protocol {
                        method,
                        detail: e.to_string(),
                    }
                })?;
                if body.ok {
                    Ok(body.result)
                } else {
                    Err(RemoteCallError::Rejected {
                        method,
                        detail: body.error.unwrap_or_else(|| "unknown error".to_string()),
                    })
                }
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let detail = serde_json::from_str::<ControlResponse>(&body)
                    .ok()
                    .and_then(|r| r.error)
                    .unwrap_or(body);
                Err(RemoteCallError::Status {
                    method,
                    status,
                    detail,
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(RemoteCallError::Transport {
                method,
                refused: refused_by_peer(&transport),
                detail: transport.to_string(),
            }),
        }
    }

    fn call_unit(&self, request: ControlRequest) -> Result<(), RemoteCallError> {
        self.call(&request).map(|_| ())
    }
}

/// True if any error in the chain is an I/O "connection refused".
///
/// Connect timeouts and DNS failures are not refusals.
fn refused_by_peer(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::ConnectionRefused)
        {
            return true;
        }
        current = e.source();
    }
    false
}

impl InstanceController for HttpInstanceClient {
    fn quit(&self) -> Result<(), RemoteCallError> {
        self.call_unit(ControlRequest::Quit)
    }

    fn thread_dump(&self) -> Result<String, RemoteCallError> {
        let request = ControlRequest::ThreadDump;
        match self.call(&request)? {
            serde_json::Value::String(dump) => Ok(dump),
            other => Err(RemoteCallError::Protocol {
                method: request.method(),
                detail: format!("expected a string, got {}", other),
            }),
        }
    }

    fn open_external_files(&self, files: &[String]) -> Result<(), RemoteCallError> {
        self.call_unit(ControlRequest::OpenExternalFiles {
            files: files.to_vec(),
        })
    }

    fn open_database_connection(&self, spec: &str) -> Result<(), RemoteCallError> {
        self.call_unit(ControlRequest::OpenDatabaseConnection {
            spec: spec.to_string(),
        })
    }

    fn close_all_editors(&self) -> Result<(), RemoteCallError> {
        self.call_unit(ControlRequest::CloseAllEditors)
    }

    fn execute_workbench_command(&self, command_id: &str) -> Result<(), RemoteCallError> {
        self.call_unit(ControlRequest::ExecuteWorkbenchCommand {
            command_id: command_id.to_string(),
        })
    }

    fn bring_to_front(&self) -> Result<(), RemoteCallError> {
        self.call_unit(ControlRequest::BringToFront)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_endpoint_formatting() {
        let client = HttpInstanceClient::new("127.0.0.1", 4000, ClientTimeouts::default());
        assert_eq!(client.endpoint(), "http://127.0.0.1:4000/control");

        let client = HttpInstanceClient::new("::1", 4000, ClientTimeouts::default());
        assert_eq!(client.endpoint(), "http://[::1]:4000/control");
    }

    #[test]
    fn test_refused_connection_is_flagged() {
        // Bind then drop to get a port with nothing listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = HttpInstanceClient::new(
            "127.0.0.1",
            port,
            ClientTimeouts {
                connect: Duration::from_millis(500),
                call: Duration::from_millis(500),
            },
        );

        let err = client.ping().unwrap_err();
        assert!(err.is_connection_refused(), "unexpected error: {}", err);
    }

    #[derive(Debug, Error)]
    #[error("connect failed")]
    struct Wrapped(#[source] io::Error);

    #[test]
    fn test_refusal_found_through_error_chain() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(refused_by_peer(&refused));
        assert!(refused_by_peer(&Wrapped(refused)));
    }

    #[test]
    fn test_connect_timeout_is_not_refusal() {
        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert!(!refused_by_peer(&timed_out));
        assert!(!refused_by_peer(&Wrapped(timed_out)));
    }

    #[test]
    fn test_silent_endpoint_times_out() {
        // Accepts the connection but never answers
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = HttpInstanceClient::new(
            "127.0.0.1",
            port,
            ClientTimeouts {
                connect: Duration::from_millis(200),
                call: Duration::from_millis(300),
            },
        );

        let started = std::time::Instant::now();
        let err = client.quit().unwrap_err();
        assert!(!err.is_connection_refused());
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }
}
