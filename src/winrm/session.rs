//! The remote shell session state machine.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::output::{self, UNKNOWN_EXIT_CODE};
use super::soap::{SoapBuilder, SoapRequest};
use super::transport::HttpConnector;
use super::xml::XmlElement;
use super::{ns, WinRmError, WinRmOperation, WinRmResult};

/// Outcome of one Receive round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    /// The command is still running; poll again.
    Pending,
    /// The command finished; the exit code is available.
    Done,
}

/// Lifecycle of a [`WinRmShellSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No shell has been created yet
    Unshelled,
    /// A shell exists and no command has been started
    ShellOpen,
    /// A command is running
    CommandRunning,
    /// The last command reported `Done`
    CommandDone,
    /// The shell has been deleted
    Deleted,
}

/// One remote shell and the command running in it.
///
/// A session is driven by its owner: create the shell, start a command,
/// call [`receive_output`](Self::receive_output) until it returns
/// [`ReceiveStatus::Done`], then delete the shell.
pub struct WinRmShellSession {
    connector: Arc<dyn HttpConnector>,
    builder: SoapBuilder,
    shell_id: Option<String>,
    command_id: Option<String>,
    chunk: u32,
    exit_code: i32,
    state: SessionState,
}

impl WinRmShellSession {
    /// Create a session that talks through `connector`.
    pub fn new(connector: Arc<dyn HttpConnector>, builder: SoapBuilder) -> Self {
        Self {
            connector,
            builder,
            shell_id: None,
            command_id: None,
            chunk: 0,
            exit_code: UNKNOWN_EXIT_CODE,
            state: SessionState::Unshelled,
        }
    }

    /// Server assigned shell id, once created.
    pub fn shell_id(&self) -> Option<&str> {
        self.shell_id.as_deref()
    }

    /// Server assigned command id, once started.
    pub fn command_id(&self) -> Option<&str> {
        self.command_id.as_deref()
    }

    /// Number of Receive responses that did not finish the command.
    pub fn chunk(&self) -> u32 {
        self.chunk
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last parsed exit code, or `-1`.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    async fn round_trip(&self, request: SoapRequest) -> WinRmResult<XmlElement> {
        let operation = request.operation;
        let response = self
            .connector
            .send(&request.document, request.soap_action())
            .await
            .map_err(|e| match e {
                WinRmError::Transport(message) => WinRmError::protocol(operation, message),
                other => other,
            })?;

        XmlElement::parse(&response).map_err(|e| {
            WinRmError::protocol(operation, format!("unparsable response: {}", e))
        })
    }

    fn require_shell(&self, operation: WinRmOperation) -> WinRmResult<String> {
        self.shell_id.clone().ok_or(WinRmError::Precondition {
            operation,
            requirement: "a shell",
        })
    }

    fn require_command(&self, operation: WinRmOperation) -> WinRmResult<(String, String)> {
        let shell_id = self.require_shell(operation)?;
        let command_id = self.command_id.clone().ok_or(WinRmError::Precondition {
            operation,
            requirement: "a running command",
        })?;
        Ok((shell_id, command_id))
    }

    /// Create the remote shell.
    pub async fn create_shell(&mut self) -> WinRmResult<&str> {
        let response = self.round_trip(self.builder.create_shell()).await?;

        let shell_id = response
            .find_all(ns::W, "Selector")
            .into_iter()
            .find(|selector| selector.attribute("Name") == Some("ShellId"))
            .or_else(|| response.find(ns::RSP, "ShellId"))
            .map(|element| element.text().trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                WinRmError::protocol(WinRmOperation::CreateShell, "response carries no shell id")
            })?;

        debug!(shell_id = %shell_id, "Created WinRM shell");
        self.state = SessionState::ShellOpen;
        Ok(self.shell_id.insert(shell_id).as_str())
    }

    /// Start `command` in the shell.
    ///
    /// `command` is a complete `cmd.exe` line. Output and exit code of a
    /// previous command are discarded.
    pub async fn execute_command(&mut self, command: &str) -> WinRmResult<&str> {
        let shell_id = self.require_shell(WinRmOperation::Command)?;
        let response = self
            .round_trip(self.builder.command(&shell_id, command))
            .await?;

        let command_id = response
            .find(ns::RSP, "CommandId")
            .map(|element| element.text().trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                WinRmError::protocol(WinRmOperation::Command, "response carries no command id")
            })?;

        debug!(shell_id = %shell_id, command_id = %command_id, "Started WinRM command");
        self.chunk = 0;
        self.exit_code = UNKNOWN_EXIT_CODE;
        self.state = SessionState::CommandRunning;
        Ok(self.command_id.insert(command_id).as_str())
    }

    /// Poll once for output, writing decoded stream fragments to the sinks.
    pub async fn receive_output<O, E>(&mut self, stdout: &mut O, stderr: &mut E) -> WinRmResult<ReceiveStatus>
    where
        O: Write + Send + ?Sized,
        E: Write + Send + ?Sized,
    {
        let (shell_id, command_id) = self.require_command(WinRmOperation::Receive)?;
        let response = self
            .round_trip(self.builder.receive(&shell_id, &command_id))
            .await?;

        output::write_streams(&response, stdout, stderr)?;

        if self.chunk == 0 {
            if let Some(code) = output::exit_code(&response) {
                self.exit_code = code;
            }
        }

        if output::is_done(&response) {
            self.exit_code = output::exit_code(&response).unwrap_or(UNKNOWN_EXIT_CODE);
            self.state = SessionState::CommandDone;
            debug!(command_id = %command_id, exit_code = self.exit_code, "WinRM command finished");
            Ok(ReceiveStatus::Done)
        } else {
            self.chunk += 1;
            trace!(command_id = %command_id, chunk = self.chunk, "WinRM command still running");
            Ok(ReceiveStatus::Pending)
        }
    }

    /// Send `data` to the running command's stdin, closing the stream when `end` is set.
    pub async fn send_input(&mut self, data: &[u8], end: bool) -> WinRmResult<()> {
        let (shell_id, command_id) = self.require_command(WinRmOperation::Send)?;
        self.round_trip(self.builder.send(&shell_id, &command_id, data, end))
            .await?;
        trace!(command_id = %command_id, bytes = data.len(), "Sent stdin to WinRM command");
        Ok(())
    }

    /// Ask the server to terminate the running command.
    ///
    /// Does nothing without a running command. Failures are logged only.
    pub async fn signal(&mut self) {
        let (Some(shell_id), Some(command_id)) = (self.shell_id.clone(), self.command_id.clone())
        else {
            debug!("No WinRM command to signal");
            return;
        };

        match self
            .round_trip(self.builder.signal(&shell_id, &command_id))
            .await
        {
            Ok(_) => debug!(command_id = %command_id, "Terminated WinRM command"),
            Err(e) => warn!(command_id = %command_id, error = %e, "Failed to signal WinRM command"),
        }
    }

    /// Delete the shell.
    ///
    /// Does nothing without a shell, so it may be called repeatedly.
    /// Failures are logged only.
    pub async fn delete_shell(&mut self) {
        let Some(shell_id) = self.shell_id.take() else {
            return;
        };
        self.command_id = None;
        self.state = SessionState::Deleted;

        match self.round_trip(self.builder.delete(&shell_id)).await {
            Ok(_) => debug!(shell_id = %shell_id, "Deleted WinRM shell"),
            Err(e) => warn!(shell_id = %shell_id, error = %e, "Failed to delete WinRM shell"),
        }
    }
}

impl std::fmt::Debug for WinRmShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinRmShellSession")
            .field("target", &self.builder.target().as_str())
            .field("shell_id", &self.shell_id)
            .field("command_id", &self.command_id)
            .field("chunk", &self.chunk)
            .field("exit_code", &self.exit_code)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::winrm::WinRmOptions;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpConnector for Recorder {
        async fn send(&self, request: &str, _soap_action: Option<&str>) -> WinRmResult<String> {
            self.requests.lock().unwrap().push(request.to_string());
            Err(WinRmError::Transport("HTTP 500".into()))
        }
    }

    fn session(connector: Arc<Recorder>) -> WinRmShellSession {
        let builder = SoapBuilder::new("http://winhost:5985/wsman", WinRmOptions::default()).unwrap();
        WinRmShellSession::new(connector, builder)
    }

    #[tokio::test]
    async fn test_teardown_before_create_sends_nothing() {
        let recorder = Arc::new(Recorder::default());
        let mut session = session(recorder.clone());

        session.signal().await;
        session.delete_shell().await;
        session.delete_shell().await;

        assert!(recorder.requests.lock().unwrap().is_empty());
        assert_eq!(session.state(), SessionState::Unshelled);
        assert_eq!(session.exit_code(), -1);
    }

    #[tokio::test]
    async fn test_preconditions() {
        let recorder = Arc::new(Recorder::default());
        let mut session = session(recorder.clone());
        let (mut out, mut err) = (Vec::new(), Vec::new());

        assert!(matches!(
            session.execute_command("dir").await,
            Err(WinRmError::Precondition {
                operation: WinRmOperation::Command,
                ..
            })
        ));
        assert!(matches!(
            session.receive_output(&mut out, &mut err).await,
            Err(WinRmError::Precondition {
                operation: WinRmOperation::Receive,
                ..
            })
        ));
        assert!(session.send_input(b"x", true).await.is_err());
        assert!(recorder.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_protocol_error() {
        let recorder = Arc::new(Recorder::default());
        let mut session = session(recorder.clone());

        let err = session.create_shell().await.unwrap_err();
        assert!(matches!(
            err,
            WinRmError::Protocol {
                operation: WinRmOperation::CreateShell,
                ..
            }
        ));
        assert_eq!(recorder.requests.lock().unwrap().len(), 1);
        assert!(session.shell_id().is_none());
    }
}
