//! Local connection module
//!
//! This module provides local command execution without any network
//! transport. The process helpers are shared with the Docker connection,
//! which also drives a local child process.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, trace};

use super::handler::ExecutionOutputHandler;
use super::{render_command, Connection, ConnectionError, ConnectionResult, ExecuteOptions};
use crate::cmdline::{CmdLine, SudoConfig};
use crate::os::OperatingSystemFamily;

const READ_BUFFER_SIZE: usize = 8192;

/// Local connection for executing commands on the current host
#[derive(Debug, Clone)]
pub struct LocalConnection {
    /// Identifier for this connection
    identifier: String,
    /// Rendering rules for command lines
    os: OperatingSystemFamily,
    /// Optional privilege escalation
    sudo: Option<SudoConfig>,
}

impl LocalConnection {
    /// Create a new local connection
    pub fn new() -> Self {
        let identifier = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "localhost".to_string());

        Self {
            identifier,
            os: OperatingSystemFamily::local(),
            sudo: None,
        }
    }

    /// Create a local connection with a custom identifier
    pub fn with_identifier(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::new()
        }
    }

    /// Override the operating system family used for rendering
    pub fn with_os(mut self, os: OperatingSystemFamily) -> Self {
        self.os = os;
        self
    }

    /// Run every command through `sudo`
    pub fn with_sudo(mut self, sudo: SudoConfig) -> Self {
        self.sudo = Some(sudo);
        self
    }

    /// Build the command with options
    fn build_command(&self, line: &str, options: &ExecuteOptions) -> Command {
        let mut cmd = shell_command(self.os, line);

        // Set working directory
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        // Set environment variables
        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        cmd
    }
}

impl Default for LocalConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// `sh -c <line>`, or `cmd /c <line>` for Windows hosts.
pub(crate) fn shell_command(os: OperatingSystemFamily, line: &str) -> Command {
    if os.is_windows() {
        let mut c = Command::new("cmd");
        c.arg("/c");
        #[cfg(windows)]
        {
            c.raw_arg(line);
        }
        #[cfg(not(windows))]
        {
            c.arg(line);
        }
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Spawn `cmd`, feed it `stdin` and stream its output into `handler`.
///
/// The child is killed when `timeout` seconds pass.
pub(crate) async fn run_process(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    timeout: Option<u64>,
    handler: &mut dyn ExecutionOutputHandler,
) -> ConnectionResult<i32> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        ConnectionError::ExecutionFailed(format!("Failed to spawn process: {}", e))
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&input).await {
                trace!(error = %e, "Process closed stdin before all input was written");
            }
        });
    }

    let run = pump_output(&mut child, handler);
    match timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
            .await
            .map_err(|_| ConnectionError::Timeout(secs))?,
        None => run.await,
    }
}

async fn pump_output(
    child: &mut Child,
    handler: &mut dyn ExecutionOutputHandler,
) -> ConnectionResult<i32> {
    let mut stdout = child.stdout.take().ok_or_else(|| {
        ConnectionError::ExecutionFailed("Process stdout was not captured".to_string())
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| {
        ConnectionError::ExecutionFailed("Process stderr was not captured".to_string())
    })?;

    let (out_sink, err_sink) = handler.streams();
    let mut out_buf = vec![0u8; READ_BUFFER_SIZE];
    let mut err_buf = vec![0u8; READ_BUFFER_SIZE];
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => {
                match read? {
                    0 => out_open = false,
                    n => out_sink.write_all(&out_buf[..n])?,
                }
            }
            read = stderr.read(&mut err_buf), if err_open => {
                match read? {
                    0 => err_open = false,
                    n => err_sink.write_all(&err_buf[..n])?,
                }
            }
        }
    }

    let status = child.wait().await.map_err(|e| {
        ConnectionError::ExecutionFailed(format!("Failed to wait for process: {}", e))
    })?;
    Ok(status.code().unwrap_or(-1))
}

#[async_trait]
impl Connection for LocalConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn os(&self) -> OperatingSystemFamily {
        self.os
    }

    async fn is_alive(&self) -> bool {
        // Local connection is always alive
        true
    }

    async fn execute(
        &self,
        command: &CmdLine,
        options: Option<ExecuteOptions>,
        handler: &mut dyn ExecutionOutputHandler,
    ) -> ConnectionResult<i32> {
        let options = options.unwrap_or_default();
        let (line, loggable) = render_command(command, self.os, self.sudo.as_ref())?;
        debug!(command = %loggable, "Executing local command");

        let cmd = self.build_command(&line, &options);
        let exit_code = run_process(cmd, options.stdin, options.timeout, handler).await?;

        trace!(exit_code = %exit_code, "Command completed");
        Ok(exit_code)
    }

    async fn close(&self) -> ConnectionResult<()> {
        // Nothing to close for local connections
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_connection_creation() {
        let conn = LocalConnection::new();
        assert!(!conn.identifier().is_empty());
        assert_eq!(conn.os(), OperatingSystemFamily::local());
    }

    #[test]
    fn test_custom_identifier() {
        let conn = LocalConnection::with_identifier("control");
        assert_eq!(conn.identifier(), "control");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_streams_both_outputs() {
        let conn = LocalConnection::new();
        let cmd = CmdLine::build(["sh", "-c", "echo out; echo err >&2; exit 3"]);
        let result = conn.execute_captured(&cmd, None).await.unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let conn = LocalConnection::new();
        let options = ExecuteOptions::new().with_timeout(1);
        let result = conn
            .execute_captured(&CmdLine::build(["sleep", "10"]), Some(options))
            .await;
        assert!(matches!(result, Err(ConnectionError::Timeout(1))));
    }
}
