//! Connection layer for remote host communication.
//!
//! This module provides a unified interface for executing command lines
//! across different transport mechanisms (local, Docker, WinRM). All
//! connections implement the [`Connection`] trait and render the
//! OS-independent [`CmdLine`] for the operating system of their host.
//!
//! # Supported Transports
//!
//! - **Local**: Direct execution on the control node (`sh -c` or `cmd /c`)
//! - **Docker**: Container-based execution via `docker exec`
//! - **WinRM**: Windows remote shells over WS-Management
//!
//! # Example
//!
//! ```rust,ignore
//! use hostbridge::cmdline::CmdLine;
//! use hostbridge::connection::{connect, ConnectionConfig, ExecuteOptions};
//!
//! let conn = connect(&ConnectionConfig::from_file("winhost.toml")?)?;
//!
//! let opts = ExecuteOptions::new().with_cwd("C:\\Temp");
//! let result = conn
//!     .execute_captured(&CmdLine::build(["dir", "/b"]), Some(opts))
//!     .await?;
//! println!("Output: {}", result.stdout);
//! ```

/// Connection configuration types.
pub mod config;

/// Docker container connection implementation.
pub mod docker;

/// Output handlers.
pub mod handler;

/// Local execution connection implementation.
pub mod local;

/// WinRM remote shell connection implementation.
pub mod winrm;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::cmdline::{CmdLine, CmdLineError};
use crate::os::OperatingSystemFamily;
use crate::winrm::WinRmError;

pub use config::{ConnectionConfig, DockerSettings, Protocol, SudoSettings, WinRmSettings};
pub use docker::DockerConnection;
pub use handler::{CapturingOutputHandler, ExecutionOutputHandler, LoggingOutputHandler};
pub use local::LocalConnection;
pub use winrm::WinRmConnection;

/// Errors that can occur during connection operations.
///
/// This enum covers all error conditions that may arise when establishing
/// connections or executing commands.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Command execution failed (not to be confused with non-zero exit code).
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Connection or operation timed out.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// Configuration is invalid or incomplete.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error during connection operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Docker-specific error during container operations.
    #[error("Docker error: {0}")]
    DockerError(String),

    /// The command line could not be built or rendered.
    #[error(transparent)]
    CommandLine(#[from] CmdLineError),

    /// The WinRM remote shell failed.
    #[error(transparent)]
    WinRm(#[from] WinRmError),
}

/// Result type for connection operations.
///
/// A type alias for `Result<T, ConnectionError>`.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// The result of executing a command on a connection.
///
/// Contains the exit code, stdout, stderr, and a convenience boolean
/// indicating whether the command succeeded (exit code 0).
///
/// # Example
///
/// ```rust
/// use hostbridge::connection::CommandResult;
///
/// let result = CommandResult::success("Hello".into(), String::new());
/// assert!(result.success);
/// assert_eq!(result.exit_code, 0);
///
/// let failed = CommandResult::failure(1, String::new(), "error".into());
/// assert!(!failed.success);
/// ```
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code of the command (0 typically indicates success).
    pub exit_code: i32,
    /// Content written to standard output.
    pub stdout: String,
    /// Content written to standard error.
    pub stderr: String,
    /// Convenience flag: `true` if `exit_code == 0`.
    pub success: bool,
}

impl CommandResult {
    /// Create a new successful command result
    pub fn success(stdout: String, stderr: String) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr,
            success: true,
        }
    }

    /// Create a new failed command result
    pub fn failure(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            success: false,
        }
    }
}

/// Options for command execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Working directory for the command
    pub cwd: Option<String>,
    /// Environment variables to set
    pub env: HashMap<String, String>,
    /// Bytes written to the command's stdin
    pub stdin: Option<Vec<u8>>,
    /// Timeout in seconds (None for no timeout)
    pub timeout: Option<u64>,
}

impl ExecuteOptions {
    /// Create new execute options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Feed `input` to the command's stdin
    pub fn with_stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The main connection trait that all transport implementations must implement
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the connection identifier (hostname or container name)
    fn identifier(&self) -> &str;

    /// Operating system family of the host
    fn os(&self) -> OperatingSystemFamily;

    /// Check if the connection is still alive
    async fn is_alive(&self) -> bool;

    /// Execute a command line, streaming its output into `handler`.
    ///
    /// Returns the exit code. A non-zero exit code is not an error.
    async fn execute(
        &self,
        command: &CmdLine,
        options: Option<ExecuteOptions>,
        handler: &mut dyn ExecutionOutputHandler,
    ) -> ConnectionResult<i32>;

    /// Execute a command line and collect its output
    async fn execute_captured(
        &self,
        command: &CmdLine,
        options: Option<ExecuteOptions>,
    ) -> ConnectionResult<CommandResult> {
        let mut handler = CapturingOutputHandler::new();
        let exit_code = self.execute(command, options, &mut handler).await?;
        Ok(handler.into_result(exit_code))
    }

    /// Close the connection
    async fn close(&self) -> ConnectionResult<()>;
}

/// Create the connection described by `config`.
pub fn connect(config: &ConnectionConfig) -> ConnectionResult<Arc<dyn Connection>> {
    config.validate()?;
    debug!(protocol = %config.protocol, address = ?config.address, "Creating connection");

    let sudo = config.sudo_config()?;
    let connection: Arc<dyn Connection> = match config.protocol {
        Protocol::Local => {
            let mut local = LocalConnection::new().with_os(config.effective_os());
            if let Some(sudo) = sudo {
                local = local.with_sudo(sudo);
            }
            Arc::new(local)
        }
        Protocol::Docker => {
            let settings = config.docker.as_ref().ok_or_else(|| {
                ConnectionError::InvalidConfig("Docker protocol requires [docker]".to_string())
            })?;
            let mut docker =
                DockerConnection::with_docker_path(&settings.container, &settings.docker_path);
            if let Some(sudo) = sudo {
                docker = docker.with_sudo(sudo);
            }
            Arc::new(docker)
        }
        Protocol::Winrm => {
            if sudo.is_some() {
                return Err(ConnectionError::InvalidConfig(
                    "sudo is not supported on WinRM connections".to_string(),
                ));
            }
            Arc::new(WinRmConnection::from_config(config)?)
        }
    };

    Ok(connection)
}

/// Render `command` for `os`, applying `sudo` when configured.
pub(crate) fn render_command(
    command: &CmdLine,
    os: OperatingSystemFamily,
    sudo: Option<&crate::cmdline::SudoConfig>,
) -> ConnectionResult<(String, String)> {
    let command = match sudo {
        Some(sudo) => sudo.prefix_with_sudo(command),
        None => command.clone(),
    };
    let line = command.to_command_line(os, false)?;
    let loggable = command.to_command_line(os, true)?;
    Ok((line, loggable))
}
