//! WinRM connection module
//!
//! Runs command lines in Windows remote shells. Every command gets its own
//! shell, which is deleted again once the command has finished or failed.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::config::ConnectionConfig;
use super::handler::ExecutionOutputHandler;
use super::{render_command, Connection, ConnectionError, ConnectionResult, ExecuteOptions};
use crate::cmdline::{CmdLine, CmdLineError};
use crate::os::OperatingSystemFamily;
use crate::winrm::{
    HttpConnector, ReceiveStatus, ReqwestConnector, SoapBuilder, TransportSettings,
    WinRmShellSession,
};

/// Connection to a Windows host through WinRM
pub struct WinRmConnection {
    /// Host name or address
    identifier: String,
    /// Transport shared by all sessions
    connector: Arc<dyn HttpConnector>,
    /// Request factory for the endpoint
    builder: SoapBuilder,
}

impl WinRmConnection {
    /// Create a connection using an existing transport
    pub fn new(
        identifier: impl Into<String>,
        connector: Arc<dyn HttpConnector>,
        builder: SoapBuilder,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            connector,
            builder,
        }
    }

    /// Create a connection backed by [`ReqwestConnector`]
    pub fn from_config(config: &ConnectionConfig) -> ConnectionResult<Self> {
        let endpoint = config.winrm_endpoint()?;
        let settings = TransportSettings {
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: Some(Duration::from_secs(config.winrm.connect_timeout)),
            accept_invalid_certs: !config.winrm.verify_certificates,
        };

        let builder = SoapBuilder::new(endpoint.as_str(), config.winrm.options.clone())?;
        let connector = ReqwestConnector::new(endpoint, settings)?;
        let identifier = config.address.clone().unwrap_or_default();

        debug!(host = %identifier, endpoint = %builder.target(), "Created WinRM connection");
        Ok(Self::new(identifier, Arc::new(connector), builder))
    }

    /// The `cmd.exe` line sent to the shell and its loggable rendering.
    ///
    /// A working directory becomes a `CD <dir> & ` prefix and environment
    /// variables become `SET "K=V" & ` prefixes. The quotes keep `&`, `|` and
    /// `>` in values literal and stop `cmd.exe` from keeping the space before
    /// the next `&`. Keys must be non-empty and must not contain `=` or `"`.
    pub fn command_line(
        command: &CmdLine,
        options: &ExecuteOptions,
    ) -> ConnectionResult<(String, String)> {
        let (line, loggable) = render_command(command, OperatingSystemFamily::Windows, None)?;

        let mut prefix = String::new();
        if let Some(cwd) = &options.cwd {
            prefix.push_str(&format!("CD {} & ", cwd));
        }
        let mut env: Vec<_> = options.env.iter().collect();
        env.sort();
        for (key, value) in env {
            if key.is_empty() || key.contains(['=', '"']) {
                return Err(CmdLineError::InvalidArgument(format!(
                    "invalid environment variable name: {:?}",
                    key
                ))
                .into());
            }
            prefix.push_str(&format!("SET \"{}={}\" & ", key, value));
        }

        Ok((format!("{}{}", prefix, line), format!("{}{}", prefix, loggable)))
    }

    fn session(&self) -> WinRmShellSession {
        WinRmShellSession::new(self.connector.clone(), self.builder.clone())
    }

    async fn run(
        session: &mut WinRmShellSession,
        line: &str,
        stdin: Option<Vec<u8>>,
        handler: &mut dyn ExecutionOutputHandler,
    ) -> ConnectionResult<i32> {
        session.create_shell().await?;
        session.execute_command(line).await?;

        if let Some(input) = stdin {
            session.send_input(&input, true).await?;
        }

        loop {
            let (stdout, stderr) = handler.streams();
            if session.receive_output(stdout, stderr).await? == ReceiveStatus::Done {
                break;
            }
        }

        Ok(session.exit_code())
    }
}

impl std::fmt::Debug for WinRmConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinRmConnection")
            .field("identifier", &self.identifier)
            .field("endpoint", &self.builder.target().as_str())
            .finish()
    }
}

#[async_trait]
impl Connection for WinRmConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn os(&self) -> OperatingSystemFamily {
        OperatingSystemFamily::Windows
    }

    async fn is_alive(&self) -> bool {
        let mut session = self.session();
        let alive = session.create_shell().await.is_ok();
        session.delete_shell().await;
        alive
    }

    async fn execute(
        &self,
        command: &CmdLine,
        options: Option<ExecuteOptions>,
        handler: &mut dyn ExecutionOutputHandler,
    ) -> ConnectionResult<i32> {
        let options = options.unwrap_or_default();
        let (line, loggable) = Self::command_line(command, &options)?;
        debug!(host = %self.identifier, command = %loggable, "Executing WinRM command");

        let mut session = self.session();
        let run = Self::run(&mut session, &line, options.stdin, handler);
        let result = match options.timeout {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
                .await
                .unwrap_or_else(|_| Err(ConnectionError::Timeout(secs))),
            None => run.await,
        };

        if let Err(e) = &result {
            warn!(host = %self.identifier, error = %e, "WinRM command failed");
            session.signal().await;
        }
        session.delete_shell().await;

        if let Ok(exit_code) = &result {
            trace!(exit_code = %exit_code, "WinRM command completed");
        }
        result
    }

    async fn close(&self) -> ConnectionResult<()> {
        // Shells are deleted after every command
        Ok(())
    }
}
