//! Docker connection module
//!
//! This module provides connectivity to Docker containers using the
//! docker CLI. Command lines are rendered for Unix and run through
//! `sh -c` inside the container.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

use super::handler::ExecutionOutputHandler;
use super::local::run_process;
use super::{render_command, Connection, ConnectionError, ConnectionResult, ExecuteOptions};
use crate::cmdline::{CmdLine, SudoConfig};
use crate::os::OperatingSystemFamily;

/// Docker connection for executing commands inside containers
#[derive(Debug, Clone)]
pub struct DockerConnection {
    /// Container ID or name
    container: String,
    /// Docker executable path (default: "docker")
    docker_path: String,
    /// Optional privilege escalation inside the container
    sudo: Option<SudoConfig>,
}

impl DockerConnection {
    /// Create a new Docker connection
    pub fn new(container: impl Into<String>) -> Self {
        Self::with_docker_path(container, "docker")
    }

    /// Create a new Docker connection with a custom docker path
    pub fn with_docker_path(container: impl Into<String>, docker_path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            docker_path: docker_path.into(),
            sudo: None,
        }
    }

    /// Run every command through `sudo`
    pub fn with_sudo(mut self, sudo: SudoConfig) -> Self {
        self.sudo = Some(sudo);
        self
    }

    /// Arguments passed to the docker executable
    pub fn exec_arguments(&self, line: &str, options: &ExecuteOptions) -> Vec<String> {
        let mut args = vec!["exec".to_string(), "-i".to_string()];

        if let Some(cwd) = &options.cwd {
            args.push("-w".to_string());
            args.push(cwd.clone());
        }

        let mut env: Vec<_> = options.env.iter().collect();
        env.sort();
        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(self.container.clone());
        args.push("sh".to_string());
        args.push("-c".to_string());
        args.push(line.to_string());
        args
    }

    /// Check if container is running
    async fn is_container_running(&self) -> ConnectionResult<bool> {
        let mut cmd = Command::new(&self.docker_path);

        cmd.arg("inspect")
            .arg("-f")
            .arg("{{.State.Running}}")
            .arg(&self.container)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|e| {
            ConnectionError::DockerError(format!("Failed to inspect container: {}", e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim() == "true")
    }
}

#[async_trait]
impl Connection for DockerConnection {
    fn identifier(&self) -> &str {
        &self.container
    }

    fn os(&self) -> OperatingSystemFamily {
        OperatingSystemFamily::Unix
    }

    async fn is_alive(&self) -> bool {
        self.is_container_running().await.unwrap_or(false)
    }

    async fn execute(
        &self,
        command: &CmdLine,
        options: Option<ExecuteOptions>,
        handler: &mut dyn ExecutionOutputHandler,
    ) -> ConnectionResult<i32> {
        let options = options.unwrap_or_default();
        let (line, loggable) =
            render_command(command, OperatingSystemFamily::Unix, self.sudo.as_ref())?;

        // Verify container is running
        if !self.is_container_running().await? {
            return Err(ConnectionError::DockerError(format!(
                "Container {} is not running",
                self.container
            )));
        }

        debug!(
            container = %self.container,
            command = %loggable,
            "Executing command in Docker container"
        );

        let mut cmd = Command::new(&self.docker_path);
        cmd.args(self.exec_arguments(&line, &options));
        let exit_code = run_process(cmd, options.stdin, options.timeout, handler).await?;

        trace!(exit_code = %exit_code, "Docker command completed");
        Ok(exit_code)
    }

    async fn close(&self) -> ConnectionResult<()> {
        // Nothing to close for docker connections
        Ok(())
    }
}
