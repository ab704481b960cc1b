//! # hostbridge - Run Command Lines on Local, Docker and Windows Hosts
//!
//! hostbridge models command lines independently of the shell that will
//! eventually run them, and executes them through interchangeable
//! connections.
//!
//! ## Core Concepts
//!
//! - **Command lines**: [`CmdLine`](cmdline::CmdLine) is an ordered list of
//!   literal, password, raw and nested arguments, rendered for `cmd.exe` or
//!   POSIX shell quoting rules
//! - **Privilege escalation**: [`SudoConfig`](cmdline::SudoConfig) rewrites a
//!   command line so that every pipeline section runs through `sudo`
//! - **Connections**: local processes, `docker exec` and WinRM remote shells
//!   behind one [`Connection`](connection::Connection) trait
//! - **WinRM**: a WS-Management remote shell client speaking SOAP over HTTP
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     CLI Interface                         │
//! │              (clap-based command parsing)                 │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │            CmdLine model + OS escaping + sudo             │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌──────────────────┐
//! │ LocalConnection │ │DockerConnection │ │ WinRmConnection  │
//! │   (sh -c)       │ │ (docker exec)   │ │ (shell session)  │
//! └─────────────────┘ └─────────────────┘ └──────────────────┘
//!                                                  │
//!                                                  ▼
//!                                   ┌──────────────────────────┐
//!                                   │ SOAP builder + reqwest    │
//!                                   └──────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use hostbridge::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConnectionConfig::winrm("winhost").with_credentials("admin", "secret");
//!     let conn = connect(&config)?;
//!
//!     let cmd = CmdLine::build(["ipconfig", "/all"]);
//!     let result = conn.execute_captured(&cmd, None).await?;
//!     println!("{}", result.stdout);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Command lines
    pub use crate::cmdline::{CmdLine, CmdLineArgument, CmdLineError, SudoConfig};
    pub use crate::os::OperatingSystemFamily;

    // Connection types
    pub use crate::connection::{
        connect, CapturingOutputHandler, CommandResult, Connection, ConnectionConfig,
        ConnectionError, ConnectionResult, DockerConnection, ExecuteOptions,
        ExecutionOutputHandler, LocalConnection, LoggingOutputHandler, WinRmConnection,
    };

    // WinRM client
    pub use crate::winrm::{
        HttpConnector, ReceiveStatus, ReqwestConnector, SoapBuilder, WinRmError, WinRmOptions,
        WinRmShellSession,
    };
}

// ============================================================================
// Command Lines
// ============================================================================

/// OS-portable command lines, argument escaping and sudo wrapping.
pub mod cmdline;

/// Operating system families and their conventions.
pub mod os;

// ============================================================================
// Transports
// ============================================================================

/// Connection layer for local, Docker and WinRM hosts.
pub mod connection;

/// WS-Management remote shell client.
pub mod winrm;

// ============================================================================
// Infrastructure
// ============================================================================

/// Structured logging setup.
pub mod logging;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
