//! Windows Remote Management (WinRM) remote shell client.
//!
//! WinRM is Microsoft's implementation of WS-Management, a SOAP-based
//! protocol for managing remote hosts. Running a command through the remote
//! shell takes these steps:
//!
//! 1. **Create** a shell and remember the server-assigned shell id
//! 2. **Command**: start a command line in that shell, yielding a command id
//! 3. **Receive** repeatedly until the command state becomes `Done`; every
//!    response carries base64 encoded fragments of stdout and stderr
//! 4. **Signal** (terminate) if the command must be stopped early
//! 5. **Delete** the shell
//!
//! [`soap::SoapBuilder`] produces the request documents,
//! [`session::WinRmShellSession`] drives the state machine and
//! [`transport::HttpConnector`] moves documents over HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hostbridge::winrm::{ReceiveStatus, WinRmOptions, WinRmShellSession};
//! use hostbridge::winrm::soap::SoapBuilder;
//!
//! let builder = SoapBuilder::new("http://winhost:5985/wsman", WinRmOptions::default())?;
//! let mut session = WinRmShellSession::new(connector, builder);
//!
//! session.create_shell().await?;
//! session.execute_command("dir C:\\").await?;
//! let (mut out, mut err) = (Vec::new(), Vec::new());
//! while session.receive_output(&mut out, &mut err).await? == ReceiveStatus::Pending {}
//! session.delete_shell().await;
//! println!("exit code {}", session.exit_code());
//! ```

pub mod error;
pub mod output;
pub mod session;
pub mod soap;
pub mod transport;
pub mod xml;

use serde::{Deserialize, Serialize};

pub use error::{WinRmError, WinRmResult};
pub use session::{ReceiveStatus, SessionState, WinRmShellSession};
pub use soap::{SoapBuilder, SoapRequest, WinRmOperation};
pub use transport::{HttpConnector, ReqwestConnector, TransportSettings};

/// Default WinRM HTTP port
pub const DEFAULT_WINRM_PORT: u16 = 5985;

/// Default WinRM HTTPS port
pub const DEFAULT_WINRM_SSL_PORT: u16 = 5986;

/// Default path of the WS-Management endpoint
pub const DEFAULT_WINRM_CONTEXT: &str = "/wsman";

/// Default maximum envelope size in bytes
pub const DEFAULT_ENVELOPE_SIZE: u32 = 153_600;

/// Default locale
pub const DEFAULT_LOCALE: &str = "en-US";

/// Default operation timeout (ISO 8601 duration)
pub const DEFAULT_TIMEOUT: &str = "PT60.000S";

/// Default console code page (OEM United States)
pub const DEFAULT_CODEPAGE: u32 = 437;

/// XML namespaces used by the remote shell protocol.
pub mod ns {
    /// SOAP 1.2 envelope
    pub const ENV: &str = "http://www.w3.org/2003/05/soap-envelope";
    /// WS-Addressing
    pub const A: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
    /// WS-Management CIM binding
    pub const B: &str = "http://schemas.dmtf.org/wbem/wsman/1/cimbinding.xsd";
    /// WS-Enumeration
    pub const N: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration";
    /// WS-Transfer
    pub const X: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer";
    /// WS-Management
    pub const W: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";
    /// Microsoft WS-Management extensions
    pub const P: &str = "http://schemas.microsoft.com/wbem/wsman/1/wsman.xsd";
    /// XML Schema instance
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    /// Windows remote shell
    pub const RSP: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell";
    /// WS-Management faults
    pub const F: &str = "http://schemas.microsoft.com/wbem/wsman/1/wsmanfault";
}

/// Action URIs of the remote shell operations.
pub mod action {
    /// Create a shell
    pub const CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
    /// Delete a shell
    pub const DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
    /// Start a command
    pub const COMMAND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command";
    /// Receive command output
    pub const RECEIVE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive";
    /// Send command input
    pub const SEND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Send";
    /// Signal a command
    pub const SIGNAL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal";
}

/// Resource URI of the `cmd.exe` remote shell
pub const RESOURCE_URI_CMD: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/cmd";

/// WS-Addressing anonymous reply address
pub const ANONYMOUS_ADDRESS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// Signal code that terminates a running command
pub const SIGNAL_TERMINATE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";

/// Command state reported once a command has finished
pub const COMMAND_STATE_DONE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Done";

/// Protocol level settings carried in every request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinRmOptions {
    /// Maximum envelope size the server may answer with
    pub envelope_size: u32,
    /// Locale of the remote shell
    pub locale: String,
    /// Operation timeout (ISO 8601 duration)
    pub timeout: String,
    /// Console code page of the remote shell
    pub codepage: u32,
}

impl Default for WinRmOptions {
    fn default() -> Self {
        Self {
            envelope_size: DEFAULT_ENVELOPE_SIZE,
            locale: DEFAULT_LOCALE.to_string(),
            timeout: DEFAULT_TIMEOUT.to_string(),
            codepage: DEFAULT_CODEPAGE,
        }
    }
}
