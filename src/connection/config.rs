//! Connection configuration module
//!
//! A [`ConnectionConfig`] describes one target host and is usually loaded
//! from a TOML file:
//!
//! ```toml
//! protocol = "winrm"
//! address = "winhost.example.com"
//! username = "Administrator"
//! password = "secret"
//!
//! [winrm]
//! https = true
//! verify_certificates = false
//! codepage = 65001
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use url::Url;

use super::{ConnectionError, ConnectionResult};
use crate::cmdline::sudo::{SudoConfig, DEFAULT_SUDO_COMMAND_PREFIX};
use crate::os::OperatingSystemFamily;
use crate::winrm::{
    WinRmOptions, DEFAULT_WINRM_CONTEXT, DEFAULT_WINRM_PORT, DEFAULT_WINRM_SSL_PORT,
};

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 60;

/// Default docker executable
pub const DEFAULT_DOCKER_PATH: &str = "docker";

/// Transport used to reach the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Commands run on this machine
    #[default]
    Local,
    /// Commands run inside a container via `docker exec`
    Docker,
    /// Commands run in a WinRM remote shell
    Winrm,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Local => write!(f, "local"),
            Protocol::Docker => write!(f, "docker"),
            Protocol::Winrm => write!(f, "winrm"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Protocol::Local),
            "docker" => Ok(Protocol::Docker),
            "winrm" => Ok(Protocol::Winrm),
            other => Err(ConnectionError::InvalidConfig(format!(
                "Unknown protocol: {}",
                other
            ))),
        }
    }
}

/// Settings of one target host
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Transport used to reach the host
    #[serde(default)]
    pub protocol: Protocol,

    /// Operating system of the host; derived from the protocol when absent
    #[serde(default)]
    pub os: Option<OperatingSystemFamily>,

    /// Hostname or IP address
    #[serde(default)]
    pub address: Option<String>,

    /// Port to connect to
    #[serde(default)]
    pub port: Option<u16>,

    /// Username for authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for authentication
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// WinRM settings
    #[serde(default)]
    pub winrm: WinRmSettings,

    /// Docker settings
    #[serde(default)]
    pub docker: Option<DockerSettings>,

    /// Privilege escalation settings
    #[serde(default)]
    pub sudo: Option<SudoSettings>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("protocol", &self.protocol)
            .field("os", &self.os)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("winrm", &self.winrm)
            .field("docker", &self.docker)
            .field("sudo", &self.sudo)
            .finish()
    }
}

impl ConnectionConfig {
    /// Configuration for running commands on this machine
    pub fn local() -> Self {
        Self::default()
    }

    /// Configuration for a docker container
    pub fn docker(container: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Docker,
            docker: Some(DockerSettings {
                container: container.into(),
                docker_path: DEFAULT_DOCKER_PATH.to_string(),
            }),
            ..Self::default()
        }
    }

    /// Configuration for a WinRM host
    pub fn winrm(address: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Winrm,
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// Set credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set privilege escalation settings
    pub fn with_sudo(mut self, sudo: SudoSettings) -> Self {
        self.sudo = Some(sudo);
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> ConnectionResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ConnectionError::InvalidConfig(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> ConnectionResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConnectionError::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings required by the protocol are present
    pub fn validate(&self) -> ConnectionResult<()> {
        if self.port == Some(0) {
            return Err(ConnectionError::InvalidConfig(
                "Port must not be 0".to_string(),
            ));
        }

        match self.protocol {
            Protocol::Local => {}
            Protocol::Docker => {
                let docker = self.docker.as_ref().ok_or_else(|| {
                    ConnectionError::InvalidConfig("Docker protocol requires [docker]".to_string())
                })?;
                if docker.container.trim().is_empty() {
                    return Err(ConnectionError::InvalidConfig(
                        "Docker container must not be empty".to_string(),
                    ));
                }
            }
            Protocol::Winrm => {
                if self.address.as_deref().map_or(true, |a| a.trim().is_empty()) {
                    return Err(ConnectionError::InvalidConfig(
                        "WinRM protocol requires an address".to_string(),
                    ));
                }
                if self.os.is_some_and(|os| !os.is_windows()) {
                    return Err(ConnectionError::InvalidConfig(
                        "WinRM hosts must be Windows hosts".to_string(),
                    ));
                }
            }
        }

        self.sudo_config()?;
        Ok(())
    }

    /// Operating system of the host
    pub fn effective_os(&self) -> OperatingSystemFamily {
        self.os.unwrap_or(match self.protocol {
            Protocol::Local => OperatingSystemFamily::local(),
            Protocol::Docker => OperatingSystemFamily::Unix,
            Protocol::Winrm => OperatingSystemFamily::Windows,
        })
    }

    /// Validated privilege escalation config, if configured
    pub fn sudo_config(&self) -> ConnectionResult<Option<SudoConfig>> {
        self.sudo
            .as_ref()
            .map(|sudo| {
                SudoConfig::new(&sudo.command_prefix, &sudo.username, sudo.quote_command)
                    .map_err(|e| ConnectionError::InvalidConfig(e.to_string()))
            })
            .transpose()
    }

    /// WS-Management endpoint, e.g. `https://winhost:5986/wsman`
    pub fn winrm_endpoint(&self) -> ConnectionResult<Url> {
        let address = self.address.as_deref().ok_or_else(|| {
            ConnectionError::InvalidConfig("WinRM protocol requires an address".to_string())
        })?;
        let (scheme, default_port) = if self.winrm.https {
            ("https", DEFAULT_WINRM_SSL_PORT)
        } else {
            ("http", DEFAULT_WINRM_PORT)
        };
        let host = if address.contains(':') && !address.starts_with('[') {
            format!("[{}]", address)
        } else {
            address.to_string()
        };
        let context = if self.winrm.context.starts_with('/') {
            self.winrm.context.clone()
        } else {
            format!("/{}", self.winrm.context)
        };

        let endpoint = format!(
            "{}://{}:{}{}",
            scheme,
            host,
            self.port.unwrap_or(default_port),
            context
        );
        Url::parse(&endpoint).map_err(|e| {
            ConnectionError::InvalidConfig(format!("Invalid WinRM endpoint {}: {}", endpoint, e))
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_context() -> String {
    DEFAULT_WINRM_CONTEXT.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_docker_path() -> String {
    DEFAULT_DOCKER_PATH.to_string()
}

fn default_command_prefix() -> String {
    DEFAULT_SUDO_COMMAND_PREFIX.to_string()
}

/// WinRM specific settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRmSettings {
    /// Use HTTPS
    #[serde(default)]
    pub https: bool,

    /// Path of the WS-Management endpoint
    #[serde(default = "default_context")]
    pub context: String,

    /// Verify server certificates
    #[serde(default = "default_true")]
    pub verify_certificates: bool,

    /// HTTP request timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Protocol header settings
    #[serde(flatten)]
    pub options: WinRmOptions,
}

impl Default for WinRmSettings {
    fn default() -> Self {
        Self {
            https: false,
            context: default_context(),
            verify_certificates: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            options: WinRmOptions::default(),
        }
    }
}

/// Docker specific settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerSettings {
    /// Container ID or name
    pub container: String,

    /// Docker executable
    #[serde(default = "default_docker_path")]
    pub docker_path: String,
}

/// Privilege escalation settings, validated into a [`SudoConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudoSettings {
    /// Prefix template; `{0}` is replaced by the username
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// User to run commands as
    pub username: String,

    /// Pass the original command as one quoted argument
    #[serde(default)]
    pub quote_command: bool,
}

impl SudoSettings {
    /// `sudo -u <username>` without quoting
    pub fn for_user(username: impl Into<String>) -> Self {
        Self {
            command_prefix: default_command_prefix(),
            username: username.into(),
            quote_command: false,
        }
    }
}
