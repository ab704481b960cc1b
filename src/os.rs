//! Operating system families of target hosts.
//!
//! The family decides how command line arguments are escaped and which
//! separators apply to paths on the remote side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Family of the operating system running on a target host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystemFamily {
    /// Unix-like systems (Linux, BSD, macOS, ...)
    #[default]
    Unix,
    /// Microsoft Windows
    Windows,
    /// IBM z/OS (Unix System Services)
    Zos,
}

impl OperatingSystemFamily {
    /// Separator between path components, e.g. `/` or `\`.
    pub fn file_separator(&self) -> &'static str {
        match self {
            Self::Windows => "\\",
            Self::Unix | Self::Zos => "/",
        }
    }

    /// Separator between entries of a search path, e.g. `:` or `;`.
    pub fn path_separator(&self) -> &'static str {
        match self {
            Self::Windows => ";",
            Self::Unix | Self::Zos => ":",
        }
    }

    /// Line terminator used by text files and console output.
    pub fn line_separator(&self) -> &'static str {
        match self {
            Self::Windows => "\r\n",
            Self::Unix | Self::Zos => "\n",
        }
    }

    /// Extension of shell scripts.
    pub fn script_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".bat",
            Self::Unix | Self::Zos => ".sh",
        }
    }

    /// Default directory for temporary files on the target.
    pub fn default_temporary_directory(&self) -> &'static str {
        match self {
            Self::Windows => "C:\\windows\\temp",
            Self::Unix | Self::Zos => "/tmp",
        }
    }

    /// Whether arguments are escaped with Windows `cmd.exe` rules.
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Family of the host this process runs on.
    pub fn local() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Join path components with this family's separator.
    pub fn join_path(&self, parent: &str, child: &str) -> String {
        let sep = self.file_separator();
        if parent.ends_with(sep) {
            format!("{}{}", parent, child)
        } else {
            format!("{}{}{}", parent, sep, child)
        }
    }
}

impl fmt::Display for OperatingSystemFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unix => "unix",
            Self::Windows => "windows",
            Self::Zos => "zos",
        };
        f.write_str(name)
    }
}

impl FromStr for OperatingSystemFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unix" | "linux" => Ok(Self::Unix),
            "windows" => Ok(Self::Windows),
            "zos" | "z/os" => Ok(Self::Zos),
            other => Err(format!("Unknown operating system family: {}", other)),
        }
    }
}
