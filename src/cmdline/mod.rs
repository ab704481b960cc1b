//! OS-portable command lines.
//!
//! A [`CmdLine`] is an ordered list of [`CmdLineArgument`]s. Each argument
//! knows how to render itself for a target [`OperatingSystemFamily`]:
//! literals and passwords are escaped, raw fragments are passed through as-is
//! and nested command lines are rendered and then escaped a second time.
//!
//! # Example
//!
//! ```rust
//! use hostbridge::cmdline::CmdLine;
//! use hostbridge::os::OperatingSystemFamily;
//!
//! let cmd = CmdLine::build(["wsadmin.sh", "-user", "admin", "-password"])
//!     .add_password("secret");
//!
//! assert_eq!(
//!     cmd.to_command_line(OperatingSystemFamily::Windows, true).unwrap(),
//!     "wsadmin.sh -user admin -password ********"
//! );
//! ```

pub mod escape;
pub mod sudo;

use std::fmt;
use thiserror::Error;

use crate::os::OperatingSystemFamily;
pub use escape::{encode_argument, encode_unix_argument, encode_windows_argument};
pub use sudo::SudoConfig;

/// Text substituted for passwords when secrets are suppressed.
pub const PASSWORD_MASK: &str = "********";

/// Errors raised while building or rendering command lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CmdLineError {
    /// Malformed input supplied to a builder.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Rendering was attempted on a command line without arguments.
    #[error("Cannot render an empty command line")]
    EmptyCommandLine,
}

/// Result type for command line operations.
pub type CmdLineResult<T> = Result<T, CmdLineError>;

/// A single argument of a [`CmdLine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdLineArgument {
    /// Regular argument, escaped for the target OS.
    Literal(String),
    /// Secret argument, escaped like a literal but masked in log output.
    Password(String),
    /// Fragment passed to the shell verbatim (`|`, `;`, `*`, redirects, ...).
    Raw(String),
    /// A complete command line used as one argument.
    Nested(CmdLine),
}

impl CmdLineArgument {
    /// Render this argument as a single escaped token.
    pub fn render(&self, os: OperatingSystemFamily, suppress_secrets: bool) -> CmdLineResult<String> {
        match self {
            Self::Literal(value) => Ok(encode_argument(value, os)),
            Self::Password(_) if suppress_secrets => Ok(encode_argument(PASSWORD_MASK, os)),
            Self::Password(value) => Ok(encode_argument(value, os)),
            Self::Raw(value) => Ok(value.clone()),
            Self::Nested(nested) => {
                let inner = nested.to_command_line(os, suppress_secrets)?;
                Ok(encode_argument(&inner, os))
            }
        }
    }

    /// Whether this is a raw pipe or command separator.
    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Raw(value) if value == "|" || value == ";")
    }
}

/// An ordered, OS-independent command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdLine {
    arguments: Vec<CmdLineArgument>,
}

impl CmdLine {
    /// Create an empty command line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a command line with one literal argument per token.
    pub fn build<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().add_arguments(tokens)
    }

    /// Append a prepared argument.
    pub fn add(mut self, argument: CmdLineArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Append a prepared argument in place.
    pub fn push(&mut self, argument: CmdLineArgument) {
        self.arguments.push(argument);
    }

    /// Append a literal argument.
    pub fn add_argument(self, value: impl Into<String>) -> Self {
        self.add(CmdLineArgument::Literal(value.into()))
    }

    /// Append several literal arguments.
    pub fn add_arguments<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments
            .extend(values.into_iter().map(|v| CmdLineArgument::Literal(v.into())));
        self
    }

    /// Append a password argument.
    pub fn add_password(self, value: impl Into<String>) -> Self {
        self.add(CmdLineArgument::Password(value.into()))
    }

    /// Append a raw, unescaped fragment.
    pub fn add_raw(self, value: impl Into<String>) -> Self {
        self.add(CmdLineArgument::Raw(value.into()))
    }

    /// Append a nested command line as one argument.
    pub fn add_nested(self, nested: CmdLine) -> Self {
        self.add(CmdLineArgument::Nested(nested))
    }

    /// The arguments in order.
    pub fn arguments(&self) -> &[CmdLineArgument] {
        &self.arguments
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    /// Whether the command line has no arguments.
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Render every argument to its own escaped token.
    ///
    /// Secrets are not suppressed: the result is meant to be executed.
    pub fn to_argument_array(&self, os: OperatingSystemFamily) -> CmdLineResult<Vec<String>> {
        if self.arguments.is_empty() {
            return Err(CmdLineError::EmptyCommandLine);
        }
        self.arguments
            .iter()
            .map(|argument| argument.render(os, false))
            .collect()
    }

    /// Render the command line as one space separated string.
    ///
    /// With `suppress_secrets` set, password arguments are masked so the
    /// result can be logged.
    pub fn to_command_line(
        &self,
        os: OperatingSystemFamily,
        suppress_secrets: bool,
    ) -> CmdLineResult<String> {
        if self.arguments.is_empty() {
            return Err(CmdLineError::EmptyCommandLine);
        }
        let tokens = self
            .arguments
            .iter()
            .map(|argument| argument.render(os, suppress_secrets))
            .collect::<CmdLineResult<Vec<_>>>()?;
        Ok(tokens.join(" "))
    }
}

impl fmt::Display for CmdLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_command_line(OperatingSystemFamily::Unix, true) {
            Ok(line) => f.write_str(&line),
            Err(_) => f.write_str("<empty command line>"),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for CmdLine {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::build(iter)
    }
}
