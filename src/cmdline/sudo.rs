//! Privilege escalation by rewriting command lines with a `sudo` prefix.
//!
//! Without quoting, a command line is split at raw `|` and `;` arguments and
//! every segment gets its own prefix, so that each stage of a pipeline runs
//! escalated. With quoting, the whole line becomes one nested argument of a
//! single prefix.

use tracing::trace;

use super::{CmdLine, CmdLineError, CmdLineResult};

/// Placeholder replaced by the target username in a prefix template.
pub const USERNAME_PLACEHOLDER: &str = "{0}";

/// Default prefix template.
pub const DEFAULT_SUDO_COMMAND_PREFIX: &str = "sudo -u {0}";

/// Settings for wrapping command lines in a privilege escalation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SudoConfig {
    command_prefix: String,
    username: String,
    quote_command: bool,
}

impl SudoConfig {
    /// Create a sudo configuration.
    ///
    /// Fails with [`CmdLineError::InvalidArgument`] when the prefix is blank
    /// or when the template uses `{0}` and the username is empty.
    pub fn new(
        command_prefix: impl Into<String>,
        username: impl Into<String>,
        quote_command: bool,
    ) -> CmdLineResult<Self> {
        let command_prefix = command_prefix.into();
        let username = username.into();

        if command_prefix.trim().is_empty() {
            return Err(CmdLineError::InvalidArgument(
                "sudo command prefix must not be empty".to_string(),
            ));
        }

        if command_prefix.contains(USERNAME_PLACEHOLDER) && username.is_empty() {
            return Err(CmdLineError::InvalidArgument(
                "sudo command prefix needs a username".to_string(),
            ));
        }

        Ok(Self {
            command_prefix,
            username,
            quote_command,
        })
    }

    /// Default `sudo -u <user>` configuration without quoting.
    pub fn for_user(username: impl Into<String>) -> CmdLineResult<Self> {
        Self::new(DEFAULT_SUDO_COMMAND_PREFIX, username, false)
    }

    /// The prefix template.
    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// The user to run commands as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether the original command is passed as one quoted argument.
    pub fn quote_command(&self) -> bool {
        self.quote_command
    }

    /// Prefix tokens with the username substituted.
    ///
    /// The template is split before substitution, so the username always
    /// stays inside one token and is escaped with it.
    pub fn prefix_tokens(&self) -> Vec<String> {
        self.command_prefix
            .split_whitespace()
            .map(|token| token.replace(USERNAME_PLACEHOLDER, &self.username))
            .collect()
    }

    /// Rewrite `cmd` so that it runs with elevated privileges.
    pub fn prefix_with_sudo(&self, cmd: &CmdLine) -> CmdLine {
        let prefix = self.prefix_tokens();
        let mut escalated = CmdLine::build(prefix.iter().cloned());

        if self.quote_command {
            trace!(user = %self.username, "Wrapping command line as one sudo argument");
            return escalated.add_nested(cmd.clone());
        }

        let mut sections = 1;
        for argument in cmd.arguments() {
            escalated.push(argument.clone());
            if argument.is_separator() {
                escalated = escalated.add_arguments(prefix.iter().cloned());
                sections += 1;
            }
        }
        trace!(user = %self.username, sections, "Prefixed pipeline sections with sudo");
        escalated
    }
}
