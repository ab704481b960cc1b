//! hostbridge - run a command line on a local, Docker or WinRM host
//!
//! This is the main entry point for the hostbridge CLI.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use hostbridge::cmdline::CmdLine;
use hostbridge::connection::{
    connect, ConnectionConfig, ExecuteOptions, ExecutionOutputHandler, SudoSettings,
};
use hostbridge::logging::{init_logging, LogFormat, LoggingConfig};

/// Run a command line on a local, Docker or WinRM host
#[derive(Parser, Debug, Clone)]
#[command(name = "hostbridge")]
#[command(version)]
#[command(about = "Run a command line on a local, Docker or WinRM host", long_about = None)]
struct Cli {
    /// Path to the host configuration file (runs locally when omitted)
    #[arg(short = 'c', long, env = "HOSTBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormatArg,

    /// Working directory on the host
    #[arg(long)]
    cwd: Option<String>,

    /// Environment variables (KEY=VALUE)
    #[arg(short = 'e', long = "env", value_parser = parse_key_val)]
    env: Vec<(String, String)>,

    /// Timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Run the command as this user via sudo
    #[arg(long)]
    sudo_user: Option<String>,

    /// Pass the command to sudo as one quoted argument
    #[arg(long, requires = "sudo_user")]
    quote: bool,

    /// Command and arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))?;
    Ok((key.to_string(), value.to_string()))
}

/// Streams command output to the terminal as it arrives.
struct TerminalOutput {
    stdout: io::Stdout,
    stderr: io::Stderr,
}

impl ExecutionOutputHandler for TerminalOutput {
    fn streams(&mut self) -> (&mut (dyn Write + Send), &mut (dyn Write + Send)) {
        (&mut self.stdout, &mut self.stderr)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let logging = LoggingConfig::from_verbosity(cli.verbose).with_format(cli.log_format.into());
    init_logging(&logging)?;

    let mut config = match &cli.config {
        Some(path) => ConnectionConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ConnectionConfig::local(),
    };
    if let Some(user) = &cli.sudo_user {
        config.sudo = Some(SudoSettings {
            quote_command: cli.quote,
            ..SudoSettings::for_user(user)
        });
    }

    let connection = connect(&config)?;

    let mut options = ExecuteOptions::new();
    options.cwd = cli.cwd.clone();
    options.timeout = cli.timeout;
    options.env.extend(cli.env.iter().cloned());

    let command = CmdLine::build(&cli.command);
    let mut output = TerminalOutput {
        stdout: io::stdout(),
        stderr: io::stderr(),
    };
    let exit_code = connection
        .execute(&command, Some(options), &mut output)
        .await
        .with_context(|| format!("Failed to run {} on {}", command, connection.identifier()))?;

    output.stdout.flush()?;
    output.stderr.flush()?;
    connection.close().await?;

    std::process::exit(exit_code);
}
