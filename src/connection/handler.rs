//! Destinations for command output.
//!
//! Backends write stdout and stderr bytes to an [`ExecutionOutputHandler`]
//! as they arrive.

use std::io::{self, Write};

use tracing::info;

use super::CommandResult;

/// Receives the output of a running command.
pub trait ExecutionOutputHandler: Send {
    /// The stdout and stderr sinks.
    fn streams(&mut self) -> (&mut (dyn Write + Send), &mut (dyn Write + Send));
}

/// Buffers all output in memory.
#[derive(Debug, Default, Clone)]
pub struct CapturingOutputHandler {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl CapturingOutputHandler {
    /// Create an empty handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured stdout bytes
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Captured stderr bytes
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Turn the captured output into a [`CommandResult`].
    pub fn into_result(self, exit_code: i32) -> CommandResult {
        let stdout = String::from_utf8_lossy(&self.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&self.stderr).into_owned();
        if exit_code == 0 {
            CommandResult::success(stdout, stderr)
        } else {
            CommandResult::failure(exit_code, stdout, stderr)
        }
    }
}

impl ExecutionOutputHandler for CapturingOutputHandler {
    fn streams(&mut self) -> (&mut (dyn Write + Send), &mut (dyn Write + Send)) {
        (&mut self.stdout, &mut self.stderr)
    }
}

/// Emits every complete output line as a `tracing` event.
#[derive(Debug)]
pub struct LoggingOutputHandler {
    stdout: LineLogger,
    stderr: LineLogger,
}

impl LoggingOutputHandler {
    /// Create a handler that tags lines with `host`
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            stdout: LineLogger::new(host.clone(), "stdout"),
            stderr: LineLogger::new(host, "stderr"),
        }
    }

    /// Log any trailing partial lines.
    pub fn finish(&mut self) {
        self.stdout.emit_remainder();
        self.stderr.emit_remainder();
    }
}

impl ExecutionOutputHandler for LoggingOutputHandler {
    fn streams(&mut self) -> (&mut (dyn Write + Send), &mut (dyn Write + Send)) {
        (&mut self.stdout, &mut self.stderr)
    }
}

impl Drop for LoggingOutputHandler {
    fn drop(&mut self) {
        self.finish();
    }
}

#[derive(Debug)]
struct LineLogger {
    host: String,
    stream: &'static str,
    pending: Vec<u8>,
    lines: usize,
}

impl LineLogger {
    fn new(host: String, stream: &'static str) -> Self {
        Self {
            host,
            stream,
            pending: Vec::new(),
            lines: 0,
        }
    }

    fn emit(&mut self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches('\r');
        self.lines += 1;
        info!(host = %self.host, stream = self.stream, "{}", text);
    }

    fn emit_remainder(&mut self) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest);
        }
    }
}

impl Write for LineLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line[..line.len() - 1]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capturing_handler() {
        let mut handler = CapturingOutputHandler::new();
        {
            let (out, err) = handler.streams();
            out.write_all(b"hello ").unwrap();
            err.write_all(b"oops").unwrap();
            out.write_all(b"world").unwrap();
        }
        assert_eq!(handler.stdout(), b"hello world");

        let result = handler.into_result(2);
        assert!(!result.success);
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.stderr, "oops");
    }

    #[test]
    fn test_line_logger_splits_lines() {
        let mut logger = LineLogger::new("host".into(), "stdout");
        logger.write_all(b"one\r\ntw").unwrap();
        assert_eq!(logger.lines, 1);
        logger.write_all(b"o\nthree").unwrap();
        assert_eq!(logger.lines, 2);
        assert_eq!(logger.pending, b"three");
        logger.emit_remainder();
        assert_eq!(logger.lines, 3);
        assert!(logger.pending.is_empty());
    }
}
