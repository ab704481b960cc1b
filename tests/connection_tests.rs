//! Tests for the connection layer
//!
//! These tests verify:
//! - LocalConnection - escaping, working directory, environment, stdin
//! - Privilege escalation wrapping on local command lines
//! - Output handlers
//! - Backend selection through `connect`

use pretty_assertions::assert_eq;

use hostbridge::cmdline::{CmdLine, CmdLineError, SudoConfig};
use hostbridge::connection::{
    connect, CapturingOutputHandler, CommandResult, Connection, ConnectionConfig, ConnectionError,
    ExecuteOptions, LocalConnection, LoggingOutputHandler,
};

// ============================================================================
// CommandResult Tests
// ============================================================================

#[test]
fn test_command_result_success() {
    let result = CommandResult::success("output data".to_string(), String::new());
    assert!(result.success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "output data");
}

#[test]
fn test_command_result_failure() {
    let result = CommandResult::failure(127, String::new(), "not found".to_string());
    assert!(!result.success);
    assert_eq!(result.exit_code, 127);
    assert_eq!(result.stderr, "not found");
}

// ============================================================================
// LocalConnection Tests
// ============================================================================

#[cfg(unix)]
mod local {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_arguments_reach_the_process_verbatim() {
        let conn = LocalConnection::new();
        let cmd = CmdLine::build(["echo", "a  b", "$HOME", "it's", "x;y"]);
        let result = conn.execute_captured(&cmd, None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.stdout, "a  b $HOME it's x;y\n");
    }

    #[tokio::test]
    async fn test_raw_pipe_is_interpreted() {
        let conn = LocalConnection::new();
        let cmd = CmdLine::build(["echo", "hi"])
            .add_raw("|")
            .add_arguments(["tr", "a-z", "A-Z"]);
        let result = conn.execute_captured(&cmd, None).await.unwrap();
        assert_eq!(result.stdout, "HI\n");
    }

    #[tokio::test]
    async fn test_password_is_passed_unmasked() {
        let conn = LocalConnection::new();
        let cmd = CmdLine::build(["echo"]).add_password("s3cret");
        let result = conn.execute_captured(&cmd, None).await.unwrap();
        assert_eq!(result.stdout, "s3cret\n");
    }

    #[tokio::test]
    async fn test_nested_command_line() {
        let conn = LocalConnection::new();
        let inner = CmdLine::build(["echo"])
            .add_raw("$GREETING")
            .add_argument("there");
        let cmd = CmdLine::build(["sh", "-c"]).add_nested(inner);
        let options = ExecuteOptions::new().with_env("GREETING", "hello");
        let result = conn.execute_captured(&cmd, Some(options)).await.unwrap();
        assert_eq!(result.stdout, "hello there\n");
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();
        let conn = LocalConnection::new();
        let options = ExecuteOptions::new().with_cwd(expected.to_string_lossy());
        let result = conn
            .execute_captured(&CmdLine::build(["pwd", "-P"]), Some(options))
            .await
            .unwrap();
        assert_eq!(result.stdout.trim_end(), expected.to_string_lossy());
    }

    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let conn = LocalConnection::new();
        let options = ExecuteOptions::new().with_stdin("b\na\n");
        let result = conn
            .execute_captured(&CmdLine::build(["sort"]), Some(options))
            .await
            .unwrap();
        assert_eq!(result.stdout, "a\nb\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let conn = LocalConnection::new();
        let result = conn
            .execute_captured(&CmdLine::build(["false"]), None)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_every_section_is_escalated() {
        let sudo = SudoConfig::new("env SECTION=on", "", false).unwrap();
        let conn = LocalConnection::new().with_sudo(sudo);
        let cmd = CmdLine::build(["printenv", "SECTION"])
            .add_raw(";")
            .add_arguments(["printenv", "SECTION"]);
        let result = conn.execute_captured(&cmd, None).await.unwrap();
        assert_eq!(result.stdout, "on\non\n");
    }

    #[tokio::test]
    async fn test_logging_handler_receives_output() {
        let conn = LocalConnection::with_identifier("control");
        let mut handler = LoggingOutputHandler::new(conn.identifier());
        let exit_code = conn
            .execute(&CmdLine::build(["printf", "one\\ntwo"]), None, &mut handler)
            .await
            .unwrap();
        handler.finish();
        assert_eq!(exit_code, 0);
    }

    #[tokio::test]
    async fn test_connect_local() {
        let conn = connect(&ConnectionConfig::local()).unwrap();
        assert!(conn.is_alive().await);
        let mut handler = CapturingOutputHandler::new();
        let exit_code = conn
            .execute(&CmdLine::build(["echo", "via connect"]), None, &mut handler)
            .await
            .unwrap();
        assert_eq!(exit_code, 0);
        assert_eq!(handler.stdout(), b"via connect\n");
        conn.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_empty_command_line_is_rejected() {
    let conn = LocalConnection::new();
    let result = conn.execute_captured(&CmdLine::new(), None).await;
    assert!(matches!(
        result,
        Err(ConnectionError::CommandLine(CmdLineError::EmptyCommandLine))
    ));
}
