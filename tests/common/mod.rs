//! Shared test utilities and fixtures for the hostbridge test suite.
//!
//! This module provides:
//! - A scripted [`HttpConnector`] that replays canned responses and records
//!   every request it receives
//! - Builders for WS-Management response documents
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use hostbridge::winrm::xml::XmlElement;
use hostbridge::winrm::{
    ns, HttpConnector, SoapBuilder, WinRmError, WinRmOptions, WinRmResult, WinRmShellSession,
    COMMAND_STATE_DONE,
};

pub const TEST_ENDPOINT: &str = "http://winhost:5985/wsman";

// ============================================================================
// Scripted connector
// ============================================================================

/// A request seen by [`ScriptedConnector`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub document: String,
    pub soap_action: Option<String>,
}

impl RecordedRequest {
    pub fn parsed(&self) -> XmlElement {
        XmlElement::parse(&self.document).expect("request is well-formed XML")
    }

    pub fn action(&self) -> String {
        self.parsed()
            .find(ns::A, "Action")
            .map(|a| a.text().to_string())
            .unwrap_or_default()
    }
}

/// Replays queued responses in order. Once the queue is empty every request
/// fails with a transport error.
#[derive(Default)]
pub struct ScriptedConnector {
    responses: Mutex<VecDeque<WinRmResult<String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_responses<I>(responses: I) -> Arc<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let connector = Self::default();
        connector
            .responses
            .lock()
            .unwrap()
            .extend(responses.into_iter().map(Ok));
        Arc::new(connector)
    }

    pub fn push(&self, response: String) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_failure(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(WinRmError::Transport(message.to_string())));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.requests().iter().map(RecordedRequest::action).collect()
    }
}

#[async_trait]
impl HttpConnector for ScriptedConnector {
    async fn send(&self, request: &str, soap_action: Option<&str>) -> WinRmResult<String> {
        self.requests.lock().unwrap().push(RecordedRequest {
            document: request.to_string(),
            soap_action: soap_action.map(str::to_string),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WinRmError::Transport("no scripted response".to_string())))
    }
}

pub fn builder() -> SoapBuilder {
    SoapBuilder::new(TEST_ENDPOINT, WinRmOptions::default()).expect("valid endpoint")
}

pub fn session(connector: Arc<ScriptedConnector>) -> WinRmShellSession {
    WinRmShellSession::new(connector, builder())
}

// ============================================================================
// Response fixtures
// ============================================================================

fn envelope(header: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="{}" xmlns:a="{}" xmlns:w="{}" xmlns:rsp="{}">
  <s:Header>{}</s:Header>
  <s:Body>{}</s:Body>
</s:Envelope>"#,
        ns::ENV,
        ns::A,
        ns::W,
        ns::RSP,
        header,
        body
    )
}

/// CreateShell response carrying the id in the selector set.
pub fn shell_created(shell_id: &str) -> String {
    envelope(
        &format!(
            r#"<w:SelectorSet><w:Selector Name="ShellId">{}</w:Selector></w:SelectorSet>"#,
            shell_id
        ),
        r#"<x:ResourceCreated xmlns:x="http://schemas.xmlsoap.org/ws/2004/09/transfer"/>"#,
    )
}

/// CreateShell response carrying the id only in the shell body.
pub fn shell_created_in_body(shell_id: &str) -> String {
    envelope(
        "",
        &format!("<rsp:Shell><rsp:ShellId>{}</rsp:ShellId></rsp:Shell>", shell_id),
    )
}

pub fn command_started(command_id: &str) -> String {
    envelope(
        "",
        &format!(
            "<rsp:CommandResponse><rsp:CommandId>{}</rsp:CommandId></rsp:CommandResponse>",
            command_id
        ),
    )
}

/// Receive response with the given stream fragments; `done` adds the
/// terminal command state with that exit code.
pub fn received(command_id: &str, streams: &[(&str, &str)], done: Option<i32>) -> String {
    let mut body = String::from("<rsp:ReceiveResponse>");
    for (name, data) in streams {
        body.push_str(&format!(
            r#"<rsp:Stream Name="{}" CommandId="{}">{}</rsp:Stream>"#,
            name,
            command_id,
            BASE64_STANDARD.encode(data)
        ));
    }
    match done {
        Some(code) => body.push_str(&format!(
            r#"<rsp:CommandState CommandId="{}" State="{}"><rsp:ExitCode>{}</rsp:ExitCode></rsp:CommandState>"#,
            command_id, COMMAND_STATE_DONE, code
        )),
        None => body.push_str(&format!(
            r#"<rsp:CommandState CommandId="{}" State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Running"/>"#,
            command_id
        )),
    }
    body.push_str("</rsp:ReceiveResponse>");
    envelope("", &body)
}

/// Response without meaningful content (Send, Signal, Delete).
pub fn empty_response() -> String {
    envelope("", "")
}
