//! Request documents for the WS-Management remote shell.
//!
//! [`SoapBuilder`] performs no I/O. Every request carries a fresh message id
//! and the shared header fields from [`WinRmOptions`].

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use quick_xml::escape::escape;
use url::Url;
use uuid::Uuid;

use super::{
    action, ns, WinRmError, WinRmOptions, WinRmResult, ANONYMOUS_ADDRESS, RESOURCE_URI_CMD,
    SIGNAL_TERMINATE,
};

/// The protocol steps of a remote shell conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WinRmOperation {
    /// Create a shell
    CreateShell,
    /// Start a command
    Command,
    /// Poll for output
    Receive,
    /// Send stdin
    Send,
    /// Signal a running command
    Signal,
    /// Delete the shell
    Delete,
}

impl WinRmOperation {
    /// The WS-Addressing action URI of this step.
    pub fn action_uri(&self) -> &'static str {
        match self {
            Self::CreateShell => action::CREATE,
            Self::Command => action::COMMAND,
            Self::Receive => action::RECEIVE,
            Self::Send => action::SEND,
            Self::Signal => action::SIGNAL,
            Self::Delete => action::DELETE,
        }
    }
}

impl fmt::Display for WinRmOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateShell => "create shell",
            Self::Command => "command",
            Self::Receive => "receive",
            Self::Send => "send",
            Self::Signal => "signal",
            Self::Delete => "delete shell",
        };
        f.write_str(name)
    }
}

/// A rendered request document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapRequest {
    /// The step this request performs
    pub operation: WinRmOperation,
    /// The XML document
    pub document: String,
}

impl SoapRequest {
    /// Value of the `SOAPAction` HTTP header. Delete requests go without it.
    pub fn soap_action(&self) -> Option<&'static str> {
        match self.operation {
            WinRmOperation::Delete => None,
            operation => Some(operation.action_uri()),
        }
    }
}

/// Builds remote shell requests for one endpoint.
#[derive(Debug, Clone)]
pub struct SoapBuilder {
    target: Url,
    options: WinRmOptions,
}

impl SoapBuilder {
    /// Create a builder addressing `target`, e.g. `http://host:5985/wsman`.
    pub fn new(target: &str, options: WinRmOptions) -> WinRmResult<Self> {
        let target = Url::parse(target).map_err(|e| {
            WinRmError::InvalidConfig(format!("Malformed WinRM endpoint {:?}: {}", target, e))
        })?;
        Ok(Self { target, options })
    }

    /// The endpoint requests are addressed to.
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Protocol settings used in every header.
    pub fn options(&self) -> &WinRmOptions {
        &self.options
    }

    /// Create a `cmd` shell with stdin, stdout and stderr streams.
    pub fn create_shell(&self) -> SoapRequest {
        let options = [
            ("WINRS_NOPROFILE", "FALSE".to_string()),
            ("WINRS_CODEPAGE", self.options.codepage.to_string()),
        ];
        let body = r#"<rsp:Shell>
      <rsp:InputStreams>stdin</rsp:InputStreams>
      <rsp:OutputStreams>stdout stderr</rsp:OutputStreams>
    </rsp:Shell>"#;
        self.request(WinRmOperation::CreateShell, None, &options, body)
    }

    /// Start `command` in the shell. The command is passed as one quoted line.
    pub fn command(&self, shell_id: &str, command: &str) -> SoapRequest {
        let options = [("WINRS_CONSOLEMODE_STDIN", "TRUE".to_string())];
        let body = format!(
            r#"<rsp:CommandLine>
      <rsp:Command>{}</rsp:Command>
    </rsp:CommandLine>"#,
            escape(&format!("\"{}\"", command))
        );
        self.request(WinRmOperation::Command, Some(shell_id), &options, &body)
    }

    /// Poll for stdout and stderr of a running command.
    pub fn receive(&self, shell_id: &str, command_id: &str) -> SoapRequest {
        let body = format!(
            r#"<rsp:Receive>
      <rsp:DesiredStream CommandId="{}">stdout stderr</rsp:DesiredStream>
    </rsp:Receive>"#,
            escape(command_id)
        );
        self.request(WinRmOperation::Receive, Some(shell_id), &[], &body)
    }

    /// Send `data` to the command's stdin. `end` closes the stream.
    pub fn send(&self, shell_id: &str, command_id: &str, data: &[u8], end: bool) -> SoapRequest {
        let end = if end { r#" End="true""# } else { "" };
        let body = format!(
            r#"<rsp:Send>
      <rsp:Stream Name="stdin" CommandId="{}"{}>{}</rsp:Stream>
    </rsp:Send>"#,
            escape(command_id),
            end,
            BASE64_STANDARD.encode(data)
        );
        self.request(WinRmOperation::Send, Some(shell_id), &[], &body)
    }

    /// Terminate a running command.
    pub fn signal(&self, shell_id: &str, command_id: &str) -> SoapRequest {
        let body = format!(
            r#"<rsp:Signal CommandId="{}">
      <rsp:Code>{}</rsp:Code>
    </rsp:Signal>"#,
            escape(command_id),
            SIGNAL_TERMINATE
        );
        self.request(WinRmOperation::Signal, Some(shell_id), &[], &body)
    }

    /// Delete the shell.
    pub fn delete(&self, shell_id: &str) -> SoapRequest {
        self.request(WinRmOperation::Delete, Some(shell_id), &[], "")
    }

    fn request(
        &self,
        operation: WinRmOperation,
        shell_id: Option<&str>,
        options: &[(&str, String)],
        body: &str,
    ) -> SoapRequest {
        let selector = shell_id
            .map(|id| {
                format!(
                    r#"
    <w:SelectorSet>
      <w:Selector Name="ShellId">{}</w:Selector>
    </w:SelectorSet>"#,
                    escape(id)
                )
            })
            .unwrap_or_default();

        let option_set = if options.is_empty() {
            String::new()
        } else {
            let entries: String = options
                .iter()
                .map(|(name, value)| {
                    format!(
                        "\n      <w:Option Name=\"{}\">{}</w:Option>",
                        name,
                        escape(value)
                    )
                })
                .collect();
            format!("\n    <w:OptionSet>{}\n    </w:OptionSet>", entries)
        };

        let body = if body.is_empty() {
            "<env:Body/>".to_string()
        } else {
            format!("<env:Body>\n    {}\n  </env:Body>", body)
        };

        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="{env}" xmlns:a="{a}" xmlns:b="{b}" xmlns:n="{n}" xmlns:x="{x}" xmlns:w="{w}" xmlns:p="{p}" xmlns:xsi="{xsi}" xmlns:rsp="{rsp}" xmlns:f="{f}">
  <env:Header>
    <a:To>{to}</a:To>
    <a:ReplyTo>
      <a:Address env:mustUnderstand="true">{anonymous}</a:Address>
    </a:ReplyTo>
    <w:MaxEnvelopeSize env:mustUnderstand="true">{envelope_size}</w:MaxEnvelopeSize>
    <a:MessageID>uuid:{message_id}</a:MessageID>
    <w:Locale env:mustUnderstand="false" xml:lang="{locale}"/>
    <w:OperationTimeout>{timeout}</w:OperationTimeout>
    <a:Action env:mustUnderstand="true">{action}</a:Action>
    <w:ResourceURI env:mustUnderstand="true">{resource}</w:ResourceURI>{selector}{option_set}
  </env:Header>
  {body}
</env:Envelope>"#,
            env = ns::ENV,
            a = ns::A,
            b = ns::B,
            n = ns::N,
            x = ns::X,
            w = ns::W,
            p = ns::P,
            xsi = ns::XSI,
            rsp = ns::RSP,
            f = ns::F,
            to = escape(self.target.as_str()),
            anonymous = ANONYMOUS_ADDRESS,
            envelope_size = self.options.envelope_size,
            message_id = Uuid::new_v4().to_string().to_uppercase(),
            locale = escape(&self.options.locale),
            timeout = escape(&self.options.timeout),
            action = operation.action_uri(),
            resource = RESOURCE_URI_CMD,
            selector = selector,
            option_set = option_set,
            body = body,
        );

        SoapRequest {
            operation,
            document,
        }
    }
}
