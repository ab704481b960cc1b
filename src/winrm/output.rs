//! Extraction of command output from Receive responses.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use super::xml::XmlElement;
use super::{ns, WinRmError, WinRmOperation, WinRmResult, COMMAND_STATE_DONE};

/// Exit code reported when none could be parsed.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Decode every `rsp:Stream` fragment and write it to the matching sink.
///
/// Fragments are written in document order. Empty fragments and streams
/// other than stdout and stderr are skipped.
pub fn write_streams<O, E>(response: &XmlElement, stdout: &mut O, stderr: &mut E) -> WinRmResult<()>
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    for stream in response.find_all(ns::RSP, "Stream") {
        let encoded = stream.text().trim();
        if encoded.is_empty() {
            continue;
        }

        let to_stdout = match stream.attribute("Name") {
            Some("stdout") => true,
            Some("stderr") => false,
            _ => continue,
        };

        let decoded = BASE64_STANDARD.decode(encoded).map_err(|e| {
            WinRmError::protocol(
                WinRmOperation::Receive,
                format!("undecodable stream fragment: {}", e),
            )
        })?;
        if to_stdout {
            stdout.write_all(&decoded)?;
        } else {
            stderr.write_all(&decoded)?;
        }
    }

    Ok(())
}

/// The exit code carried by the response, if any.
///
/// An `rsp:ExitCode` element that is not an integer yields `-1`.
pub fn exit_code(response: &XmlElement) -> Option<i32> {
    response
        .find(ns::RSP, "ExitCode")
        .map(|element| element.text().trim().parse().unwrap_or(UNKNOWN_EXIT_CODE))
}

/// Whether the response reports the command as finished.
pub fn is_done(response: &XmlElement) -> bool {
    response
        .find_all(ns::RSP, "CommandState")
        .into_iter()
        .any(|state| state.attribute("State") == Some(COMMAND_STATE_DONE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(body: &str) -> XmlElement {
        XmlElement::parse(&format!(
            r#"<s:Envelope xmlns:s="{}" xmlns:rsp="{}"><s:Body><rsp:ReceiveResponse>{}</rsp:ReceiveResponse></s:Body></s:Envelope>"#,
            ns::ENV,
            ns::RSP,
            body
        ))
        .unwrap()
    }

    #[test]
    fn test_streams_routed_in_order() {
        // "he" "err" "llo"
        let doc = response(
            r#"<rsp:Stream Name="stdout">aGU=</rsp:Stream>
               <rsp:Stream Name="stderr">ZXJy</rsp:Stream>
               <rsp:Stream Name="stdout"></rsp:Stream>
               <rsp:Stream Name="stdout">bGxv</rsp:Stream>"#,
        );
        let (mut out, mut err) = (Vec::new(), Vec::new());
        write_streams(&doc, &mut out, &mut err).unwrap();
        assert_eq!(out, b"hello");
        assert_eq!(err, b"err");
    }

    #[test]
    fn test_undecodable_fragment() {
        let doc = response(r#"<rsp:Stream Name="stdout">@@@</rsp:Stream>"#);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = write_streams(&doc, &mut out, &mut err);
        assert!(matches!(
            result,
            Err(WinRmError::Protocol {
                operation: WinRmOperation::Receive,
                ..
            })
        ));
    }

    #[test]
    fn test_exit_code_parsing() {
        assert_eq!(exit_code(&response("<rsp:ExitCode>3</rsp:ExitCode>")), Some(3));
        assert_eq!(exit_code(&response("<rsp:ExitCode>x</rsp:ExitCode>")), Some(-1));
        assert_eq!(exit_code(&response("")), None);
    }

    #[test]
    fn test_done_detection() {
        let done = format!(r#"<rsp:CommandState State="{}"/>"#, COMMAND_STATE_DONE);
        assert!(is_done(&response(&done)));
        assert!(!is_done(&response(
            r#"<rsp:CommandState State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Running"/>"#
        )));
        assert!(!is_done(&response("")));
    }
}
