//! Argument escaping rules per operating system family.

use crate::os::OperatingSystemFamily;

/// Characters that a POSIX shell would interpret and that must be
/// backslash-escaped.
const UNIX_SPECIAL_CHARS: &[char] = &[
    ' ', '\'', '"', '\\', ';', '(', ')', '&', '$', '{', '}', '*', '?', '|', '<', '>', '\n', '\r',
    '\t',
];

/// Escape a single argument for the given family.
pub fn encode_argument(argument: &str, os: OperatingSystemFamily) -> String {
    match os {
        OperatingSystemFamily::Windows => encode_windows_argument(argument),
        OperatingSystemFamily::Unix | OperatingSystemFamily::Zos => encode_unix_argument(argument),
    }
}

/// Escape an argument for `cmd.exe`.
///
/// Arguments that are empty or contain a space or a double quote are wrapped
/// in double quotes with embedded double quotes doubled. Anything else is
/// returned unchanged.
pub fn encode_windows_argument(argument: &str) -> String {
    let needs_quoting = argument.is_empty() || argument.contains(' ') || argument.contains('"');
    if !needs_quoting {
        return argument.to_string();
    }

    let mut encoded = String::with_capacity(argument.len() + 2);
    encoded.push('"');
    for c in argument.chars() {
        if c == '"' {
            encoded.push('"');
        }
        encoded.push(c);
    }
    encoded.push('"');
    encoded
}

/// Escape an argument for a POSIX shell.
///
/// An empty argument becomes `""`; otherwise every shell metacharacter is
/// prefixed with a backslash.
pub fn encode_unix_argument(argument: &str) -> String {
    if argument.is_empty() {
        return "\"\"".to_string();
    }

    let mut encoded = String::with_capacity(argument.len() * 2);
    for c in argument.chars() {
        if UNIX_SPECIAL_CHARS.contains(&c) {
            encoded.push('\\');
        }
        encoded.push(c);
    }
    encoded
}
