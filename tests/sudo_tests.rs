//! Tests for sudo wrapping of command lines.

use pretty_assertions::assert_eq;

use hostbridge::cmdline::{CmdLine, CmdLineArgument, CmdLineError, SudoConfig};
use hostbridge::os::OperatingSystemFamily;

fn pipeline() -> CmdLine {
    CmdLine::build(["a"]).add_raw("|").add_argument("b")
}

#[test]
fn test_every_pipeline_section_is_prefixed() {
    let config = SudoConfig::for_user("root").unwrap();
    let escalated = config.prefix_with_sudo(&pipeline());

    let tokens = escalated
        .to_argument_array(OperatingSystemFamily::Unix)
        .unwrap();
    assert_eq!(tokens.len(), 9);
    assert_eq!(tokens[0], "sudo");
    assert_eq!(tokens[5], "sudo");
    assert_eq!(
        escalated
            .to_command_line(OperatingSystemFamily::Unix, false)
            .unwrap(),
        "sudo -u root a | sudo -u root b"
    );
}

#[test]
fn test_quoted_command_is_one_argument() {
    let config = SudoConfig::new("sudo -u {0}", "root", true).unwrap();
    let escalated = config.prefix_with_sudo(&pipeline());

    assert_eq!(escalated.len(), 4);
    assert!(matches!(
        escalated.arguments()[3],
        CmdLineArgument::Nested(_)
    ));
    assert_eq!(
        escalated
            .to_command_line(OperatingSystemFamily::Unix, false)
            .unwrap(),
        "sudo -u root a\\ \\|\\ b"
    );
}

#[test]
fn test_original_command_line_untouched() {
    let config = SudoConfig::for_user("deploy").unwrap();
    let original = pipeline();
    let before = original.clone();
    let _ = config.prefix_with_sudo(&original);
    assert_eq!(original, before);
}

#[test]
fn test_passwords_stay_masked_after_wrapping() {
    let config = SudoConfig::new("sudo -u {0}", "root", true).unwrap();
    let cmd = CmdLine::build(["mysql", "-p"]).add_password("hunter2");
    let rendered = config
        .prefix_with_sudo(&cmd)
        .to_command_line(OperatingSystemFamily::Unix, true)
        .unwrap();
    assert!(!rendered.contains("hunter2"), "{rendered}");
    assert!(rendered.starts_with("sudo -u root "));
}

#[test]
fn test_custom_prefix_template() {
    let config = SudoConfig::new("pfexec -P {0} --", "oper", false).unwrap();
    assert_eq!(config.prefix_tokens(), vec!["pfexec", "-P", "oper", "--"]);
    assert_eq!(config.username(), "oper");
    assert!(!config.quote_command());
}

#[test]
fn test_dotted_and_capitalized_usernames() {
    let config = SudoConfig::for_user("john.doe").unwrap();
    assert_eq!(
        config
            .prefix_with_sudo(&CmdLine::build(["systemctl", "restart", "app"]))
            .to_command_line(OperatingSystemFamily::Unix, false)
            .unwrap(),
        "sudo -u john.doe systemctl restart app"
    );

    let config = SudoConfig::for_user("Administrator").unwrap();
    assert_eq!(config.prefix_tokens(), vec!["sudo", "-u", "Administrator"]);
}

#[test]
fn test_metacharacters_in_username_stay_escaped() {
    let config = SudoConfig::new("sudo -u {0}", "root;id", false).unwrap();
    let escalated = config.prefix_with_sudo(&CmdLine::build(["whoami"]));
    assert_eq!(
        escalated
            .to_argument_array(OperatingSystemFamily::Unix)
            .unwrap(),
        vec!["sudo", "-u", "root\\;id", "whoami"]
    );
}

#[test]
fn test_empty_username_rejected() {
    assert!(matches!(
        SudoConfig::new("sudo -u {0}", "", false),
        Err(CmdLineError::InvalidArgument(_))
    ));
}

#[test]
fn test_username_ignored_without_placeholder() {
    let config = SudoConfig::new("doas", "anything goes", false).unwrap();
    let escalated = config.prefix_with_sudo(&CmdLine::build(["whoami"]));
    assert_eq!(
        escalated
            .to_command_line(OperatingSystemFamily::Unix, false)
            .unwrap(),
        "doas whoami"
    );
}
