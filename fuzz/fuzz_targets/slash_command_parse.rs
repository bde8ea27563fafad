#![no_main]

use bounty_github::command::{parse_slash_command, parse_teammates, SlashCommand};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);

    if let Some(command) = parse_slash_command(&body) {
        assert!(!command.name().is_empty());
        if let SlashCommand::Start { teammates } = command {
            for login in &teammates {
                assert!(!login.is_empty());
                assert!(!login.contains('@'));
            }
        }
    }

    let teammates = parse_teammates(&body);
    for (index, login) in teammates.iter().enumerate() {
        assert!(!teammates[..index]
            .iter()
            .any(|earlier| earlier.eq_ignore_ascii_case(login)));
    }
});
