pub mod error;
pub mod reply;
pub mod status;

/// SMTP commands a bounce transcript may legitimately echo back.
pub const COMMANDS: &[&str] = &["EHLO", "HELO", "MAIL", "RCPT", "DATA", "QUIT"];

/// True when the value is one of the known SMTP verbs.
pub fn is_command(value: &str) -> bool {
    COMMANDS.contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_command() {
        assert!(is_command("RCPT"));
        assert!(is_command("EHLO"));
        assert!(!is_command("VRFY"));
        assert!(!is_command("rcpt"));
        assert!(!is_command(""));
    }
}
