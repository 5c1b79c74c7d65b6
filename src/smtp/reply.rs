use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A bare reply code, not the leading digit of an enhanced status code.
    static ref REPLY_IN_TEXT: Regex =
        Regex::new(r"(?:\A|[^.0-9])([45][0-5][0-9])(?:[^.0-9]|\z)").unwrap();
}

/// Extract an SMTP reply code (4xx/5xx) from free diagnosis text.
pub fn find(text: &str) -> Option<String> {
    REPLY_IN_TEXT
        .captures(text)
        .map(|caps| caps[1].to_string())
}
