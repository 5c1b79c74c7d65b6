use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Header fields searched, in order, when resolving the original sender.
pub const ADDRESSER_HEADERS: &[&str] = &[
    "from",
    "return-path",
    "reply-to",
    "errors-to",
    "reverse-path",
    "sender",
    "x-postfix-sender",
    "x-originated-from",
    "x-sender",
    "x-envelope-from",
];

/// Header fields searched, in order, when resolving the bounced recipient.
pub const RECIPIENT_HEADERS: &[&str] = &[
    "to",
    "delivered-to",
    "forward-path",
    "x-failed-recipients",
    "x-intended-recipient",
];

/// Date-bearing header fields of the original message, in preference order.
pub const DATE_HEADERS: &[&str] = &["date", "posted-date", "posted", "resent-date"];

lazy_static! {
    static ref EMAIL_LIKE: Regex = Regex::new(r"[^@\s]+@[0-9A-Za-z][0-9A-Za-z.-]*").unwrap();
    static ref RECEIVED_FROM: Regex = Regex::new(r"(?i)\bfrom[ \t]+([^ \t;]+)").unwrap();
    static ref RECEIVED_BY: Regex = Regex::new(r"(?i)\bby[ \t]+([^ \t;]+)").unwrap();
    static ref HEADER_LINE: Regex = Regex::new(r"\A([0-9A-Za-z-]+):[ \t]*(.*)\z").unwrap();
}

/// Loose check that a header value carries something shaped like a mailbox.
pub fn is_email_address(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.len() < 512 && EMAIL_LIKE.is_match(trimmed)
}

/// Pull the sending ("from") and receiving ("by") host names out of one
/// `Received:` header value.
pub fn received(value: &str) -> (Option<String>, Option<String>) {
    let from_host = RECEIVED_FROM
        .captures(value)
        .map(|c| c[1].trim_matches(|ch| ch == '(' || ch == ')').to_string());
    let by_host = RECEIVED_BY
        .captures(value)
        .map(|c| c[1].trim_matches(|ch| ch == '(' || ch == ')').to_string());
    (from_host, by_host)
}

/// Fold the verbatim header lines captured from an original-message block into
/// a map of lowercased field name to value. Continuation lines (leading
/// whitespace) are appended to the previous field; lines that are not header
/// shaped end the block.
pub fn parse_header_block(lines: &[String]) -> HashMap<String, String> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut previous: Option<String> = None;

    for line in lines {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(name) = &previous {
                if let Some(value) = fields.get_mut(name) {
                    value.push(' ');
                    value.push_str(line.trim());
                }
            }
            continue;
        }
        match HEADER_LINE.captures(line) {
            Some(caps) => {
                let name = caps[1].to_lowercase();
                let value = caps[2].trim_end_matches('\r').to_string();
                // Keep the first occurrence; bounced copies occasionally
                // repeat a field and the first one is the original.
                fields.entry(name.clone()).or_insert(value);
                previous = Some(name);
            }
            None => {
                if line.trim().is_empty() {
                    previous = None;
                } else {
                    break;
                }
            }
        }
    }
    fields
}
