use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // Display-name forms like: Neko <neko@example.jp>
    static ref ANGLE_ADDR: Regex = Regex::new(r"<([^<>\s]+@[^<>\s]+)>").unwrap();
    static ref MAILBOX: Regex = Regex::new(r"\A([^@\s]+)@([0-9A-Za-z][0-9A-Za-z.-]*)\z").unwrap();
}

/// A validated email address split into its local part and domain.
///
/// Construction goes through [`Address::parse`], which returns `None` for
/// input that cannot be reduced to a `user@host` mailbox. Code downstream can
/// therefore rely on every `Address` value being non-void.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub user: String,
    pub host: String,
    pub address: String,
}

impl Address {
    /// Parse a mailbox string, tolerating display names, angle brackets,
    /// surrounding quotes and a trailing dot.
    pub fn parse(value: &str) -> Option<Address> {
        let cleaned = Self::undress(value);
        let caps = MAILBOX.captures(&cleaned)?;
        let user = caps.get(1)?.as_str().to_string();
        let host = caps.get(2)?.as_str().trim_end_matches('.').to_lowercase();
        if host.is_empty() {
            return None;
        }
        let address = format!("{}@{}", user, host);
        Some(Address {
            user,
            host,
            address,
        })
    }

    /// Strip display names, comments and decoration down to a bare mailbox
    /// candidate. Mirrors the s3s4 cleanup used by scanners on values like
    /// `"Neko, Nyaan" <neko@example.jp>` or `<neko@example.jp>.`.
    pub fn undress(value: &str) -> String {
        let trimmed = value.trim();
        if let Some(caps) = ANGLE_ADDR.captures(trimmed) {
            return caps[1].to_string();
        }
        trimmed
            .trim_matches(|c| c == '<' || c == '>' || c == '"' || c == '\'' || c == ',')
            .trim_end_matches('.')
            .trim()
            .to_string()
    }

    /// The domain part, used for sender/destination domain fields.
    pub fn domain(&self) -> &str {
        &self.host
    }
}
