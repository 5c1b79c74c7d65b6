use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Sentinel appended by the message loader to mark the end of the email body.
pub const END_OF_EMAIL: &str = "__END_OF_EMAIL_MESSAGE__";

/// Collapse whitespace runs, trim the edges and drop the end-of-message
/// sentinel together with anything after it.
pub fn sweep(text: &str) -> String {
    let mut cleaned = text.replace('\t', " ");
    if let Some(pos) = cleaned.find(END_OF_EMAIL) {
        cleaned.truncate(pos);
    }
    let swept: Vec<&str> = cleaned.split_whitespace().collect();
    swept.join(" ")
}

/// Deterministic fingerprint of an (addresser, recipient, timestamp) triple.
/// Identical triples always collide, which callers use for de-duplication.
pub fn token(addresser: &str, recipient: &str, epoch: i64) -> String {
    if addresser.is_empty() || recipient.is_empty() {
        return String::new();
    }
    let mut hasher = DefaultHasher::new();
    addresser.hash(&mut hasher);
    recipient.hash(&mut hasher);
    epoch.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_collapses_whitespace() {
        assert_eq!(sweep("  User   unknown\t "), "User unknown");
    }

    #[test]
    fn test_sweep_strips_sentinel() {
        let text = format!("550 User unknown {}", END_OF_EMAIL);
        assert_eq!(sweep(&text), "550 User unknown");
    }

    #[test]
    fn test_token_is_deterministic() {
        let a = token("neko@example.jp", "kijitora@example.org", 1393416348);
        let b = token("neko@example.jp", "kijitora@example.org", 1393416348);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let c = token("neko@example.jp", "kijitora@example.org", 1393416349);
        assert_ne!(a, c);
    }

    #[test]
    fn test_token_empty_input() {
        assert_eq!(token("", "kijitora@example.org", 0), "");
    }
}
