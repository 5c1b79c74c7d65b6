use crate::bounce::SoftBounce;
use crate::smtp::{reply, status};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TEMPORARY_TEXT: Regex = Regex::new(r"(?i)temporar|persistent").unwrap();
    static ref PERMANENT_TEXT: Regex = Regex::new(r"(?i)permanent").unwrap();
}

/// Reasons whose bounces are permanent regardless of the status code.
const HARD_REASONS: &[&str] = &["hasmoved", "hostunknown", "userunknown"];

/// Reasons that describe a transient condition.
const SOFT_REASONS: &[&str] = &["mailboxfull", "spamdetected", "expired", "suspend"];

/// Guess whether an error text describes a permanent failure: a 5xx status or
/// reply code wins, then textual hints. `None` when nothing in the text says.
pub fn is_permanent(text: &str) -> Option<bool> {
    let code = status::find(text).or_else(|| reply::find(text));
    if let Some(value) = code {
        return match value.chars().next() {
            Some('5') => Some(true),
            Some('4') => Some(false),
            _ => None,
        };
    }
    if TEMPORARY_TEXT.is_match(text) {
        return Some(false);
    }
    if PERMANENT_TEXT.is_match(text) {
        return Some(true);
    }
    None
}

/// Classify a bounce as soft or hard from its reason and error text.
/// Indeterminate combinations yield `None` and the caller keeps `Unknown`.
pub fn soft_or_hard(reason: &str, text: &str) -> Option<SoftBounce> {
    if reason.is_empty() {
        return None;
    }
    if HARD_REASONS.contains(&reason) {
        return Some(SoftBounce::Hard);
    }
    if SOFT_REASONS.contains(&reason) {
        return Some(SoftBounce::Soft);
    }
    if reason == "notaccept" {
        // Depends on the code the remote host replied with
        return match is_permanent(text) {
            Some(true) => Some(SoftBounce::Hard),
            Some(false) => Some(SoftBounce::Soft),
            None => Some(SoftBounce::Hard),
        };
    }
    match is_permanent(text) {
        Some(true) => Some(SoftBounce::Hard),
        Some(false) => Some(SoftBounce::Soft),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_permanent() {
        assert_eq!(is_permanent("550 5.1.1 User unknown"), Some(true));
        assert_eq!(is_permanent("421 Deferred: Connection timed out"), Some(false));
        assert_eq!(is_permanent("Persistent transient failure"), Some(false));
        assert_eq!(is_permanent("permanent fatal error"), Some(true));
        assert_eq!(is_permanent("no hints at all"), None);
    }

    #[test]
    fn test_soft_or_hard_by_reason() {
        assert_eq!(soft_or_hard("userunknown", ""), Some(SoftBounce::Hard));
        assert_eq!(soft_or_hard("mailboxfull", ""), Some(SoftBounce::Soft));
        assert_eq!(soft_or_hard("", "550 whatever"), None);
    }

    #[test]
    fn test_soft_or_hard_by_code() {
        assert_eq!(
            soft_or_hard("undefined", "450 4.2.2 try again"),
            Some(SoftBounce::Soft)
        );
        assert_eq!(
            soft_or_hard("norelaying", "553 5.3.5 system config error"),
            Some(SoftBounce::Hard)
        );
        assert_eq!(soft_or_hard("undefined", "nothing to go on"), None);
    }
}
