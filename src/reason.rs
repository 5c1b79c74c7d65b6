use lazy_static::lazy_static;
use regex::Regex;

/// Reasons that are ambiguous or retryable enough for the remote-host policy
/// to override (the default allow-list; callers may configure their own).
pub const RETRY_DEFAULTS: &[&str] = &[
    "undefined",
    "onhold",
    "systemerror",
    "securityerror",
    "networkerror",
];

lazy_static! {
    /// Ordered (reason, pattern) table over diagnosis text; first match wins.
    static ref TEXT_RULES: Vec<(&'static str, Regex)> = vec![
        (
            "userunknown",
            Regex::new(concat!(
                r"(?i)user +unknown|unknown +user|no +such +user|",
                r"user +not +found|recipient +address +rejected|",
                r"mailbox +(?:not +found|unavailable|does +not +exist)|",
                r"invalid +recipient|no +mailbox +here"
            ))
            .unwrap()
        ),
        (
            "hostunknown",
            Regex::new(concat!(
                r"(?i)host +unknown|unknown +host|host +not +found|",
                r"name +or +service +not +known|illegal +host/domain +name +found"
            ))
            .unwrap()
        ),
        (
            "mailboxfull",
            Regex::new(r"(?i)mailbox +(?:is +)?full|quota +exceeded|over +quota").unwrap()
        ),
        (
            "norelaying",
            Regex::new(r"(?i)relay(?:ing)? +(?:denied|not +(?:allowed|permitted))|open +relay").unwrap()
        ),
        (
            "spamdetected",
            Regex::new(r"(?i)spam +detected|detected +as +spam|blacklisted +by|blocked +using").unwrap()
        ),
        (
            "expired",
            Regex::new(r"(?i)deferred|connection +timed +out|delivery +time +expired|timed +out +while").unwrap()
        ),
        (
            "filtered",
            Regex::new(r"(?i)content +rejected|message +(?:refused|filtered)|rejected +by +filter").unwrap()
        ),
        (
            "networkerror",
            Regex::new(r"(?i)no +route +to +host|connection +refused|network +is +unreachable").unwrap()
        ),
        (
            "mailererror",
            Regex::new(r"(?i)mailer +error|procmail|maildrop|x-unix|pipe +to +\||command +(?:died|failed)").unwrap()
        ),
        (
            "securityerror",
            Regex::new(r"(?i)authentication +(?:required|fail(?:ed|ure))|insecure +channel").unwrap()
        ),
        (
            "mesgtoobig",
            Regex::new(r"(?i)message +(?:size +)?(?:exceeds|too +(?:big|large))").unwrap()
        ),
    ];
}

/// Status-code subjects that imply a reason when the text says nothing.
const STATUS_RULES: &[(&str, &str)] = &[
    ("1.1", "userunknown"),
    ("1.2", "hostunknown"),
    ("2.2", "mailboxfull"),
    ("2.3", "exceedlimit"),
    ("3.4", "mesgtoobig"),
    ("4.4", "networkerror"),
    ("4.7", "expired"),
    ("7.1", "norelaying"),
];

/// Infer a bounce reason from diagnosis text, falling back to the enhanced
/// status code. `None` when neither carries a recognizable cause.
pub fn infer(diagnosis: &str, status: &str) -> Option<&'static str> {
    if status.starts_with("2.") {
        return Some("delivered");
    }
    for (reason, pattern) in TEXT_RULES.iter() {
        if pattern.is_match(diagnosis) {
            return Some(*reason);
        }
    }
    if status.starts_with('4') || status.starts_with('5') {
        if let Some(subject) = status.get(2..) {
            for (suffix, reason) in STATUS_RULES {
                if subject == *suffix {
                    return Some(*reason);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_text() {
        assert_eq!(
            infer("550 <kijitora@example.org>... User unknown", ""),
            Some("userunknown")
        );
        assert_eq!(
            infer("Deferred: Connection timed out during user open", ""),
            Some("expired")
        );
        assert_eq!(infer("Illegal host/domain name found", ""), Some("hostunknown"));
    }

    #[test]
    fn test_infer_from_status() {
        assert_eq!(infer("no clue in text", "5.2.2"), Some("mailboxfull"));
        assert_eq!(infer("no clue in text", "4.4.7"), Some("expired"));
        assert_eq!(infer("no clue in text", "5.9.9"), None);
    }

    #[test]
    fn test_infer_delivered() {
        assert_eq!(infer("", "2.1.5"), Some("delivered"));
    }

    #[test]
    fn test_infer_nothing() {
        assert_eq!(infer("", ""), None);
    }

    #[test]
    fn test_infer_survives_multibyte_status() {
        // The slice boundary lands inside a multibyte character
        assert_eq!(infer("no clue in text", "4é.7"), None);
        assert_eq!(infer("no clue in text", "5"), None);
    }
}
