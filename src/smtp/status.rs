use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DSN_IN_TEXT: Regex =
        Regex::new(r"\b([45])[.](\d{1,3})[.](\d{1,3})\b").unwrap();
}

/// Pseudo status codes per bounce reason, (permanent, temporary).
const CODE_TABLE: &[(&str, &str, &str)] = &[
    ("userunknown", "5.1.1", "4.1.1"),
    ("hostunknown", "5.1.2", "4.1.2"),
    ("rejected", "5.1.8", "4.1.8"),
    ("filtered", "5.2.0", "4.2.0"),
    ("suspend", "5.2.1", "4.2.1"),
    ("mailboxfull", "5.2.2", "4.2.2"),
    ("exceedlimit", "5.2.3", "4.2.3"),
    ("mesgtoobig", "5.3.4", "4.3.4"),
    ("systemerror", "5.3.5", "4.3.5"),
    ("mailererror", "5.3.5", "4.3.5"),
    ("networkerror", "5.4.4", "4.4.4"),
    ("expired", "5.4.7", "4.4.7"),
    ("securityerror", "5.7.0", "4.7.0"),
    ("norelaying", "5.7.1", "4.7.1"),
    ("blocked", "5.7.1", "4.7.1"),
    ("spamdetected", "5.7.9", "4.7.9"),
    ("undefined", "5.0.0", "4.0.0"),
    ("onhold", "5.0.0", "4.0.0"),
];

/// Extract an embedded enhanced status code (`class.subject.detail`) from
/// free diagnosis text. Only transient/permanent classes count and the
/// subject/detail fields must be non-zero.
pub fn find(text: &str) -> Option<String> {
    for caps in DSN_IN_TEXT.captures_iter(text) {
        let subject: u16 = caps[2].parse().ok()?;
        let detail: u16 = caps[3].parse().ok()?;
        if subject == 0 || detail == 0 {
            continue;
        }
        return Some(format!("{}.{}.{}", &caps[1], subject, detail));
    }
    None
}

/// Synthesize a pseudo status code from a reason and a permanence guess,
/// used when a record carries no DSN value of its own.
pub fn code(reason: &str, temporary: bool) -> Option<&'static str> {
    CODE_TABLE
        .iter()
        .find(|(name, _, _)| *name == reason)
        .map(|(_, hard, soft)| if temporary { *soft } else { *hard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_diagnosis() {
        assert_eq!(
            find("550 5.1.1 <kijitora@example.jp>... User Unknown"),
            Some("5.1.1".to_string())
        );
        assert_eq!(find("smtp; 450 4.2.2 Mailbox full"), Some("4.2.2".to_string()));
    }

    #[test]
    fn test_find_skips_zero_fields() {
        assert_eq!(find("250 2.1.5 Ok"), None);
        assert_eq!(find("554 5.0.0 rejected"), None);
        assert_eq!(find("no code here"), None);
    }

    #[test]
    fn test_pseudo_code() {
        assert_eq!(code("expired", true), Some("4.4.7"));
        assert_eq!(code("userunknown", false), Some("5.1.1"));
        assert_eq!(code("nosuchreason", false), None);
    }
}
