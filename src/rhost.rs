use lazy_static::lazy_static;
use regex::Regex;

struct HostPolicy {
    suffixes: &'static [&'static str],
    rules: Vec<(&'static str, Regex)>,
}

lazy_static! {
    /// Per-provider override tables, consulted before generic inference.
    static ref POLICIES: Vec<HostPolicy> = vec![
        HostPolicy {
            suffixes: &["aspmx.l.google.com", ".googlemail.com"],
            rules: vec![
                (
                    "userunknown",
                    Regex::new(r"(?i)account +that +you +tried +to +reach +does +not +exist").unwrap()
                ),
                (
                    "suspend",
                    Regex::new(r"(?i)account +(?:has +been +|is +)?disabled").unwrap()
                ),
                (
                    "mailboxfull",
                    Regex::new(r"(?i)over +quota|quota +exceeded").unwrap()
                ),
            ],
        },
        HostPolicy {
            suffixes: &[".protection.outlook.com", ".prod.outlook.com"],
            rules: vec![
                (
                    "userunknown",
                    Regex::new(r"(?i)RecipientNotFound|recipient +not +found").unwrap()
                ),
                (
                    "securityerror",
                    Regex::new(r"(?i)AccessDenied|access +denied").unwrap()
                ),
                (
                    "blocked",
                    Regex::new(r"(?i)QS262|client +host +.+ +blocked").unwrap()
                ),
            ],
        },
    ];
}

fn policy_for(rhost: &str) -> Option<&'static HostPolicy> {
    if rhost.is_empty() {
        return None;
    }
    let lowered = rhost.to_lowercase();
    POLICIES.iter().find(|policy| {
        policy
            .suffixes
            .iter()
            .any(|s| lowered == s.trim_start_matches('.') || lowered.ends_with(s))
    })
}

/// True when a host-specific override table exists for this remote host.
pub fn match_host(rhost: &str) -> bool {
    policy_for(rhost).is_some()
}

/// Host-specific bounce reason for the diagnosis text, if the remote host has
/// an override table and one of its rules matches.
pub fn find(rhost: &str, diagnosis: &str) -> Option<&'static str> {
    let policy = policy_for(rhost)?;
    policy
        .rules
        .iter()
        .find(|(_, pattern)| pattern.is_match(diagnosis))
        .map(|(reason, _)| *reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_host() {
        assert!(match_host("aspmx.l.google.com"));
        assert!(match_host("xxx-mail.protection.outlook.com"));
        assert!(!match_host("mx.example.jp"));
        assert!(!match_host(""));
    }

    #[test]
    fn test_find_override() {
        assert_eq!(
            find(
                "aspmx.l.google.com",
                "550-5.1.1 The email account that you tried to reach does not exist."
            ),
            Some("userunknown")
        );
        assert_eq!(
            find("mail.protection.outlook.com", "550 5.7.1 AccessDenied"),
            Some("securityerror")
        );
        assert_eq!(find("aspmx.l.google.com", "something else entirely"), None);
        assert_eq!(find("mx.example.jp", "over quota"), None);
    }
}
