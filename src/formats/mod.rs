pub mod messaging_server;
pub mod v5sendmail;

use crate::record::{MailHeaders, ScanResult};

/// Position of the scan inside a bounce body. Transitions are forward-only:
/// a module never drops back to an earlier section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    BeforeStatus,
    InStatus,
    InOriginalMessage,
}

/// One vendor dialect: a cheap header predicate plus a line-oriented scanner.
///
/// `matches` may be optimistic; `scan` makes the final call and returns `None`
/// for anything it cannot extract at least one recipient from. Neither method
/// mutates shared state, so modules can run concurrently over one message.
pub trait FormatModule: Send + Sync {
    /// Human-readable label for the dialect.
    fn description(&self) -> &'static str;

    /// Identifier stamped into every record this module produces.
    fn format_id(&self) -> &'static str;

    /// Cheap predicate over the bounce message's headers.
    fn matches(&self, headers: &MailHeaders) -> bool;

    /// Run the dialect's state machine over the body.
    fn scan(&self, headers: &MailHeaders, body: &str) -> Option<ScanResult>;
}

/// Every format module this crate ships, in match priority order.
pub fn default_modules() -> Vec<Box<dyn FormatModule>> {
    vec![
        Box::new(messaging_server::MessagingServer),
        Box::new(v5sendmail::V5sendmail),
    ]
}

/// Simple first-match dispatch over a module list.
pub fn scan_any(
    modules: &[Box<dyn FormatModule>],
    headers: &MailHeaders,
    body: &str,
) -> Option<(&'static str, ScanResult)> {
    for module in modules {
        if !module.matches(headers) {
            continue;
        }
        log::debug!("trying format module: {}", module.description());
        if let Some(result) = module.scan(headers, body) {
            return Some((module.format_id(), result));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_ordering_is_forward() {
        assert!(Section::BeforeStatus < Section::InStatus);
        assert!(Section::InStatus < Section::InOriginalMessage);
    }

    #[test]
    fn test_scan_any_with_no_match() {
        let headers = MailHeaders::default();
        let modules = default_modules();
        assert!(scan_any(&modules, &headers, "no bounce content").is_none());
    }
}
