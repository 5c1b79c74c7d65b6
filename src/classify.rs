use crate::address::Address;
use crate::bounce::{BounceRecord, SoftBounce};
use crate::record::{MailHeaders, RawRecord, ScanResult};
use crate::smtp::{error as smtp_error, reply, status};
use crate::{datetime, reason, rfc5322, rhost, text};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    static ref DELIVERED_STATUS: Regex = Regex::new(r"\A2[.]").unwrap();
    static ref LISTID_GROUP: Regex = Regex::new(r"<([^<>]+)>").unwrap();
    static ref NON_BOUNCE_REASON: Regex =
        Regex::new(r"\A(?:delivered|feedback|vacation)\z").unwrap();
}

/// The normalized values of the `Action:` field.
const ACTION_VALUES: &[&str] = &["failed", "delayed", "delivered", "relayed", "expanded"];
const ACTION_SYNONYMS: &[(&str, &str)] = &[("failure", "failed"), ("expired", "delayed")];

/// Engine-level configuration. The retryable-reason allow-list controls which
/// preliminary reasons step 11 is allowed to override; it is data, not logic.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub retry_reasons: Vec<String>,
}

impl EngineConfig {
    pub fn from_yaml(content: &str) -> anyhow::Result<EngineConfig> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }
}

/// Per-call options for [`ClassificationEngine::classify`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifyOptions {
    /// Custom header search order for the original sender; the RFC 5322
    /// defaults apply when empty.
    #[serde(default)]
    pub addresser_order: Vec<String>,
    /// Header search order for the recipient side, kept symmetric with
    /// `addresser_order`. A record whose scanner found no recipient is
    /// dropped, so this list is accepted but never consulted today.
    #[serde(default)]
    pub recipient_order: Vec<String>,
    /// Keep records whose status class is 2 (successful delivery).
    #[serde(default)]
    pub include_delivered: bool,
    /// Opaque payload copied into every produced record.
    #[serde(default)]
    pub catch: Option<serde_json::Value>,
}

/// Normalizes scanner output into bounce records. Holds only read-only
/// configuration, so one engine can serve any number of threads.
pub struct ClassificationEngine {
    retry_reasons: HashSet<String>,
}

impl Default for ClassificationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ClassificationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let retry_reasons = if config.retry_reasons.is_empty() {
            reason::RETRY_DEFAULTS.iter().map(|r| r.to_string()).collect()
        } else {
            config.retry_reasons.into_iter().collect()
        };
        ClassificationEngine { retry_reasons }
    }

    /// Run the normalization pipeline over every raw record of one message.
    /// Problems with a single record skip that record only; a message with no
    /// usable records yields an empty list, never an error.
    pub fn classify(
        &self,
        headers: &MailHeaders,
        scan: &ScanResult,
        options: &ClassifyOptions,
    ) -> Vec<BounceRecord> {
        let addresser_order: Vec<&str> = if options.addresser_order.is_empty() {
            rfc5322::ADDRESSER_HEADERS.to_vec()
        } else {
            options.addresser_order.iter().map(String::as_str).collect()
        };
        let mut results = Vec::new();
        for raw in &scan.records {
            if let Some(record) = self.classify_one(raw, headers, scan, &addresser_order, options) {
                results.push(record);
            }
        }
        results
    }

    fn classify_one(
        &self,
        raw: &RawRecord,
        headers: &MailHeaders,
        scan: &ScanResult,
        addresser_order: &[&str],
        options: &ClassifyOptions,
    ) -> Option<BounceRecord> {
        let mut delivery_status = raw.status.clone().unwrap_or_default();

        // Skip successful deliveries such as 2.1.5 unless asked to keep them
        if !options.include_delivered && DELIVERED_STATUS.is_match(&delivery_status) {
            log::debug!("skipping delivered status {}", delivery_status);
            return None;
        }

        // Locate the original sender in the embedded message's headers,
        // falling back to the bounce message's own To: header
        let mut addresser_value = String::new();
        for name in addresser_order {
            let value = scan.original(name);
            if !value.is_empty() && rfc5322::is_email_address(value) {
                addresser_value = value.to_string();
                break;
            }
        }
        if addresser_value.is_empty() {
            addresser_value = headers.get("to").to_string();
        }
        if addresser_value.is_empty() {
            return None;
        }

        // A scanner that found no recipient produced nothing classifiable
        let recipient_value = raw.recipient.clone().unwrap_or_default();
        if recipient_value.is_empty() {
            return None;
        }

        // Date candidates: the record's own date first, then the original
        // message's date headers, then the bounce message's Date:
        let mut candidates: Vec<String> = Vec::new();
        if let Some(date) = raw.date.as_deref() {
            if !date.is_empty() {
                candidates.push(date.to_string());
            }
        }
        for name in rfc5322::DATE_HEADERS {
            let value = scan.original(name);
            if !value.is_empty() {
                candidates.push(value.to_string());
            }
        }
        let bounce_date = headers.get("date");
        if !bounce_date.is_empty() {
            candidates.push(bounce_date.to_string());
        }
        let parsed_date = candidates.iter().find_map(|v| datetime::parse(v));
        let parsed_date = match parsed_date {
            Some(date) => date,
            None => {
                log::warn!("failed to parse any date candidate: {:?}", candidates);
                return None;
            }
        };

        // Local/remote host names, from the Received: trail when unset
        let mut lhost = raw.lhost.clone().unwrap_or_default();
        let mut rhost = raw.rhost.clone().unwrap_or_default();
        if !headers.received.is_empty() {
            if lhost.is_empty() {
                if let (Some(from_host), _) = rfc5322::received(&headers.received[0]) {
                    lhost = from_host;
                }
            }
            if rhost.is_empty() {
                if let (_, Some(by_host)) =
                    rfc5322::received(headers.received.last().unwrap())
                {
                    rhost = by_host;
                }
            }
        }
        lhost = sanitize_host(&lhost);
        rhost = sanitize_host(&rhost);

        let subject = scan.original("subject").trim_end_matches('\r').to_string();
        let listid = normalize_listid(scan.original("list-id"));
        let messageid = normalize_messageid(scan.original("message-id"));

        // Reconcile the status code with one embedded in the diagnosis text
        let mut diagnostic_code = text::sweep(raw.diagnosis.as_deref().unwrap_or(""));
        if let Some(found) = status::find(&diagnostic_code) {
            delivery_status = found;
        }

        let mut preliminary_reason = raw.reason.clone().unwrap_or_default();
        let mut diagnostic_type = raw.spec.clone().unwrap_or_default();
        if diagnostic_type.is_empty() {
            if preliminary_reason == "mailererror" {
                diagnostic_type = "X-UNIX".to_string();
            } else if preliminary_reason != "feedback" && preliminary_reason != "vacation" {
                diagnostic_type = "SMTP".to_string();
            }
        }

        let mut smtp_command = raw.command.clone().unwrap_or_default();
        if !crate::smtp::is_command(&smtp_command) {
            smtp_command.clear();
        }

        let action = normalize_action(
            raw.action.as_deref().unwrap_or(""),
            &preliminary_reason,
            &delivery_status,
        );

        let addresser = match Address::parse(&addresser_value) {
            Some(address) => address,
            None => {
                log::debug!("unparsable addresser: {}", addresser_value);
                return None;
            }
        };
        let recipient = match Address::parse(&recipient_value) {
            Some(address) => address,
            None => {
                log::debug!("unparsable recipient: {}", recipient_value);
                return None;
            }
        };

        let mut reply_code = raw.replycode.clone().unwrap_or_default();
        if reply_code.is_empty() {
            reply_code = reply::find(&diagnostic_code).unwrap_or_default();
        }

        // Reason resolution: remote-host policy wins over generic inference
        if preliminary_reason.is_empty() || self.retry_reasons.contains(&preliminary_reason) {
            let mut resolved = String::new();
            if rhost::match_host(&rhost) {
                resolved = rhost::find(&rhost, &diagnostic_code)
                    .map(str::to_string)
                    .unwrap_or_default();
            }
            if resolved.is_empty() {
                resolved = reason::infer(&diagnostic_code, &delivery_status)
                    .map(str::to_string)
                    .unwrap_or_default();
            }
            if resolved.is_empty() {
                resolved = "undefined".to_string();
            }
            preliminary_reason = resolved;
        }
        let final_reason = preliminary_reason;

        let mut soft_bounce = SoftBounce::Unknown;
        if NON_BOUNCE_REASON.is_match(&final_reason) {
            if final_reason != "delivered" {
                reply_code.clear();
            }
        } else {
            let error_text = format!("{} {}", delivery_status, diagnostic_code);
            if let Some(severity) = smtp_error::soft_or_hard(&final_reason, error_text.trim()) {
                soft_bounce = severity;
            }

            if delivery_status.is_empty() {
                // Synthesize a pseudo status code from the reason and a
                // permanence guess over the reply code and diagnosis
                let guess_text = format!("{} {}", reply_code, diagnostic_code);
                let temporary = match smtp_error::is_permanent(guess_text.trim()) {
                    Some(permanent) => !permanent,
                    None => false,
                };
                if let Some(pseudo) = status::code(&final_reason, temporary) {
                    delivery_status = pseudo.to_string();
                    if soft_bounce == SoftBounce::Unknown {
                        soft_bounce = smtp_error::soft_or_hard(&final_reason, pseudo)
                            .unwrap_or(SoftBounce::Unknown);
                    }
                }
            }

            // The reply code must agree with the status class
            if !reply_code.is_empty()
                && reply_code.chars().next() != delivery_status.chars().next()
            {
                reply_code.clear();
            }
        }

        // Strip the end-of-message sentinel remnants once more before export
        diagnostic_code = text::sweep(&diagnostic_code);

        let sender_domain = addresser.host.clone();
        let destination_domain = recipient.host.clone();
        let token = text::token(&addresser.address, &recipient.address, parsed_date.epoch);

        Some(BounceRecord {
            token,
            addresser,
            recipient,
            sender_domain,
            destination_domain,
            alias: raw.alias.clone().unwrap_or_default(),
            timestamp: parsed_date.epoch,
            timezone_offset: parsed_date.offset,
            lhost,
            rhost,
            listid,
            subject,
            messageid,
            format_id: raw.format_id.clone().unwrap_or_default(),
            reason: final_reason,
            action,
            delivery_status,
            diagnostic_code,
            diagnostic_type,
            smtp_command,
            reply_code,
            feedback_type: raw.feedbacktype.clone().unwrap_or_default(),
            soft_bounce,
            catch: options.catch.clone(),
        })
    }
}

/// Strip brackets, `prefix=` noise and trailing junk from a host field so it
/// ends up as a bare hostname or IP literal.
fn sanitize_host(value: &str) -> String {
    let mut host: String = value
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')' | '{' | '}'))
        .collect();
    if let Some(pos) = host.rfind('=') {
        host = host[pos + 1..].to_string();
    }
    host = host.trim_end_matches('\r').to_string();
    if let Some(pos) = host.find(' ') {
        host.truncate(pos);
    }
    host
}

fn normalize_listid(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let mut listid = match LISTID_GROUP.captures(value) {
        Some(caps) => caps[1].to_string(),
        None => value.to_string(),
    };
    listid = listid.replace(['<', '>'], "");
    listid = listid.trim_end_matches('\r').to_string();
    if listid.contains(' ') {
        // Malformed List-Id
        return String::new();
    }
    listid
}

fn normalize_messageid(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let mut messageid = value.split(' ').next().unwrap_or("").to_string();
    messageid = messageid.replace(['<', '>'], "");
    messageid.trim_end_matches('\r').to_string()
}

/// Normalize the Action: field, inferring one from the reason or the status
/// class when the scanner found none.
fn normalize_action(value: &str, reason: &str, delivery_status: &str) -> String {
    if !value.is_empty() {
        // Action: expanded (to multi-recipient alias)
        let mut action = value.split_whitespace().next().unwrap_or("").to_string();
        if !ACTION_VALUES.contains(&action.as_str()) {
            if let Some((_, mapped)) = ACTION_SYNONYMS.iter().find(|(from, _)| *from == action) {
                action = (*mapped).to_string();
            }
        }
        return action;
    }
    if reason == "expired" {
        return "delayed".to_string();
    }
    if delivery_status.starts_with('4') || delivery_status.starts_with('5') {
        return "failed".to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize_host("[192.0.2.25]"), "192.0.2.25");
        assert_eq!(sanitize_host("lhost=mta.example.jp"), "mta.example.jp");
        assert_eq!(sanitize_host("mx.example.jp\r"), "mx.example.jp");
        assert_eq!(
            sanitize_host("mx.example.jp (ESMTP SENDMAIL)"),
            "mx.example.jp"
        );
        assert_eq!(sanitize_host(""), "");
    }

    #[test]
    fn test_normalize_listid() {
        assert_eq!(
            normalize_listid("Cat lovers <neko.example.jp>"),
            "neko.example.jp"
        );
        assert_eq!(normalize_listid("neko.example.jp"), "neko.example.jp");
        assert_eq!(normalize_listid("broken list id"), "");
        assert_eq!(normalize_listid(""), "");
    }

    #[test]
    fn test_normalize_messageid() {
        assert_eq!(
            normalize_messageid("<ABC123@example.jp> (added by postmaster)"),
            "ABC123@example.jp"
        );
        assert_eq!(normalize_messageid("plain-id@example.jp"), "plain-id@example.jp");
    }

    #[test]
    fn test_normalize_action() {
        assert_eq!(normalize_action("failure", "", ""), "failed");
        assert_eq!(normalize_action("expired", "", ""), "delayed");
        assert_eq!(
            normalize_action("expanded (to multi-recipient alias)", "", ""),
            "expanded"
        );
        assert_eq!(normalize_action("", "expired", ""), "delayed");
        assert_eq!(normalize_action("", "userunknown", "5.1.1"), "failed");
        assert_eq!(normalize_action("", "", ""), "");
    }

    #[test]
    fn test_engine_config_from_yaml() {
        let config = EngineConfig::from_yaml("retry_reasons:\n  - undefined\n  - onhold\n")
            .unwrap();
        assert_eq!(config.retry_reasons, vec!["undefined", "onhold"]);

        let empty = EngineConfig::from_yaml("{}").unwrap();
        assert!(empty.retry_reasons.is_empty());
    }
}
