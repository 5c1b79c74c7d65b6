use crate::address::Address;
use crate::formats::{FormatModule, Section};
use crate::record::{MailHeaders, RawRecord, ScanResult};
use crate::{rfc5322, text};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SUBJECT: Regex = Regex::new(r"\ADelivery Notification: ").unwrap();
    static ref BOUNDARY: Regex = Regex::new(r"Boundary_\(ID_.+\)").unwrap();
    static ref STATUS_BEGIN: Regex = Regex::new(
        r"\AThis report relates to a message you sent with the following header fields:"
    )
    .unwrap();
    static ref RFC822_BEGIN: Regex =
        Regex::new(r"\A(?:Content-type:[ ]*message/rfc822|Return-path:[ ]*)").unwrap();

    static ref RECIPIENT: Regex =
        Regex::new(r"\A[ \t]+Recipient address:[ \t]*([^ ]+@[^ ]+)\z").unwrap();
    static ref ORIGINAL: Regex =
        Regex::new(r"\A[ \t]+Original address:[ \t]*([^ ]+@[^ ]+)\z").unwrap();
    static ref DATE: Regex = Regex::new(r"\A[ \t]+Date:[ \t]*(.+)\z").unwrap();
    static ref REASON_LINE: Regex = Regex::new(r"\A[ \t]+Reason:[ \t]*(.+)\z").unwrap();
    static ref DIAG_CODE: Regex =
        Regex::new(r"\A[ \t]+Diagnostic code:[ \t]*([^ ]+);(.+)\z").unwrap();
    static ref REMOTE_SYSTEM: Regex =
        Regex::new(r"\A[ \t]+Remote system:[ ]*dns;([^ ]+)[ ]+([^ ]+)").unwrap();

    static ref DSN_STATUS: Regex =
        Regex::new(r"\A[Ss]tatus:[ ]*(\d[.]\d[.]\d)[ ]*\((.+)\)\z").unwrap();
    static ref ARRIVAL_DATE: Regex = Regex::new(r"\A[Aa]rrival-[Dd]ate:[ ]*(.+)\z").unwrap();
    static ref REPORTING_MTA: Regex =
        Regex::new(r"\A[Rr]eporting-MTA:[ ]*(?:DNS|dns);[ ]*(.+)\z").unwrap();

    static ref HAS_DOMAIN: Regex = Regex::new(r"[^.]+[.][^.]+").unwrap();
    static ref SUB_ERRORS: Vec<(&'static str, Regex)> = vec![(
        "hostunknown",
        Regex::new(r"(?i)Illegal[ ]host/domain[ ]name[ ]found").unwrap()
    )];
}

/// Oracle Communications Messaging Server (formerly Sun Java System Messaging
/// Server). The delivery-status section is a labeled transcript:
///
/// ```text
/// Your message cannot be delivered to the following recipients:
///
///   Recipient address: kijitora@example.jp
///   Reason: Remote SMTP server has rejected address
///   Diagnostic code: smtp;550 5.1.1 <kijitora@example.jp>... User Unknown
///   Remote system: dns;mx.example.jp (TCP|17.111.174.67|47323|192.0.2.225|25)
/// ```
pub struct MessagingServer;

impl MessagingServer {
    /// Split the `(TCP|local-ip|lport|remote-ip|rport)` session log next to
    /// the remote host name.
    fn session_hosts(session: &str) -> Option<(String, String)> {
        let inner = session.trim_matches(|c| c == '(' || c == ')');
        let parts: Vec<&str> = inner.split('|').collect();
        if parts.len() == 5 && parts[0] == "TCP" {
            Some((parts[1].to_string(), parts[3].to_string()))
        } else {
            None
        }
    }
}

impl FormatModule for MessagingServer {
    fn description(&self) -> &'static str {
        "Oracle Communications Messaging Server"
    }

    fn format_id(&self) -> &'static str {
        "messagingserver"
    }

    fn matches(&self, headers: &MailHeaders) -> bool {
        BOUNDARY.is_match(headers.get("content-type")) || SUBJECT.is_match(headers.get("subject"))
    }

    fn scan(&self, headers: &MailHeaders, body: &str) -> Option<ScanResult> {
        if !self.matches(headers) {
            return None;
        }

        let mut records = vec![RawRecord::default()];
        let mut original_lines: Vec<String> = Vec::new();
        let mut cursor = Section::BeforeStatus;
        let mut blank_lines = 0;
        let mut recipients = 0;

        for line in body.split('\n') {
            if cursor == Section::BeforeStatus {
                if STATUS_BEGIN.is_match(line) {
                    cursor = Section::InStatus;
                }
                continue;
            }
            if cursor == Section::InStatus && RFC822_BEGIN.is_match(line) {
                cursor = Section::InOriginalMessage;
                continue;
            }

            if cursor == Section::InOriginalMessage {
                if line.is_empty() {
                    blank_lines += 1;
                    if blank_lines > 1 {
                        break;
                    }
                    continue;
                }
                original_lines.push(line.to_string());
                continue;
            }
            if line.is_empty() {
                continue;
            }

            let v = records.last_mut().unwrap();
            if let Some(caps) = RECIPIENT.captures(line) {
                //   Recipient address: kijitora@example.jp
                if v.recipient.is_some() {
                    // Multiple recipient addresses in the message body
                    records.push(RawRecord::default());
                }
                let v = records.last_mut().unwrap();
                v.recipient = Some(Address::undress(&caps[1]));
                recipients += 1;
            } else if let Some(caps) = ORIGINAL.captures(line) {
                //   Original address: kijitora@example.jp
                v.recipient = Some(Address::undress(&caps[1]));
            } else if let Some(caps) = DATE.captures(line) {
                //   Date: Fri, 21 Nov 2014 23:34:45 +0900
                v.date = Some(caps[1].to_string());
            } else if let Some(caps) = REASON_LINE.captures(line) {
                //   Reason: Remote SMTP server has rejected address
                v.diagnosis = Some(caps[1].to_string());
            } else if let Some(caps) = DIAG_CODE.captures(line) {
                //   Diagnostic code: smtp;550 5.1.1 <kijitora@example.jp>... User Unknown
                v.spec = Some(caps[1].to_uppercase());
                v.diagnosis = Some(caps[2].to_string());
            } else if let Some(caps) = REMOTE_SYSTEM.captures(line) {
                //   Remote system: dns;mx.example.jp (TCP|17.111.174.67|47323|192.0.2.225|25)
                let remote_host = caps[1].to_string();
                v.rhost = Some(remote_host.clone());
                if let Some((local_ip, remote_ip)) = Self::session_hosts(&caps[2]) {
                    v.lhost = Some(local_ip);
                    if !HAS_DOMAIN.is_match(&remote_host) {
                        // The primary token has no domain suffix, use the
                        // session's remote IP address instead
                        v.rhost = Some(remote_ip);
                    }
                }
            } else if let Some(caps) = DSN_STATUS.captures(line) {
                // Status: 5.1.1 (Remote SMTP server has rejected address)
                v.status = Some(caps[1].to_string());
                RawRecord::set_if_empty(&mut v.diagnosis, &caps[2]);
            } else if let Some(caps) = ARRIVAL_DATE.captures(line) {
                // Arrival-date: Thu, 29 Apr 2014 23:34:45 +0000 (GMT)
                RawRecord::set_if_empty(&mut v.date, &caps[1]);
            } else if let Some(caps) = REPORTING_MTA.captures(line) {
                // Reporting-MTA: dns;mr21p30im-asmtp004.me.com (tcp-daemon)
                let local_host = caps[1].to_string();
                let replace = v
                    .lhost
                    .as_deref()
                    .map(|h| !HAS_DOMAIN.is_match(h))
                    .unwrap_or(true);
                if replace {
                    v.lhost = Some(local_host);
                }
            }
        }
        if recipients == 0 {
            return None;
        }

        for record in records.iter_mut() {
            record.format_id = Some(self.format_id().to_string());
            record.diagnosis = Some(text::sweep(record.diagnosis.as_deref().unwrap_or("")));
            for (sub_reason, pattern) in SUB_ERRORS.iter() {
                if pattern.is_match(record.diagnosis.as_deref().unwrap_or("")) {
                    record.reason = Some((*sub_reason).to_string());
                    break;
                }
            }
            record.fill_defaults();
        }

        Some(ScanResult {
            records,
            original_headers: rfc5322::parse_header_block(&original_lines),
        })
    }
}
