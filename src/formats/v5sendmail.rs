use crate::address::Address;
use crate::formats::{FormatModule, Section};
use crate::record::{MailHeaders, RawRecord, ScanResult};
use crate::{rfc5322, text};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SUBJECT: Regex = Regex::new(r"\AReturned mail: [A-Z]").unwrap();
    static ref FROM: Regex = Regex::new(r"\AMail Delivery Subsystem").unwrap();
    static ref STATUS_BEGIN: Regex =
        Regex::new(r"\A[ \t]+-+ Transcript of session follows -+\z").unwrap();
    static ref RFC822_BEGIN: Regex = Regex::new(
        r"\A[ \t]+----- (?:Unsent message follows|No message was collected) -----"
    )
    .unwrap();
    static ref SESSION_ERROR: Regex = Regex::new(r"\A[.]+ while talking to .+[:]\z").unwrap();

    static ref STATUS_LINE: Regex =
        Regex::new(r"\A\d{3}[ ]+<([^ ]+@[^ ]+)>[.]{3}[ ]*(.+)\z").unwrap();
    static ref COMMAND_ECHO: Regex = Regex::new(r"\A>{3}[ ]*([A-Z]{4})[ ]*").unwrap();
    static ref RESPONSE_ECHO: Regex = Regex::new(r"\A<{3}[ ]+(.+)\z").unwrap();
    static ref FALLBACK_LINE: Regex = Regex::new(r"\A\d{3}[ ]+.+[.]{3}[ \t]*(.+)\z").unwrap();

    static ref FULL_ADDRESS: Regex = Regex::new(r"\A[^ ]+@[^ ]+\z").unwrap();
    static ref EMBEDDED_ADDRESS: Regex = Regex::new(r"<([^ ]+@[^ ]+)>").unwrap();
}

fn set_at(list: &mut Vec<Option<String>>, index: usize, value: String) {
    if list.len() <= index {
        list.resize(index + 1, None);
    }
    list[index] = Some(value);
}

fn get_at(list: &[Option<String>], index: usize) -> Option<&str> {
    list.get(index).and_then(|v| v.as_deref())
}

/// Sendmail version 5. The delivery-status section is a raw SMTP transcript:
///
/// ```text
///    ----- Transcript of session follows -----
/// While talking to smtp.example.com:
/// >>> RCPT To:<kijitora@example.org>
/// <<< 550 <kijitora@example.org>, User Unknown
/// 550 <kijitora@example.org>... User unknown
/// ```
pub struct V5sendmail;

impl FormatModule for V5sendmail {
    fn description(&self) -> &'static str {
        "Sendmail version 5"
    }

    fn format_id(&self) -> &'static str {
        "v5sendmail"
    }

    fn matches(&self, headers: &MailHeaders) -> bool {
        SUBJECT.is_match(headers.get("subject")) || FROM.is_match(headers.get("from"))
    }

    fn scan(&self, headers: &MailHeaders, body: &str) -> Option<ScanResult> {
        if !SUBJECT.is_match(headers.get("subject")) {
            return None;
        }

        let mut records = vec![RawRecord::default()];
        let mut original_lines: Vec<String> = Vec::new();
        let mut cursor = Section::BeforeStatus;
        let mut blank_lines = 0;
        let mut recipients: usize = 0;
        let mut responding: Vec<Option<String>> = Vec::new();
        let mut commands: Vec<Option<String>> = Vec::new();
        let mut alternative_diagnosis: Option<String> = None;

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

            if let Some(caps) = STATUS_LINE.captures(line) {
                // 550 <kijitora@example.org>... User unknown
                if records.last().map(|v| v.recipient.is_some()).unwrap_or(false) {
                    // There are multiple recipient addresses in the message body
                    records.push(RawRecord::default());
                }
                let v = records.last_mut().unwrap();
                v.recipient = Some(caps[1].to_string());
                let mut diagnosis = caps[2].to_string();
                if let Some(response) = get_at(&responding, recipients) {
                    // Concatenate the response of the server and the error text
                    diagnosis.push_str(": ");
                    diagnosis.push_str(response);
                }
                v.diagnosis = Some(diagnosis);
                recipients += 1;
            } else if let Some(caps) = COMMAND_ECHO.captures(line) {
                // >>> RCPT To:<kijitora@example.org>
                set_at(&mut commands, recipients, caps[1].to_string());
            } else if let Some(caps) = RESPONSE_ECHO.captures(line) {
                // <<< 550 Requested User Mailbox not found. No such user here.
                set_at(&mut responding, recipients, caps[1].to_string());
            } else {
                // Detect an SMTP session error or a connection error
                let v = records.last_mut().unwrap();
                if v.session_error {
                    continue;
                }
                if SESSION_ERROR.is_match(line) {
                    // ... while talking to mta.example.org.:
                    v.session_error = true;
                    continue;
                }
                if let Some(caps) = FALLBACK_LINE.captures(line) {
                    // 421 example.org (smtp)... Deferred: Connection timed out
                    alternative_diagnosis = Some(caps[1].to_string());
                }
            }
        }
        if cursor < Section::InOriginalMessage {
            return None;
        }

        let original_headers = rfc5322::parse_header_block(&original_lines);
        if recipients == 0 {
            // Get the recipient address from the original message's To: header
            let to_value = original_headers.get("to").map(String::as_str).unwrap_or("");
            if !to_value.is_empty() {
                records[0].recipient = Some(Address::undress(to_value));
                recipients = 1;
            }
        }
        if recipients == 0 {
            return None;
        }

        for (index, record) in records.iter_mut().enumerate() {
            record.format_id = Some(self.format_id().to_string());
            record.command = get_at(&commands, index).map(str::to_string);

            if record.diagnosis.is_none() {
                record.diagnosis = alternative_diagnosis
                    .clone()
                    .or_else(|| get_at(&responding, index).map(str::to_string));
            }
            record.diagnosis = Some(text::sweep(record.diagnosis.as_deref().unwrap_or("")));

            let bare = record.recipient.as_deref().unwrap_or("");
            if !FULL_ADDRESS.is_match(bare) {
                // @example.jp with no local part: recover the address from
                // the diagnosis text instead
                if let Some(caps) =
                    EMBEDDED_ADDRESS.captures(record.diagnosis.as_deref().unwrap_or(""))
                {
                    record.recipient = Some(caps[1].to_string());
                }
            }
            record.fill_defaults();
        }

        Some(ScanResult {
            records,
            original_headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn bounce_headers() -> MailHeaders {
        let mut fields = HashMap::new();
        fields.insert(
            "subject".to_string(),
            "Returned mail: User unknown".to_string(),
        );
        fields.insert(
            "from".to_string(),
            "Mail Delivery Subsystem <MAILER-DAEMON@example.org>".to_string(),
        );
        MailHeaders {
            fields,
            received: vec![],
        }
    }

    const BODY: &str = "   ----- Transcript of session follows -----
While talking to smtp.example.org:
>>> RCPT To:<kijitora@example.org>
<<< 550 <kijitora@example.org>, User Unknown
550 <kijitora@example.org>... User unknown

   ----- Unsent message follows -----
Return-Path: <shironeko@example.jp>
From: Shironeko <shironeko@example.jp>
To: kijitora@example.org
Subject: Nyaan
Date: Thu, 17 Apr 2014 23:34:45 +0900

Nyaan
";

    #[test]
    fn test_matches() {
        assert!(V5sendmail.matches(&bounce_headers()));
        assert!(!V5sendmail.matches(&MailHeaders::default()));
    }

    #[test]
    fn test_scan_transcript() {
        let result = V5sendmail.scan(&bounce_headers(), BODY).unwrap();
        assert_eq!(result.records.len(), 1);

        let record = &result.records[0];
        assert_eq!(record.recipient.as_deref(), Some("kijitora@example.org"));
        assert_eq!(record.command.as_deref(), Some("RCPT"));
        assert_eq!(
            record.diagnosis.as_deref(),
            Some("User unknown: 550 <kijitora@example.org>, User Unknown")
        );
        assert_eq!(record.format_id.as_deref(), Some("v5sendmail"));
        assert_eq!(result.original("to"), "kijitora@example.org");
    }

    #[test]
    fn test_scan_recovers_recipient_from_original_message() {
        let body = "   ----- Transcript of session follows -----
421 example.org (smtp)... Deferred: Connection timed out during user open with example.org

   ----- No message was collected -----
From: Shironeko <shironeko@example.jp>
To: kijitora@example.org
Subject: Nyaan

";
        let result = V5sendmail.scan(&bounce_headers(), body).unwrap();
        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.recipient.as_deref(), Some("kijitora@example.org"));
        assert_eq!(
            record.diagnosis.as_deref(),
            Some("Deferred: Connection timed out during user open with example.org")
        );
    }

    #[test]
    fn test_scan_requires_original_message_marker() {
        let body = "   ----- Transcript of session follows -----
550 <kijitora@example.org>... User unknown
";
        assert!(V5sendmail.scan(&bounce_headers(), body).is_none());
    }

    #[test]
    fn test_scan_declines_other_subjects() {
        let mut headers = bounce_headers();
        headers
            .fields
            .insert("subject".to_string(), "Weekly report".to_string());
        assert!(V5sendmail.scan(&headers, BODY).is_none());
    }
}
