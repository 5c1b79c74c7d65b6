use std::collections::HashMap;

/// Parsed header view of the bounce message itself, as handed over by the
/// message loader. Field names are lowercased; `Received:` headers keep their
/// order in a separate list because several of them usually exist.
#[derive(Debug, Default, Clone)]
pub struct MailHeaders {
    pub fields: HashMap<String, String>,
    pub received: Vec<String>,
}

impl MailHeaders {
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// One bounced recipient as extracted by a format module, before any
/// normalization. Setters only fill unset fields; `fill_defaults` runs once
/// per module so every field crosses the module boundary as a string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub recipient: Option<String>,
    pub date: Option<String>,
    pub action: Option<String>,
    pub reason: Option<String>,
    /// Enhanced status code, e.g. `5.1.1`.
    pub status: Option<String>,
    /// Free-form error text from the transcript or DSN field.
    pub diagnosis: Option<String>,
    /// Transport tag of the diagnostic code, e.g. `smtp`.
    pub spec: Option<String>,
    pub rhost: Option<String>,
    pub lhost: Option<String>,
    /// Last SMTP command echoed back before the failure.
    pub command: Option<String>,
    pub replycode: Option<String>,
    pub feedbacktype: Option<String>,
    pub alias: Option<String>,
    /// Identifier of the format module that produced this record.
    pub format_id: Option<String>,
    /// Scanner-internal one-shot flag; never crosses into a bounce record.
    pub session_error: bool,
}

impl RawRecord {
    /// Fill a field only when it is still unset (monotonic fill).
    pub fn set_if_empty(slot: &mut Option<String>, value: &str) {
        let unset = slot.as_deref().map(str::is_empty).unwrap_or(true);
        if unset && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    /// Convert every remaining `None` to an empty string. Executed exactly
    /// once before the record leaves its format module.
    pub fn fill_defaults(&mut self) {
        for slot in [
            &mut self.recipient,
            &mut self.date,
            &mut self.action,
            &mut self.reason,
            &mut self.status,
            &mut self.diagnosis,
            &mut self.spec,
            &mut self.rhost,
            &mut self.lhost,
            &mut self.command,
            &mut self.replycode,
            &mut self.feedbacktype,
            &mut self.alias,
            &mut self.format_id,
        ] {
            if slot.is_none() {
                *slot = Some(String::new());
            }
        }
    }
}

/// Output of one successful `FormatModule::scan` call.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// One record per bounced recipient; never empty.
    pub records: Vec<RawRecord>,
    /// Header fields recovered from the embedded original message.
    pub original_headers: HashMap<String, String>,
}

impl ScanResult {
    pub fn original(&self, name: &str) -> &str {
        self.original_headers
            .get(name)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_if_empty_is_monotonic() {
        let mut record = RawRecord::default();
        RawRecord::set_if_empty(&mut record.diagnosis, "first");
        RawRecord::set_if_empty(&mut record.diagnosis, "second");
        assert_eq!(record.diagnosis.as_deref(), Some("first"));
    }

    #[test]
    fn test_fill_defaults() {
        let mut record = RawRecord {
            recipient: Some("kijitora@example.jp".to_string()),
            ..Default::default()
        };
        record.fill_defaults();
        assert_eq!(record.recipient.as_deref(), Some("kijitora@example.jp"));
        assert_eq!(record.diagnosis.as_deref(), Some(""));
        assert_eq!(record.status.as_deref(), Some(""));
    }

    #[test]
    fn test_mail_headers_get() {
        let mut headers = MailHeaders::default();
        headers
            .fields
            .insert("subject".to_string(), "Returned mail: see transcript".to_string());
        assert_eq!(headers.get("subject"), "Returned mail: see transcript");
        assert_eq!(headers.get("x-missing"), "");
    }
}
