use crate::address::Address;
use serde::Serialize;

/// Bounce severity: whether retrying could succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SoftBounce {
    /// Transient failure, retry-eligible.
    Soft,
    /// Permanent failure.
    Hard,
    /// Not a bounce (delivered, feedback, vacation) or indeterminate.
    Unknown,
}

impl SoftBounce {
    /// Legacy integer form: 1 = soft, 0 = hard, -1 = unknown.
    pub fn as_int(self) -> i8 {
        match self {
            SoftBounce::Soft => 1,
            SoftBounce::Hard => 0,
            SoftBounce::Unknown => -1,
        }
    }
}

/// The final normalized record for one bounced recipient. Built once by the
/// classification engine; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BounceRecord {
    /// Deterministic fingerprint of (addresser, recipient, timestamp).
    pub token: String,
    pub addresser: Address,
    pub recipient: Address,
    pub sender_domain: String,
    pub destination_domain: String,
    pub alias: String,
    /// Epoch seconds, UTC.
    pub timestamp: i64,
    /// The timezone offset the date string carried, e.g. `-0500`.
    pub timezone_offset: String,
    pub lhost: String,
    pub rhost: String,
    pub listid: String,
    pub subject: String,
    pub messageid: String,
    /// Which format module produced the underlying raw record.
    pub format_id: String,
    pub reason: String,
    pub action: String,
    /// Enhanced status code (DSN), e.g. `5.1.1`.
    pub delivery_status: String,
    pub diagnostic_code: String,
    pub diagnostic_type: String,
    pub smtp_command: String,
    pub reply_code: String,
    pub feedback_type: String,
    pub soft_bounce: SoftBounce,
    /// Opaque payload handed through from the caller, untouched.
    pub catch: Option<serde_json::Value>,
}

/// All-primitive projection of a [`BounceRecord`] for serialization:
/// addresses flattened to strings, severity to its legacy integer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    pub token: String,
    pub addresser: String,
    pub recipient: String,
    pub senderdomain: String,
    pub destination: String,
    pub alias: String,
    pub timestamp: i64,
    pub timezoneoffset: String,
    pub lhost: String,
    pub rhost: String,
    pub listid: String,
    pub subject: String,
    pub messageid: String,
    pub smtpagent: String,
    pub reason: String,
    pub action: String,
    pub deliverystatus: String,
    pub diagnosticcode: String,
    pub diagnostictype: String,
    pub smtpcommand: String,
    pub replycode: String,
    pub feedbacktype: String,
    pub softbounce: i8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catch: Option<serde_json::Value>,
}

/// Export format for [`BounceRecord::dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    Json,
    Yaml,
}

impl BounceRecord {
    /// Flatten to primitive fields; pure projection, no logic.
    pub fn to_flat(&self) -> FlatRecord {
        FlatRecord {
            token: self.token.clone(),
            addresser: self.addresser.address.clone(),
            recipient: self.recipient.address.clone(),
            senderdomain: self.sender_domain.clone(),
            destination: self.destination_domain.clone(),
            alias: self.alias.clone(),
            timestamp: self.timestamp,
            timezoneoffset: self.timezone_offset.clone(),
            lhost: self.lhost.clone(),
            rhost: self.rhost.clone(),
            listid: self.listid.clone(),
            subject: self.subject.clone(),
            messageid: self.messageid.clone(),
            smtpagent: self.format_id.clone(),
            reason: self.reason.clone(),
            action: self.action.clone(),
            deliverystatus: self.delivery_status.clone(),
            diagnosticcode: self.diagnostic_code.clone(),
            diagnostictype: self.diagnostic_type.clone(),
            smtpcommand: self.smtp_command.clone(),
            replycode: self.reply_code.clone(),
            feedbacktype: self.feedback_type.clone(),
            softbounce: self.soft_bounce.as_int(),
            catch: self.catch.clone(),
        }
    }

    /// Serialize the flat view as JSON or YAML.
    pub fn dump(&self, format: DumpFormat) -> anyhow::Result<String> {
        let flat = self.to_flat();
        Ok(match format {
            DumpFormat::Json => serde_json::to_string(&flat)?,
            DumpFormat::Yaml => serde_yaml::to_string(&flat)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BounceRecord {
        BounceRecord {
            token: "aabbccdd00112233".to_string(),
            addresser: Address::parse("shironeko@example.jp").unwrap(),
            recipient: Address::parse("kijitora@example.org").unwrap(),
            sender_domain: "example.jp".to_string(),
            destination_domain: "example.org".to_string(),
            alias: String::new(),
            timestamp: 1393412748,
            timezone_offset: "-0500".to_string(),
            lhost: "mta.example.jp".to_string(),
            rhost: "mx.example.org".to_string(),
            listid: String::new(),
            subject: "Nyaan".to_string(),
            messageid: "ABC123@example.jp".to_string(),
            format_id: "v5sendmail".to_string(),
            reason: "userunknown".to_string(),
            action: "failed".to_string(),
            delivery_status: "5.1.1".to_string(),
            diagnostic_code: "550 User unknown".to_string(),
            diagnostic_type: "SMTP".to_string(),
            smtp_command: "RCPT".to_string(),
            reply_code: "550".to_string(),
            feedback_type: String::new(),
            soft_bounce: SoftBounce::Hard,
            catch: None,
        }
    }

    #[test]
    fn test_soft_bounce_as_int() {
        assert_eq!(SoftBounce::Soft.as_int(), 1);
        assert_eq!(SoftBounce::Hard.as_int(), 0);
        assert_eq!(SoftBounce::Unknown.as_int(), -1);
    }

    #[test]
    fn test_to_flat() {
        let flat = sample().to_flat();
        assert_eq!(flat.addresser, "shironeko@example.jp");
        assert_eq!(flat.recipient, "kijitora@example.org");
        assert_eq!(flat.softbounce, 0);
        assert_eq!(flat.timestamp, 1393412748);
    }

    #[test]
    fn test_dump_json_and_yaml() {
        let record = sample();
        let json = record.dump(DumpFormat::Json).unwrap();
        assert!(json.contains("\"reason\":\"userunknown\""));
        assert!(json.contains("\"softbounce\":0"));

        let yaml = record.dump(DumpFormat::Yaml).unwrap();
        assert!(yaml.contains("reason: userunknown"));
    }
}
