use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TRAILING_TZ: Regex = Regex::new(r"\A(.+?)[ \t]+([-+]\d{4})\z").unwrap();
    static ref TRAILING_COMMENT: Regex = Regex::new(r"[ \t]*\([^)]*\)[ \t]*\z").unwrap();
    static ref LEADING_WEEKDAY: Regex =
        Regex::new(r"(?i)\A(?:sun|mon|tue|wed|thu|fri|sat)[a-z]*,?[ \t]+").unwrap();
}

/// Timezone abbreviations still seen in the wild on Date headers.
const ZONE_NAMES: &[(&str, &str)] = &[
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("UT", "+0000"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("JST", "+0900"),
];

const LOCAL_FORMATS: &[&str] = &["%d %b %Y %H:%M:%S", "%b %d %H:%M:%S %Y"];

/// A date string resolved to an absolute instant plus the offset it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    /// Epoch seconds, UTC.
    pub epoch: i64,
    pub offset_seconds: i32,
    /// The offset as written, e.g. `-0500`; `+0000` when none was present.
    pub offset: String,
}

/// Convert a `[+-]HHMM` timezone string to signed seconds.
pub fn tz2second(zone: &str) -> Option<i32> {
    let bytes = zone.as_bytes();
    if bytes.len() != 5 {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = zone[1..3].parse().ok()?;
    let minutes: i32 = zone[3..5].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Parse one date header candidate. The local time is interpreted against the
/// trailing numeric offset (or a known zone abbreviation) so that `epoch` is
/// always UTC-normalized; malformed candidates yield `None` and the caller
/// moves on to the next one.
pub fn parse(value: &str) -> Option<ParsedDate> {
    let mut text = value.trim().trim_end_matches('\r').to_string();
    while TRAILING_COMMENT.is_match(&text) {
        text = TRAILING_COMMENT.replace(&text, "").trim_end().to_string();
    }

    let mut offset = String::from("+0000");
    let trailing = TRAILING_TZ
        .captures(&text)
        .map(|caps| (caps[1].trim_end().to_string(), caps[2].to_string()));
    if let Some((head, zone)) = trailing {
        text = head;
        offset = zone;
    } else {
        for (name, numeric) in ZONE_NAMES {
            if let Some(stripped) = text.strip_suffix(name) {
                offset = (*numeric).to_string();
                text = stripped.trim_end().to_string();
                break;
            }
        }
    }
    let offset_seconds = tz2second(&offset)?;

    // Date headers regularly carry a weekday that contradicts the date, so
    // the token is dropped rather than validated
    text = LEADING_WEEKDAY.replace(&text, "").to_string();

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(ParsedDate {
                epoch: naive.and_utc().timestamp() - i64::from(offset_seconds),
                offset_seconds,
                offset,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tz2second() {
        assert_eq!(tz2second("+0900"), Some(32400));
        assert_eq!(tz2second("-0500"), Some(-18000));
        assert_eq!(tz2second("+0000"), Some(0));
        assert_eq!(tz2second("-9900"), None);
        assert_eq!(tz2second("0900"), None);
    }

    #[test]
    fn test_parse_with_numeric_offset() {
        let parsed = parse("Wed, 26 Feb 2014 06:05:48 -0500").unwrap();
        assert_eq!(parsed.offset, "-0500");
        assert_eq!(parsed.offset_seconds, -18000);
        // 06:05:48 -0500 is 11:05:48 UTC
        assert_eq!(parsed.epoch, 1393412748);
    }

    #[test]
    fn test_parse_with_zone_comment() {
        let parsed = parse("Tue, 29 Apr 2014 23:34:45 +0000 (GMT)").unwrap();
        assert_eq!(parsed.offset, "+0000");
        assert_eq!(parsed.epoch, 1398814485);
    }

    #[test]
    fn test_parse_ignores_wrong_weekday() {
        // 29 Apr 2014 was a Tuesday, but the weekday token is not trusted
        let parsed = parse("Thu, 29 Apr 2014 23:34:45 +0000 (GMT)").unwrap();
        assert_eq!(parsed.epoch, 1398814485);
    }

    #[test]
    fn test_parse_zone_abbreviation() {
        let parsed = parse("Fri, 21 Nov 2014 23:34:45 JST").unwrap();
        assert_eq!(parsed.offset, "+0900");
        // 23:34:45 +0900 is 14:34:45 UTC
        assert_eq!(parsed.epoch, 1416580485);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse("not a date").is_none());
        assert!(parse("").is_none());
    }
}
