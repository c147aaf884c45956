//! Canonical timestamp form used for matching.
//!
//! Timestamps reach the matcher from two directions: the value a client sends
//! back (usually copied from an earlier read) and the display string the store
//! renders. Both go through [`normalize`] and are compared as strings.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

/// Format every recognized timestamp normalizes to.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^(?P<year>\d{4})[-/.](?P<month>\d{1,2})[-/.](?P<day>\d{1,2})
            (?:
                [\sT]+
                (?:(?P<pre>上午|下午|AM|PM|am|pm)\s*)?
                (?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2})(?:\.\d+)?)?
                (?:\s*(?P<post>上午|下午|AM|PM|am|pm))?
            )?
            \s*(?:Z|[+-]\d{2}:?\d{2})?$",
        )
        .expect("timestamp pattern is valid")
    })
}

/// Normalize a timestamp to `YYYY-MM-DD HH:MM:SS`.
///
/// Unrecognized or out-of-range input is returned trimmed but otherwise
/// untouched, so two unparseable values still match when they are identical.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    parse(trimmed).map_or_else(
        || trimmed.to_string(),
        |parsed| parsed.format(CANONICAL_FORMAT).to_string(),
    )
}

/// Parse a timestamp in any of the accepted display forms.
pub fn parse(raw: &str) -> Option<NaiveDateTime> {
    let caps = pattern().captures(raw.trim())?;

    let date = NaiveDate::from_ymd_opt(
        number(&caps, "year")?,
        number(&caps, "month")?,
        number(&caps, "day")?,
    )?;

    if caps.name("hour").is_none() {
        return Some(date.and_time(NaiveTime::MIN));
    }

    let meridiem = caps.name("pre").or_else(|| caps.name("post"));
    let mut hour: u32 = number(&caps, "hour")?;
    if let Some(marker) = meridiem {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let afternoon = matches!(marker.as_str(), "下午" | "PM" | "pm");
        hour = match (afternoon, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    let minute = number(&caps, "minute")?;
    let second = caps
        .name("second")
        .map_or(Some(0), |value| value.as_str().parse().ok())?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(date.and_time(time))
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, name: &str) -> Option<T> {
    caps.name(name)?.as_str().parse().ok()
}
