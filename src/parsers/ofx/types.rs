use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// Raw OFX date/time value: `YYYYMMDD[HHMM[SS[.XXX]]][[+-]H[.H][:TZNAME]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfxDate(String);

impl From<String> for OfxDate {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OfxDate {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for OfxDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl OfxDate {
    /// Parses the value. A missing time means midnight and a missing zone
    /// means `fallback`.
    pub fn to_datetime(&self, fallback: FixedOffset) -> Result<DateTime<FixedOffset>, FieldError> {
        let invalid = || FieldError::InvalidDate(self.0.clone());
        let raw = self.0.trim();

        let (stamp, offset) = match raw.split_once('[') {
            Some((stamp, zone)) => {
                let zone = zone.trim_end().strip_suffix(']').ok_or_else(invalid)?;
                (stamp.trim(), parse_zone(zone).ok_or_else(invalid)?)
            }
            None => (raw, fallback),
        };

        let (digits, fraction) = match stamp.split_once('.') {
            Some((digits, fraction)) => (digits, Some(fraction)),
            None => (stamp, None),
        };
        if !digits.bytes().all(|b| b.is_ascii_digit()) || !matches!(digits.len(), 8 | 12 | 14) {
            return Err(invalid());
        }

        let field = |range: std::ops::Range<usize>| digits.get(range).map_or(Ok(0), |s| s.parse::<u32>());
        let year: i32 = digits[0..4].parse().map_err(|_| invalid())?;
        let month = field(4..6).map_err(|_| invalid())?;
        let day = field(6..8).map_err(|_| invalid())?;
        let hour = field(8..10).map_err(|_| invalid())?;
        let minute = field(10..12).map_err(|_| invalid())?;
        let second = field(12..14).map_err(|_| invalid())?;

        let nanos = match fraction {
            None => 0,
            Some(fraction) => {
                if digits.len() != 14
                    || fraction.is_empty()
                    || fraction.len() > 9
                    || !fraction.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err(invalid());
                }
                format!("{fraction:0<9}").parse::<u32>().map_err(|_| invalid())?
            }
        };

        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_nano_opt(hour, minute, second, nanos))
            .ok_or_else(invalid)?;

        offset.from_local_datetime(&naive).single().ok_or_else(invalid)
    }

    /// Renders a timestamp with seconds, fractional seconds when present, and
    /// an explicit zone so the value parses back to the same instant and offset.
    pub fn from_datetime(value: &DateTime<FixedOffset>) -> Self {
        let mut out = value.format("%Y%m%d%H%M%S").to_string();

        let nanos = value.nanosecond();
        if nanos != 0 {
            if nanos % 1_000_000 == 0 {
                out.push_str(&format!(".{:03}", nanos / 1_000_000));
            } else {
                out.push_str(&format!(".{nanos:09}"));
            }
        }

        let seconds = value.offset().local_minus_utc();
        if seconds == 0 {
            out.push_str("[0:GMT]");
        } else {
            let hours = (Decimal::from(seconds) / Decimal::from(3600)).normalize();
            let sign = if seconds > 0 { "+" } else { "" };
            out.push_str(&format!("[{sign}{hours}]"));
        }
        Self(out)
    }
}

/// Zone part of a date, e.g. `-5:EST`, `0:GMT`, `+5.5`. The name is informational.
fn parse_zone(zone: &str) -> Option<FixedOffset> {
    let hours = zone.split(':').next()?.trim();
    let hours = hours.strip_prefix('+').unwrap_or(hours);
    let hours = Decimal::from_str(hours).ok()?;
    let seconds = (hours * Decimal::from(3600)).round().to_i32()?;
    FixedOffset::east_opt(seconds)
}

/// Raw OFX amount. Both `.` and `,` are accepted as decimal separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfxAmount(String);

impl From<&str> for OfxAmount {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for OfxAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl OfxAmount {
    /// Exact decimal value. The rightmost of `.`/`,` is the decimal point and
    /// every other separator is a thousands separator.
    pub fn to_decimal(&self) -> Result<Decimal, FieldError> {
        let invalid = || FieldError::InvalidAmount(self.0.clone());

        let compact: String = self
            .0
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
            .collect();
        let (negative, unsigned) = match compact.as_bytes().first() {
            Some(b'-') => (true, &compact[1..]),
            Some(b'+') => (false, &compact[1..]),
            _ => (false, compact.as_str()),
        };

        if !unsigned.bytes().any(|b| b.is_ascii_digit())
            || !unsigned.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b',')
        {
            return Err(invalid());
        }

        let (integer, fraction) = match unsigned.rfind(['.', ',']) {
            Some(i) => (&unsigned[..i], &unsigned[i + 1..]),
            None => (unsigned, ""),
        };

        let integer: String = integer.chars().filter(char::is_ascii_digit).collect();
        let normalized = format!(
            "{}{}.{}",
            if negative { "-" } else { "" },
            if integer.is_empty() { "0" } else { integer.as_str() },
            if fraction.is_empty() { "0" } else { fraction },
        );

        Decimal::from_str_exact(&normalized).map_err(|_| invalid())
    }

    /// `.` separator, no grouping, at least two decimal places.
    pub fn from_decimal(value: Decimal) -> Self {
        let mut value = value;
        if value.scale() < 2 {
            value.rescale(2);
        }
        Self(value.to_string())
    }
}

/// Upper-cased ISO 4217 code, or `None` if the value is not three letters.
pub fn normalize_currency(raw: &str) -> Option<String> {
    let code = raw.trim();
    (code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())).then(|| code.to_ascii_uppercase())
}
