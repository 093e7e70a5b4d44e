//! Parsing of the loosely ISO 8601 timestamps found in OPDS feeds and in the
//! calibre REST responses.
//!
//! Accepted shape: `YYYY-MM-DDTHH:MM:SS`, optionally followed by `Z` or by
//! fractional seconds and a `±HH:MM` offset. Fractional seconds are only
//! accepted in front of an offset.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use crate::app::{OpdsError, Result};

const BASE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// How a zone suffix is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampMode {
    /// The zone suffix is dropped and the wall-clock time kept as is.
    /// `2020-01-01T12:00:00+02:00` becomes `2020-01-01T12:00:00`.
    #[default]
    Legacy,
    /// The offset is applied and the UTC instant returned.
    OffsetAware,
}

impl TimestampMode {
    pub fn from_offset_aware(offset_aware: bool) -> Self {
        if offset_aware {
            Self::OffsetAware
        } else {
            Self::Legacy
        }
    }
}

/// Timestamp given to books whose entry has no `updated` value.
pub fn default_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

pub fn parse_timestamp(raw: &str, mode: TimestampMode) -> Result<NaiveDateTime> {
    let malformed = || OpdsError::MalformedTimestamp {
        value: raw.to_string(),
    };

    let (rest, zone) = split_zone(raw);
    let base = match zone {
        Zone::Offset(_) => strip_fraction(rest),
        Zone::Utc | Zone::Absent => rest,
    };
    let naive = parse_base(base).ok_or_else(malformed)?;

    match (mode, zone) {
        (TimestampMode::OffsetAware, Zone::Offset(secs)) if secs != 0 => FixedOffset::east_opt(secs)
            .and_then(|offset| offset.from_local_datetime(&naive).single())
            .map(|dt| dt.naive_utc())
            .ok_or_else(malformed),
        _ => Ok(naive),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Absent,
    Utc,
    /// Seconds east of UTC.
    Offset(i32),
}

/// Splits a trailing `Z` or `±HH:MM` from `raw`.
fn split_zone(raw: &str) -> (&str, Zone) {
    if let Some(rest) = raw.strip_suffix('Z') {
        return (rest, Zone::Utc);
    }

    let bytes = raw.as_bytes();
    if bytes.len() < 6 {
        return (raw, Zone::Absent);
    }
    let tail = &bytes[bytes.len() - 6..];
    let is_offset = matches!(tail[0], b'+' | b'-')
        && tail[1].is_ascii_digit()
        && tail[2].is_ascii_digit()
        && tail[3] == b':'
        && tail[4].is_ascii_digit()
        && tail[5].is_ascii_digit();
    if !is_offset {
        return (raw, Zone::Absent);
    }

    let hours = i32::from(tail[1] - b'0') * 10 + i32::from(tail[2] - b'0');
    let minutes = i32::from(tail[4] - b'0') * 10 + i32::from(tail[5] - b'0');
    let sign = if tail[0] == b'-' { -1 } else { 1 };
    let (rest, _) = raw.split_at(raw.len() - 6);
    (rest, Zone::Offset(sign * (hours * 3600 + minutes * 60)))
}

fn strip_fraction(s: &str) -> &str {
    match s.rfind('.') {
        Some(dot) => {
            let fraction = &s[dot + 1..];
            if !fraction.is_empty() && fraction.bytes().all(|b| b.is_ascii_digit()) {
                &s[..dot]
            } else {
                s
            }
        }
        None => s,
    }
}

fn parse_base(s: &str) -> Option<NaiveDateTime> {
    let bytes = s.as_bytes();
    if bytes.len() != 19 {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b'T',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDateTime::parse_from_str(s, BASE_FORMAT).ok()
}
