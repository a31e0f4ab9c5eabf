//! Date strings (ISO 32000-1 Section 7.9.4)

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::fmt;

/// An absolute timestamp read from or written as a `D:` string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfDate(DateTime<FixedOffset>);

impl PdfDate {
    pub fn new(datetime: DateTime<FixedOffset>) -> Self {
        Self(datetime)
    }

    /// Sentinel for an empty `D:` string
    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH.fixed_offset())
    }

    pub fn now() -> Self {
        Self(Utc::now().fixed_offset())
    }

    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.0
    }

    /// Parse `D:YYYY[MM[DD[HH[mm[SS]]]]][offset]`
    ///
    /// The offset may be absent, `Z` (optionally followed by `00'00'`), or
    /// `+HH`, `+HH'`, `+HH'mm`, `+HH'mm'` with either sign.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix("D:")?;
        if rest.is_empty() {
            return Some(Self::epoch());
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if !(4..=14).contains(&digits) || digits % 2 != 0 {
            return None;
        }

        let year: i32 = rest[0..4].parse().ok()?;
        let field = |start: usize, default: u32| -> Option<u32> {
            if start + 2 <= digits {
                rest[start..start + 2].parse().ok()
            } else {
                Some(default)
            }
        };
        let month = field(4, 1)?;
        let day = field(6, 1)?;
        let hour = field(8, 0)?;
        let minute = field(10, 0)?;
        let second = field(12, 0)?;

        let offset = parse_offset(&rest[digits..])?;
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
        offset.from_local_datetime(&naive).single().map(Self)
    }

    /// Format as `D:YYYYMMDDHHmmSS+HH'mm`
    pub fn to_pdf_string(&self) -> String {
        let offset = self.0.offset().local_minus_utc();
        let sign = if offset < 0 { '-' } else { '+' };
        let minutes = offset.abs() / 60;
        format!(
            "D:{}{}{:02}'{:02}",
            self.0.format("%Y%m%d%H%M%S"),
            sign,
            minutes / 60,
            minutes % 60
        )
    }
}

fn parse_offset(tail: &str) -> Option<FixedOffset> {
    let mut chars = tail.chars();
    let sign = match chars.next() {
        None => return FixedOffset::east_opt(0),
        Some('Z') => {
            let rest = chars.as_str();
            return if rest.chars().all(|c| c.is_ascii_digit() || c == '\'') {
                FixedOffset::east_opt(0)
            } else {
                None
            };
        }
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };

    let rest = chars.as_str();
    let hours: i32 = rest.get(0..2)?.parse().ok()?;
    let rest = &rest[2..];
    let rest = rest.strip_prefix('\'').unwrap_or(rest);
    let (minutes, rest) = match rest.get(0..2) {
        Some(mm) if mm.bytes().all(|b| b.is_ascii_digit()) => (mm.parse::<i32>().ok()?, &rest[2..]),
        _ => (0, rest),
    };
    let rest = rest.strip_prefix('\'').unwrap_or(rest);
    if !rest.is_empty() || hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl fmt::Display for PdfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pdf_string())
    }
}

impl From<DateTime<Utc>> for PdfDate {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for PdfDate {
    fn from(datetime: DateTime<FixedOffset>) -> Self {
        Self(datetime)
    }
}
