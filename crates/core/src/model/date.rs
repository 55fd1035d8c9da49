//! PDF date strings (`D:YYYYMMDDHHmmSSOHH'mm`).

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::{PdfError, Result};

fn bad_date(value: &str) -> PdfError {
    PdfError::Format(format!("invalid date string: {value:?}"))
}

fn digits(value: &str, range: std::ops::Range<usize>) -> Result<u32> {
    let field = value.get(range).ok_or_else(|| bad_date(value))?;
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_date(value));
    }
    field.parse().map_err(|_| bad_date(value))
}

/// Parse a PDF date into UTC.
///
/// Missing trailing components default to the start of the period, so
/// `D:2024` is midnight on 1 January 2024. A `+HH'mm` or `-HH'mm` suffix is
/// folded into the result; `Z` or no suffix means the time is already UTC.
pub fn parse_pdf_date(raw: &str) -> Result<NaiveDateTime> {
    let value = raw.strip_prefix("D:").unwrap_or(raw);
    let stamp_len = value.len().min(14);
    if stamp_len < 4 || stamp_len % 2 != 0 {
        return Err(bad_date(raw));
    }

    let field = |start: usize, default: u32| -> Result<u32> {
        if start + 2 <= stamp_len {
            digits(value, start..start + 2)
        } else {
            Ok(default)
        }
    };
    let year = digits(value, 0..4)?;
    let month = field(4, 1)?;
    let day = field(6, 1)?;
    let hour = field(8, 0)?;
    let minute = field(10, 0)?;
    let second = field(12, 0)?;

    let local = i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| bad_date(raw))?;

    if value.len() <= 17 {
        return Ok(local);
    }
    let mut offset_minutes = i64::from(digits(value, 15..17)?) * 60;
    if value.len() > 20 {
        offset_minutes += i64::from(digits(value, 18..20)?);
    }
    let offset = TimeDelta::minutes(offset_minutes);
    match value.as_bytes()[14] {
        b'+' => Ok(local - offset),
        b'-' => Ok(local + offset),
        _ => Ok(local),
    }
}

/// Format a UTC time as a PDF date string body, without parentheses.
pub fn format_pdf_date(value: &NaiveDateTime) -> String {
    value.format("D:%Y%m%d%H%M%SZ").to_string()
}
