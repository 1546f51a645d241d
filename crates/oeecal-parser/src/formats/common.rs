use chrono::{Days, NaiveDate};
use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::{BareNumberScale, DropReason, Shift};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Semicolon,
    Comma,
}

impl Delimiter {
    pub(crate) fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Semicolon => b';',
            Delimiter::Comma => b',',
        }
    }

    /// Semicolon exports come from comma-decimal locales, where a lone `.` groups
    /// thousands: `3.600` is 3600 there, not 3.6.
    pub(crate) fn parse_number(&self, value: &str) -> Option<f64> {
        let trimmed = value.trim();
        match self {
            Delimiter::Semicolon if is_dot_grouped(trimmed) => {
                parse_localized_number(&trimmed.replace('.', ""))
            }
            _ => parse_localized_number(trimmed),
        }
    }
}

/// `3.600`, `-12.500.000`; not `0.725` or `72.5`.
fn is_dot_grouped(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut groups = digits.split('.');
    let lead = groups.next().unwrap_or_default();
    let lead_ok = (1..=3).contains(&lead.len())
        && !lead.starts_with('0')
        && lead.chars().all(|c| c.is_ascii_digit());
    let mut rest = groups.peekable();
    lead_ok
        && rest.peek().is_some()
        && rest.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

/// Reads every row after the decorative header block and checks the table is wide
/// enough for the layout. Narrow individual rows are left for the row parser to skip.
pub(crate) fn read_data_rows(
    parser: &'static str,
    content: &str,
    delimiter: Delimiter,
    header_rows: usize,
    min_columns: usize,
) -> Result<Vec<StringRecord>, ParserError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| ParserError::Csv {
            parser,
            source: err,
        })?;
        if row_idx < header_rows {
            continue;
        }
        rows.push(record);
    }

    if rows.is_empty() {
        return Err(ParserError::EmptyData { parser });
    }

    let widest = rows.iter().map(StringRecord::len).max().unwrap_or(0);
    if widest < min_columns {
        return Err(ParserError::FormatMismatch {
            parser,
            reason: format!(
                "expected at least {min_columns} columns, widest data row has {widest}"
            ),
        });
    }

    Ok(rows)
}

pub(crate) fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

pub(crate) fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).map(str::trim).unwrap_or_default()
}

/// Machine identifiers come through spreadsheets as text or as floats (`"29.0"`,
/// `"29,0"`). Both tables go through this so their keys line up.
pub(crate) fn normalize_machine_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }
    if let Some((integral, fraction)) = trimmed.rsplit_once(['.', ',']) {
        let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if is_digits(integral) && is_digits(fraction) && fraction.chars().all(|c| c == '0') {
            return Some(integral.to_string());
        }
    }
    Some(trimmed.to_string())
}

pub(crate) fn is_banner(machine: &str, markers: &[String]) -> bool {
    let folded = fold_label(machine);
    markers
        .iter()
        .any(|marker| !marker.is_empty() && folded.contains(&fold_label(marker)))
}

/// Parses `1.234,5`, `1,234.5`, `72,5` and `72.5`. Whichever separator appears last
/// is the decimal separator.
pub(crate) fn parse_localized_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }

    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn parse_percentage(value: &str, scale: BareNumberScale) -> Option<f64> {
    let trimmed = value.trim();
    let (body, explicit_percent) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    };
    let number = parse_localized_number(body)?;
    if explicit_percent || scale == BareNumberScale::Percent {
        Some(number / 100.0)
    } else {
        Some(number)
    }
}

/// `"1"`, `"2.0"`, `"2,0"`, `"3"`. Float cells must still be integral.
pub(crate) fn parse_shift_code(value: &str) -> Result<Shift, DropReason> {
    let code = parse_localized_number(value).filter(|v| v.fract() == 0.0);
    match code.map(|v| v as i64) {
        Some(1) => Ok(Shift::A),
        Some(2) => Ok(Shift::B),
        Some(3) => Ok(Shift::C),
        _ => Err(DropReason::UnknownShift),
    }
}

pub(crate) fn parse_hour(value: &str) -> Result<u8, DropReason> {
    let trimmed = value.trim();
    let hour = if let Some((hours, _minutes)) = trimmed.split_once(':') {
        hours.trim().parse::<u8>().ok()
    } else {
        parse_localized_number(trimmed)
            .filter(|v| v.fract() == 0.0 && *v >= 0.0)
            .map(|v| v as u8)
    };
    hour.filter(|h| *h <= 23).ok_or(DropReason::InvalidHour)
}

const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<u64> = 20_000..=80_000;

/// Day-first dates with any of `/`, `-`, `.` as separator and an optional time part,
/// year-first ISO dates, or Excel serial day numbers. Formats may be mixed freely.
pub(crate) fn parse_day_first_date(value: &str) -> Result<NaiveDate, DropReason> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DropReason::InvalidDate);
    }

    if let Some(date) = parse_excel_serial(trimmed) {
        return Ok(date);
    }

    let date_part = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();
    let segments: Vec<&str> = date_part
        .split(|c: char| matches!(c, '/' | '-' | '.'))
        .collect();
    if segments.len() != 3
        || segments
            .iter()
            .any(|s| s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(DropReason::InvalidDate);
    }

    let (year, month, day) = if segments[0].len() == 4 {
        (segments[0], segments[1], segments[2])
    } else {
        (segments[2], segments[1], segments[0])
    };

    let mut year: i32 = year.parse().map_err(|_| DropReason::InvalidDate)?;
    if segments[0].len() != 4 && segments[2].len() == 2 {
        year += if year < 70 { 2000 } else { 1900 };
    }
    let month: u32 = month.parse().map_err(|_| DropReason::InvalidDate)?;
    let day: u32 = day.parse().map_err(|_| DropReason::InvalidDate)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or(DropReason::InvalidDate)
}

fn parse_excel_serial(value: &str) -> Option<NaiveDate> {
    let serial = parse_localized_number(value)?;
    if serial.fract() != 0.0 || serial < 0.0 {
        return None;
    }
    let serial = serial as u64;
    if !EXCEL_SERIAL_RANGE.contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial))
}

/// Lower-cases and strips the Portuguese diacritics found in stoppage labels so
/// `"FIM DE PRODUÇÃO"` matches the keyword `"fim de producao"`.
pub fn fold_label(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Spreadsheet exports are UTF-8 (sometimes with a BOM) or Windows-1252. Latin-1
/// decoding is close enough for the latter: every letter used in labels maps the same.
pub fn decode_export(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
