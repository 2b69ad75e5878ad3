//! Free-form date and salary text to canonical strings.
//!
//! Nothing here fails: unparseable input becomes an empty string and it is up
//! to the caller to decide whether an empty field is acceptable.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

lazy_static! {
    // ASCII digits only: the date branches slice matched text by byte offset.
    static ref FLOAT_ARTIFACT: Regex = Regex::new(r"^[0-9]+\.0$").unwrap();
    static ref EIGHT_DIGITS: Regex = Regex::new(r"^[0-9]{8}$").unwrap();
    static ref SIX_DIGITS: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
    static ref YMD_PREFIX: Regex = Regex::new(r"^([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})").unwrap();
    static ref MDY: Regex = Regex::new(r"^([0-9]{1,2})-([0-9]{1,2})-([0-9]{4})$").unwrap();
    static ref FIRST_NUMBER: Regex = Regex::new(r"[0-9]+(?:\.[0-9]+)?").unwrap();
}

/// Two-digit years up to and including this one belong to the 2000s.
const PIVOT_YEAR: i32 = 69;

/// Korean "ten thousand" unit marker.
const MAN_UNIT: char = '만';
/// Korean currency unit marker.
const WON_UNIT: char = '원';

const TEXTUAL_FORMATS: [&str; 4] = ["%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y"];

fn is_blank(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("nan")
}

fn ymd(year: i32, month: u32, day: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Canonicalize a date to `YYYY-MM-DD`.
///
/// Accepts `YYYYMMDD`, `YYMMDD` (pivot year 69), `.`, `/` or `-` delimited
/// `YYYY-M-D` (anything after the day is ignored), `M-D-YYYY`, and English
/// month names. A trailing `.0` left by spreadsheet float coercion is dropped.
/// Returns an empty string for blank, unparseable or impossible dates, and
/// for digits outside ASCII (full-width input from an IME).
///
/// # Examples
/// ```
/// use insa_db::normalize::normalize_date;
///
/// assert_eq!(normalize_date("20250811"), "2025-08-11");
/// assert_eq!(normalize_date("700101"), "1970-01-01");
/// assert_eq!(normalize_date("2025.13.01"), "");
/// ```
pub fn normalize_date(raw: &str) -> String {
    let mut s = raw.trim().to_string();
    if is_blank(&s) {
        return String::new();
    }
    if FLOAT_ARTIFACT.is_match(&s) {
        s.truncate(s.len() - 2);
    }
    let s = s.replace(['.', '/'], "-");

    if EIGHT_DIGITS.is_match(&s) {
        let (y, m, d) = (&s[..4], &s[4..6], &s[6..8]);
        return match (y.parse(), m.parse(), d.parse()) {
            (Ok(y), Ok(m), Ok(d)) => ymd(y, m, d),
            _ => String::new(),
        };
    }

    if SIX_DIGITS.is_match(&s) {
        let (yy, m, d) = (&s[..2], &s[2..4], &s[4..6]);
        return match (yy.parse::<i32>(), m.parse(), d.parse()) {
            (Ok(yy), Ok(m), Ok(d)) => {
                let year = if yy <= PIVOT_YEAR { 2000 + yy } else { 1900 + yy };
                ymd(year, m, d)
            }
            _ => String::new(),
        };
    }

    if let Some(caps) = YMD_PREFIX.captures(&s) {
        return match (caps[1].parse(), caps[2].parse(), caps[3].parse()) {
            (Ok(y), Ok(m), Ok(d)) => ymd(y, m, d),
            _ => String::new(),
        };
    }

    if let Some(caps) = MDY.captures(&s) {
        return match (caps[3].parse(), caps[1].parse(), caps[2].parse()) {
            (Ok(y), Ok(m), Ok(d)) => ymd(y, m, d),
            _ => String::new(),
        };
    }

    // The delimiter rewrite above would break "Aug. 11, 2025" style input, so
    // textual dates are tried against the trimmed original.
    let original = raw.trim();
    TEXTUAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(original, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Canonicalize a salary to a whole-won integer string.
///
/// Separators and whitespace are removed and the first number is taken. A
/// `만` marker multiplies by 10,000; a `원` marker, a value of at least
/// 100,000, or an integer part of five or more digits is taken as already in
/// won; anything smaller is assumed to be in units of 만.
///
/// The magnitude guess cannot be made unambiguous and is kept as is for
/// compatibility with existing sheets.
///
/// Only ASCII digits count, so full-width input reads as having no number.
/// Amounts beyond `i64::MAX` won are clamped to `i64::MAX`.
///
/// # Examples
/// ```
/// use insa_db::normalize::normalize_salary;
///
/// assert_eq!(normalize_salary("3000만원"), "30000000");
/// assert_eq!(normalize_salary("30,000,000"), "30000000");
/// assert_eq!(normalize_salary("3000"), "30000000");
/// ```
pub fn normalize_salary(raw: &str) -> String {
    let s = raw.trim();
    if is_blank(s) {
        return String::new();
    }
    let compact: String = s
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    let Some(token) = FIRST_NUMBER.find(&compact) else {
        return String::new();
    };
    let Ok(num) = token.as_str().parse::<f64>() else {
        return String::new();
    };

    let amount = if compact.contains(MAN_UNIT) {
        num * 10_000.0
    } else if compact.contains(WON_UNIT) || num >= 100_000.0 {
        num
    } else if integer_digits(num) >= 5 {
        num
    } else {
        num * 10_000.0
    };

    let rounded = amount.round_ties_even();
    if rounded >= i64::MAX as f64 {
        warn!("Salary {:?} exceeds {} won; clamped", raw, i64::MAX);
    }
    format!("{}", rounded as i64)
}

fn integer_digits(num: f64) -> usize {
    (num.trunc() as i64).to_string().len()
}

/// Drop a trailing `.0` that spreadsheet float coercion leaves on numeric text.
pub fn strip_float_suffix(raw: &str) -> String {
    raw.strip_suffix(".0").unwrap_or(raw).to_string()
}
