// Parsing and formatting helpers for cell values.
//
// Everything that touches the textual representation of dates, money and
// numbers lives here so the stage modules can work with typed values.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;

/// Month-first date layouts, tried in order.
const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

/// Fallbacks for values whose first component cannot be a month.
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y"];

const TIME_SUFFIXES: &[&str] = &[" %H:%M", " %H:%M:%S", "T%H:%M:%S"];

// Every month-first layout combined with every accepted time suffix.
static DATETIME_FORMATS: Lazy<Vec<String>> = Lazy::new(|| {
    MONTH_FIRST_FORMATS
        .iter()
        .flat_map(|d| TIME_SUFFIXES.iter().map(move |t| format!("{d}{t}")))
        .collect()
});

/// Parse a calendar date from any of the supported layouts.
///
/// Month-first readings always win; day-first layouts are only consulted
/// when no month-first layout matches, so `13/05/24` is 13 May while
/// `03/05/24` is 5 March.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let year_first = starts_with_year(s);
    let usable = |fmt: &str| year_first || !fmt.starts_with("%Y");
    for fmt in MONTH_FIRST_FORMATS.iter().copied().filter(|f| usable(f)) {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS.iter().filter(|f| usable(f)) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DAY_FIRST_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

// `%Y` accepts any digit count, so year-first layouts are only tried when
// the value actually opens with a four-digit year.
fn starts_with_year(s: &str) -> bool {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    digits == 4
}

pub fn format_date(d: NaiveDate, fmt: &str) -> String {
    d.format(fmt).to_string()
}

/// Parse a money cell such as `$1,234.50`, `-$5`, or a bare `12.5`.
pub fn parse_currency(s: &str) -> Option<f64> {
    let s = s.trim();
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let rest = rest.strip_prefix('$').unwrap_or(rest);
    let v = parse_numeric(rest)?;
    Some(if neg { -v } else { v })
}

/// Parse a plain number, tolerating thousands separators.
///
/// Values containing letters (`nan`, `inf`, `12abc`) are rejected even
/// though `f64::from_str` would accept some of them.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok()
}

/// Round to `decimals` places, ties to even.
///
/// Rounds the exact binary value: `2.675` is stored just below the tie and
/// becomes `2.67`, while `0.005` is stored just above it and becomes `0.01`.
/// Scaling by a power of ten first would round twice.
pub fn round_half_even(n: f64, decimals: u32) -> f64 {
    format!("{:.*}", decimals as usize, n).parse().unwrap_or(n)
}

/// Render a float the way the upstream tabular exports do: whole values keep
/// a trailing `.0`, everything else uses the shortest round-trip form.
pub fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

/// Render a fee: whole amounts print as integers (`126`), fractional ones
/// fall back to `format_float`.
pub fn format_fee(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format_float(n)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `9,855 rows`.
    n.to_formatted_string(&Locale::en)
}
