//! Cell values, target types and the caster that moves between them.
//!
//! ## Precedence
//!
//! Inference tries types in a fixed order and keeps the first that parses:
//!
//! | rank | type       | accepts                                             |
//! |------|------------|-----------------------------------------------------|
//! | 1    | `Int`      | base-10 integers, no fraction or exponent           |
//! | 2    | `Float`    | anything `f64` parses                               |
//! | 3    | `Complex`  | numbers carrying an `i`/`j` imaginary marker        |
//! | 4    | `Time`     | strings matching one of [`Formats::time`]           |
//! | 5    | `Date`     | strings matching one of [`Formats::date`]           |
//! | 6    | `DateTime` | strings matching one of [`Formats::datetime`]       |
//! | 7    | `Str`      | everything                                          |
//!
//! Numeric parsing ignores surrounding whitespace. Temporal parsing walks the
//! format lists in order, so earlier formats win for ambiguous strings such as
//! `01/02/2024` (month first).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_complex::Complex64;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A target type a column can be cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Int,
    Float,
    Complex,
    Time,
    Date,
    DateTime,
    Str,
}

impl CellType {
    /// Inference order, narrowest first.
    pub const PRECEDENCE: [CellType; 7] = [
        CellType::Int,
        CellType::Float,
        CellType::Complex,
        CellType::Time,
        CellType::Date,
        CellType::DateTime,
        CellType::Str,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CellType::Int => "int",
            CellType::Float => "float",
            CellType::Complex => "complex",
            CellType::Time => "time",
            CellType::Date => "date",
            CellType::DateTime => "datetime",
            CellType::Str => "str",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, CellType::Int | CellType::Float | CellType::Complex)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, CellType::Time | CellType::Date | CellType::DateTime)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed cell.
///
/// Ints and floats compare with each other numerically; floats use a total
/// order so `NaN` sorts above every number. Complex values only support
/// equality. Values of unrelated types are unordered and unequal.
#[derive(Debug, Clone)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Complex(Complex64),
    Time(NaiveTime),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Str(String),
}

impl CellValue {
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Int(_) => CellType::Int,
            CellValue::Float(_) => CellType::Float,
            CellValue::Complex(_) => CellType::Complex,
            CellValue::Time(_) => CellType::Time,
            CellValue::Date(_) => CellType::Date,
            CellValue::DateTime(_) => CellType::DateTime,
            CellValue::Str(_) => CellType::Str,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Ints widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use CellValue::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => Some(OrderedFloat(*a).cmp(&OrderedFloat(*b))),
            (Int(a), Float(b)) => Some(OrderedFloat(*a as f64).cmp(&OrderedFloat(*b))),
            (Float(a), Int(b)) => Some(OrderedFloat(*a).cmp(&OrderedFloat(*b as f64))),
            (Complex(a), Complex(b)) => (a == b).then_some(Ordering::Equal),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Str(a), Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Complex(v) => write!(f, "{v}"),
            CellValue::Time(v) => write!(f, "{v}"),
            CellValue::Date(v) => write!(f, "{v}"),
            CellValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            CellValue::Str(v) => f.write_str(v),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Int(v) => serializer.serialize_i64(*v),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Str(v) => serializer.serialize_str(v),
            other => serializer.collect_str(other),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<Complex64> for CellValue {
    fn from(v: Complex64) -> Self {
        CellValue::Complex(v)
    }
}

impl From<NaiveTime> for CellValue {
    fn from(v: NaiveTime) -> Self {
        CellValue::Time(v)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(v: NaiveDate) -> Self {
        CellValue::Date(v)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::DateTime(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Str(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Str(v)
    }
}

/// Ordered `strftime` format lists for temporal parsing.
///
/// The lists are plain data: push to them to recognise additional layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formats {
    pub time: Vec<String>,
    pub date: Vec<String>,
    pub datetime: Vec<String>,
}

impl Default for Formats {
    fn default() -> Self {
        Self::standard()
    }
}

impl Formats {
    /// Month/day/year permutations over common separators, then year-first ISO layouts.
    pub fn standard() -> Self {
        let time = standard_times();
        let date = standard_dates();
        let mut datetime = Vec::with_capacity(date.len() * time.len() + 1);
        for d in &date {
            for t in &time {
                datetime.push(format!("{d} {t}"));
            }
        }
        datetime.push("%Y-%m-%dT%H:%M:%S%.f".to_string());
        Self {
            time,
            date,
            datetime,
        }
    }

    pub fn empty() -> Self {
        Self {
            time: Vec::new(),
            date: Vec::new(),
            datetime: Vec::new(),
        }
    }

    pub fn parse_time(&self, raw: &str) -> Option<NaiveTime> {
        self.parse_time_hinted(raw, &mut None)
    }

    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        self.parse_date_hinted(raw, &mut None)
    }

    pub fn parse_datetime(&self, raw: &str) -> Option<NaiveDateTime> {
        self.parse_datetime_hinted(raw, &mut None)
    }

    fn parse_time_hinted(&self, raw: &str, hint: &mut Option<usize>) -> Option<NaiveTime> {
        let raw = raw.trim();
        if raw.matches(':').count() < 2 {
            return None;
        }
        first_match(raw, &self.time, hint, NaiveTime::parse_from_str)
    }

    fn parse_date_hinted(&self, raw: &str, hint: &mut Option<usize>) -> Option<NaiveDate> {
        let raw = raw.trim();
        if !raw.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        first_match(raw, &self.date, hint, NaiveDate::parse_from_str)
    }

    fn parse_datetime_hinted(&self, raw: &str, hint: &mut Option<usize>) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.matches(':').count() < 2 || !raw.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        first_match(raw, &self.datetime, hint, NaiveDateTime::parse_from_str)
    }
}

fn standard_times() -> Vec<String> {
    let mut out = vec![
        "%H:%M:%S%.f".to_string(),
        "%H:%M:%S:%3f".to_string(),
        "%H:%M:%S:%6f".to_string(),
    ];
    for sep in ["", " "] {
        out.push(format!("%I:%M:%S%.f{sep}%p"));
        out.push(format!("%I:%M:%S:%3f{sep}%p"));
        out.push(format!("%I:%M:%S:%6f{sep}%p"));
    }
    out
}

fn standard_dates() -> Vec<String> {
    let mut out = Vec::new();
    for month in ["%m", "%b", "%B"] {
        for sep in [" ", "/", "-", "."] {
            // two-digit years first: %Y would also accept them as years 0-99
            for year in ["%y", "%Y"] {
                out.push(format!("{month}{sep}%d{sep}{year}"));
                out.push(format!("%d{sep}{month}{sep}{year}"));
            }
        }
    }
    // year-first layouts last: %Y also accepts a leading two-digit field
    out.push("%Y-%m-%d".to_string());
    out.push("%Y/%m/%d".to_string());
    out
}

/// Try the hinted format first, then the rest in order, updating the hint.
fn first_match<T>(
    raw: &str,
    formats: &[String],
    hint: &mut Option<usize>,
    parse: impl Fn(&str, &str) -> chrono::ParseResult<T>,
) -> Option<T> {
    if let Some(i) = *hint
        && let Some(fmt) = formats.get(i)
        && let Ok(v) = parse(raw, fmt)
    {
        return Some(v);
    }
    for (i, fmt) in formats.iter().enumerate() {
        if Some(i) == *hint {
            continue;
        }
        if let Ok(v) = parse(raw, fmt) {
            *hint = Some(i);
            return Some(v);
        }
    }
    None
}

/// A raw string that does not parse as the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastFailure {
    pub raw: String,
    pub target: CellType,
    pub reason: String,
}

impl fmt::Display for CastFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot cast '{}' to {}: {}", self.raw, self.target, self.reason)
    }
}

impl std::error::Error for CastFailure {}

fn parse_complex(raw: &str) -> Option<Complex64> {
    let s = raw.trim();
    let s = s
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(s);
    if !s.contains(['i', 'j']) || !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.replace('j', "i").parse::<Complex64>().ok()
}

/// Cast `raw` to `target`.
///
/// Casting to [`CellType::Str`] always succeeds and keeps the raw text.
///
/// # Errors
/// [`CastFailure`] describing why `raw` is not a `target`.
pub fn cast(raw: &str, target: CellType, formats: &Formats) -> Result<CellValue, CastFailure> {
    cast_hinted(raw, target, formats, &mut None)
}

/// [`cast`] with a remembered temporal format index.
///
/// Columns cast repeatedly pass the same `hint` so the format that matched
/// last time is tried first.
///
/// # Errors
/// [`CastFailure`] describing why `raw` is not a `target`.
pub fn cast_hinted(
    raw: &str,
    target: CellType,
    formats: &Formats,
    hint: &mut Option<usize>,
) -> Result<CellValue, CastFailure> {
    let fail = |reason: &str| CastFailure {
        raw: raw.to_string(),
        target,
        reason: reason.to_string(),
    };
    match target {
        CellType::Int => raw
            .trim()
            .parse::<i64>()
            .map(CellValue::Int)
            .map_err(|e| fail(&e.to_string())),
        CellType::Float => raw
            .trim()
            .parse::<f64>()
            .map(CellValue::Float)
            .map_err(|e| fail(&e.to_string())),
        CellType::Complex => parse_complex(raw)
            .map(CellValue::Complex)
            .ok_or_else(|| fail("not a complex number with an imaginary marker")),
        CellType::Time => formats
            .parse_time_hinted(raw, hint)
            .map(CellValue::Time)
            .ok_or_else(|| fail("no time format matched")),
        CellType::Date => formats
            .parse_date_hinted(raw, hint)
            .map(CellValue::Date)
            .ok_or_else(|| fail("no date format matched")),
        CellType::DateTime => formats
            .parse_datetime_hinted(raw, hint)
            .map(CellValue::DateTime)
            .ok_or_else(|| fail("no datetime format matched")),
        CellType::Str => Ok(CellValue::Str(raw.to_string())),
    }
}

/// Convert `raw` to the first type in [`CellType::PRECEDENCE`] that accepts it.
pub fn convert(raw: &str, formats: &Formats) -> CellValue {
    CellType::PRECEDENCE
        .iter()
        .find_map(|&ty| cast(raw, ty, formats).ok())
        .unwrap_or_else(|| CellValue::Str(raw.to_string()))
}

/// The type [`convert`] would produce for `raw`.
pub fn classify(raw: &str, formats: &Formats) -> CellType {
    convert(raw, formats).cell_type()
}

/// True when `raw` parses as an int, float or complex number.
pub fn is_numeric(raw: &str) -> bool {
    let s = raw.trim();
    s.parse::<i64>().is_ok() || s.parse::<f64>().is_ok() || parse_complex(s).is_some()
}

/// True when `raw` parses as a time, date or datetime under `formats`.
pub fn is_temporal(raw: &str, formats: &Formats) -> bool {
    formats.parse_time(raw).is_some()
        || formats.parse_date(raw).is_some()
        || formats.parse_datetime(raw).is_some()
}
