use csv::StringRecord;
use std::str::FromStr;
use thiserror::Error;

/// A single column that failed to decode as its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{column}': expected {expected}, got '{value}'")]
pub struct FieldError {
    pub column: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Numeric types a trace column can hold.
///
/// Floats must be finite so that no "not-a-number" sentinel ever enters a
/// record; a missing value is modelled as absence instead.
pub trait TraceNumber: FromStr + Copy {
    const EXPECTED: &'static str;

    fn accept(self) -> bool {
        true
    }
}

impl TraceNumber for i64 {
    const EXPECTED: &'static str = "integer";
}

impl TraceNumber for f64 {
    const EXPECTED: &'static str = "finite number";

    fn accept(self) -> bool {
        self.is_finite()
    }
}

/// Tri-state column used where a bad value is classified rather than fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Present(T),
    Absent,
    Unparsable(String),
}

impl<T: TraceNumber> Field<T> {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Field::Absent;
        }
        match trimmed.parse::<T>() {
            Ok(value) if value.accept() => Field::Present(value),
            _ => Field::Unparsable(raw.to_string()),
        }
    }
}

impl Field<i64> {
    /// Parse a count or identifier. Integer literals are taken as is; other
    /// numeric literals (`3.0`, `1e1`) are accepted when they are finite,
    /// whole and within `i64` range.
    pub fn parse_whole(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Field::Absent;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Field::Present(value);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if is_whole_i64(value) => Field::Present(value as i64),
            _ => Field::Unparsable(raw.to_string()),
        }
    }
}

fn is_whole_i64(value: f64) -> bool {
    // i64::MAX is not representable; 2^63 is the first value out of range.
    value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < 9_223_372_036_854_775_808.0
}

impl<T: Copy> Field<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Field::Present(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

pub fn required<T: TraceNumber>(
    record: &StringRecord,
    index: usize,
    column: &'static str,
) -> Result<T, FieldError> {
    match optional(record, index, column)? {
        Some(value) => Ok(value),
        None => Err(FieldError {
            column,
            value: String::new(),
            expected: T::EXPECTED,
        }),
    }
}

pub fn optional<T: TraceNumber>(
    record: &StringRecord,
    index: usize,
    column: &'static str,
) -> Result<Option<T>, FieldError> {
    match Field::<T>::parse(cell(record, index)) {
        Field::Present(value) => Ok(Some(value)),
        Field::Absent => Ok(None),
        Field::Unparsable(value) => Err(FieldError {
            column,
            value,
            expected: T::EXPECTED,
        }),
    }
}

pub fn tri_state<T: TraceNumber>(record: &StringRecord, index: usize) -> Field<T> {
    Field::parse(cell(record, index))
}

pub fn whole_number(record: &StringRecord, index: usize) -> Field<i64> {
    Field::<i64>::parse_whole(cell(record, index))
}

pub fn text(record: &StringRecord, index: usize) -> String {
    cell(record, index).to_string()
}

pub fn optional_text(record: &StringRecord, index: usize) -> Option<String> {
    let value = cell(record, index);
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
