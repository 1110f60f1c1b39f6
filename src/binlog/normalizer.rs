//! Conversion of raw row images into [`ChangeRecord`]s.
//!
//! Coercion is driven by [`ColumnKind`]: every kind is bound to one pure
//! function in [`coercion_for`]. A coercion never fails; when a value cannot
//! be converted the raw value is passed through instead, so one bad column
//! never aborts the rest of the row or the event.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};
use std::slice;
use tracing::{debug, trace};

use super::types::{Action, ChangeRecord, ColumnKind, ColumnMeta, RawValue, RowsEvent};

pub type Coercion = fn(&RawValue) -> Value;

/// Returns the coercion bound to a column kind.
pub fn coercion_for(kind: ColumnKind) -> Coercion {
    match kind {
        ColumnKind::Text => coerce_text,
        ColumnKind::Date => coerce_date,
        ColumnKind::DateTime => passthrough,
        ColumnKind::Boolean => coerce_boolean,
        ColumnKind::Bit => coerce_bit,
        ColumnKind::Float => coerce_float,
        ColumnKind::Integer => coerce_integer,
        ColumnKind::Other => passthrough,
    }
}

/// Coerces one raw value. `NULL` stays `null` for every kind.
pub fn coerce(kind: ColumnKind, raw: &RawValue) -> Value {
    if raw.is_null() {
        return Value::Null;
    }
    coercion_for(kind)(raw)
}

/// Converts a raw value to JSON without any kind-specific interpretation.
///
/// Byte payloads are emitted as base64 text, the usual JSON rendering of
/// binary data.
pub fn passthrough(raw: &RawValue) -> Value {
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Int(i) => Value::from(*i),
        RawValue::UInt(u) => Value::from(*u),
        RawValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        RawValue::Numeric(token) => numeric_token(token),
        RawValue::Text(s) | RawValue::Time(s) => Value::String(s.clone()),
        RawValue::Bytes(b) => Value::String(BASE64.encode(b)),
    }
}

/// Integers that fit 64 bits and finite decimals become JSON numbers; any
/// other token is kept verbatim as a string rather than rounded.
fn numeric_token(token: &str) -> Value {
    let trimmed = token.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Value::from(u);
    }
    let is_decimal = trimmed.contains(['.', 'e', 'E']);
    match trimmed.parse::<f64>().ok().filter(|_| is_decimal).and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(token.to_string()),
    }
}

fn coerce_text(raw: &RawValue) -> Value {
    match raw {
        RawValue::Bytes(bytes) => {
            let decoded = BASE64
                .decode(bytes)
                .ok()
                .and_then(|d| String::from_utf8(d).ok());
            match decoded {
                Some(text) => Value::String(text),
                None => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            }
        }
        other => passthrough(other),
    }
}

fn coerce_date(raw: &RawValue) -> Value {
    let text = raw.to_string();
    if !is_iso_date_shape(&text) {
        return Value::String(text);
    }
    match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        Ok(date) => {
            let midnight = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
            Value::String(midnight.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        Err(_) => Value::String(text),
    }
}

/// `YYYY-MM-DD` with zero padding; chrono alone also accepts `2023-7-1`.
fn is_iso_date_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn coerce_boolean(raw: &RawValue) -> Value {
    Value::Bool(matches!(raw, RawValue::Bool(true)) || is_numeric_one(raw))
}

fn coerce_bit(raw: &RawValue) -> Value {
    match raw {
        RawValue::Bytes(bytes) => Value::Bool(bytes.first().is_some_and(|b| *b != 0)),
        RawValue::Bool(b) => Value::Bool(*b),
        other => Value::Bool(is_numeric_one(other)),
    }
}

fn coerce_float(raw: &RawValue) -> Value {
    if let RawValue::Numeric(token) = raw {
        if let Some(n) = token.trim().parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    passthrough(raw)
}

fn coerce_integer(raw: &RawValue) -> Value {
    if let RawValue::Numeric(token) = raw {
        if let Ok(n) = token.trim().parse::<i64>() {
            return Value::from(n);
        }
    }
    passthrough(raw)
}

fn is_numeric_one(raw: &RawValue) -> bool {
    match raw {
        RawValue::Int(i) => *i == 1,
        RawValue::UInt(u) => *u == 1,
        RawValue::Float(f) => *f == 1.0,
        RawValue::Numeric(token) => token.trim().parse::<f64>().is_ok_and(|f| f == 1.0),
        _ => false,
    }
}

/// Coerces a single row image into a column-name keyed map.
///
/// Values are aligned with `columns` by index; surplus values without
/// metadata are ignored.
pub fn normalize_row(
    table: &str,
    columns: &[ColumnMeta],
    row: &[RawValue],
) -> Map<String, Value> {
    let mut result = Map::with_capacity(columns.len());
    for (column, raw) in columns.iter().zip(row) {
        let value = coerce(column.kind, raw);
        trace!(
            table = %table,
            column = %column.name,
            kind = ?column.kind,
            original = ?raw,
            coerced = %value,
            "Processed column"
        );
        result.insert(column.name.clone(), value);
    }
    result
}

/// Lazily turns a rows event into change records.
///
/// Inserts yield one record per row. Updates consume rows in
/// before/after pairs; an unpaired trailing row is dropped. Deletes yield
/// nothing.
pub fn normalize(event: &RowsEvent) -> ChangeRecords<'_> {
    ChangeRecords {
        table: &event.table,
        action: event.action,
        columns: &event.columns,
        rows: event.rows.iter(),
    }
}

pub struct ChangeRecords<'a> {
    table: &'a str,
    action: Action,
    columns: &'a [ColumnMeta],
    rows: slice::Iter<'a, Vec<RawValue>>,
}

impl Iterator for ChangeRecords<'_> {
    type Item = ChangeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self.action {
            Action::Insert => {
                let row = self.rows.next()?;
                Some(ChangeRecord::insert(
                    self.table,
                    normalize_row(self.table, self.columns, row),
                ))
            }
            Action::Update => {
                let before = self.rows.next()?;
                let Some(after) = self.rows.next() else {
                    debug!(table = %self.table, "Dropping unpaired trailing row in update event");
                    return None;
                };
                Some(ChangeRecord::update(
                    self.table,
                    normalize_row(self.table, self.columns, before),
                    normalize_row(self.table, self.columns, after),
                ))
            }
            Action::Delete => None,
        }
    }
}
