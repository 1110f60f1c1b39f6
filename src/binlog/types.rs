use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::Result;

/// Smallest valid offset in a binlog file; offsets below it fall inside the
/// file header.
pub const MIN_LOG_OFFSET: u32 = 4;

/// Position in the replicated log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub name: String,
    pub pos: u32,
}

impl Position {
    pub fn new(name: impl Into<String>, pos: u32) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }

    /// Start of the available log: empty log name, first valid offset.
    pub fn bootstrap() -> Self {
        Self::new("", MIN_LOG_OFFSET)
    }

    pub fn is_bootstrap(&self) -> bool {
        self.name.is_empty()
    }

    /// True if `self` lies strictly before `other` in log order.
    ///
    /// Binlog file names carry a zero-padded sequence suffix, so names
    /// compare lexicographically.
    pub fn is_before(&self, other: &Position) -> bool {
        (self.name.as_str(), self.pos) < (other.name.as_str(), other.pos)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.name, self.pos)
    }
}

/// Closed set of column kinds the normalizer knows how to coerce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Date,
    DateTime,
    Boolean,
    Bit,
    Float,
    Integer,
    Other,
}

impl ColumnKind {
    /// Classifies a MySQL column type such as `varchar(255)` or `tinyint(1)`.
    pub fn from_column_type(raw_type: &str) -> Self {
        let raw_type = raw_type.trim().to_ascii_lowercase();
        if raw_type == "tinyint(1)" || raw_type.starts_with("tinyint(1) ") {
            return ColumnKind::Boolean;
        }

        let base = raw_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match base {
            "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" | "enum"
            | "set" => ColumnKind::Text,
            "date" => ColumnKind::Date,
            "datetime" | "timestamp" => ColumnKind::DateTime,
            "bit" => ColumnKind::Bit,
            "float" | "double" | "real" | "decimal" | "numeric" => ColumnKind::Float,
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => {
                ColumnKind::Integer
            }
            _ => ColumnKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A column value as handed over by the log source, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Arbitrary-precision numeric literal, kept as its textual token.
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    /// Structured time value already rendered by the source.
    Time(String),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => f.write_str("NULL"),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Int(i) => write!(f, "{}", i),
            RawValue::UInt(u) => write!(f, "{}", u),
            RawValue::Float(v) => write!(f, "{}", v),
            RawValue::Numeric(t) | RawValue::Text(t) | RawValue::Time(t) => f.write_str(t),
            RawValue::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Insert,
    Update,
    Delete,
}

/// One row-change notification from the log source.
///
/// For updates, `rows` interleaves before/after images:
/// `[before_1, after_1, before_2, after_2, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsEvent {
    pub table: String,
    pub action: Action,
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<RawValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub table: String,
}

/// Normalized before/after snapshot of one row mutation.
///
/// This is also the queue item and HTTP body encoding:
/// `{"before": {...}|null, "after": {...}|null, "source": {"table": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub before: Option<Map<String, Value>>,
    pub after: Option<Map<String, Value>>,
    pub source: SourceInfo,
}

impl ChangeRecord {
    pub fn insert(table: impl Into<String>, after: Map<String, Value>) -> Self {
        Self {
            before: None,
            after: Some(after),
            source: SourceInfo {
                table: table.into(),
            },
        }
    }

    pub fn update(
        table: impl Into<String>,
        before: Map<String, Value>,
        after: Map<String, Value>,
    ) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
            source: SourceInfo {
                table: table.into(),
            },
        }
    }

    pub fn table(&self) -> &str {
        &self.source.table
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    pub fn decode(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(Into::into)
    }
}
