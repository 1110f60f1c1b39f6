//! Boundary with the log-following client.
//!
//! The replication protocol itself is handled by an external client; the
//! relay only needs parsed row events and position notifications. A client
//! drives an [`EventHandler`] through the [`LogSource`] trait.
//!
//! [`NdjsonSource`] is the bundled adapter: it reads events that an external
//! binlog reader has already parsed, one JSON object per line:
//!
//! ```text
//! {"type":"position","name":"bin.000003","pos":157}
//! {"type":"rows","table":"users","action":"insert",
//!  "columns":[{"name":"id","type":"int(11)"},{"name":"avatar","type":"blob"}],
//!  "rows":[[1,{"$bytes":"iVBORw0K"}]]}
//! ```
//!
//! JSON numbers are kept as numeric tokens, `{"$bytes": "<base64>"}` carries
//! raw byte payloads and `{"$time": "..."}` a structured time value.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::{debug, info, trace, warn};

use super::types::{Action, ColumnKind, ColumnMeta, Position, RawValue, RowsEvent};
use crate::Result;

/// Callbacks invoked by a log source.
///
/// The source pauses reading while a callback runs, so implementations must
/// return quickly.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_rows(&self, event: RowsEvent) -> Result<()>;

    async fn on_position_synced(&self, position: Position) -> Result<()>;
}

#[async_trait]
pub trait LogSource: Send {
    /// Follows the log from `start`, invoking `handler` for every event.
    ///
    /// Returns when the source is exhausted; an `Err` means the source is
    /// permanently lost.
    async fn run_from(&mut self, start: Position, handler: &dyn EventHandler) -> Result<()>;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SourceLine {
    Rows {
        table: String,
        action: Action,
        columns: Vec<ColumnLine>,
        #[serde(default)]
        rows: Vec<Vec<Value>>,
    },
    Position {
        name: String,
        pos: u32,
    },
}

#[derive(Debug, Deserialize)]
struct ColumnLine {
    name: String,
    #[serde(rename = "type", default)]
    column_type: Option<String>,
    #[serde(default)]
    kind: Option<ColumnKind>,
}

impl ColumnLine {
    fn into_meta(self) -> ColumnMeta {
        let kind = match (self.kind, self.column_type.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(column_type)) => ColumnKind::from_column_type(column_type),
            (None, None) => ColumnKind::Other,
        };
        ColumnMeta::new(self.name, kind)
    }
}

/// Reads pre-parsed binlog events as newline-delimited JSON.
pub struct NdjsonSource<R> {
    reader: R,
    lines_read: u64,
}

impl<R> NdjsonSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            lines_read: 0,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl NdjsonSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl NdjsonSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

#[async_trait]
impl<R> LogSource for NdjsonSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn run_from(&mut self, start: Position, handler: &dyn EventHandler) -> Result<()> {
        info!(start = %start, "Following log");

        let mut caught_up = start.is_bootstrap();
        let mut lines = (&mut self.reader).lines();

        while let Some(line) = lines.next_line().await? {
            self.lines_read += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parsed = match serde_json::from_str::<SourceLine>(line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(line = self.lines_read, error = %e, "Skipping malformed event line");
                    continue;
                }
            };

            match parsed {
                SourceLine::Position { name, pos } => {
                    let position = Position::new(name, pos);
                    if !caught_up {
                        if position.is_before(&start) {
                            trace!(position = %position, "Skipping position before start");
                            continue;
                        }
                        debug!(position = %position, "Reached start position");
                        caught_up = true;
                    }
                    handler.on_position_synced(position).await?;
                }
                SourceLine::Rows {
                    table,
                    action,
                    columns,
                    rows,
                } => {
                    if !caught_up {
                        trace!(table = %table, "Skipping rows before start position");
                        continue;
                    }
                    let event = RowsEvent {
                        table,
                        action,
                        columns: columns.into_iter().map(ColumnLine::into_meta).collect(),
                        rows: rows
                            .into_iter()
                            .map(|row| row.into_iter().map(raw_value_from_json).collect())
                            .collect(),
                    };
                    handler.on_rows(event).await?;
                }
            }
        }

        info!(lines = self.lines_read, "Log source exhausted");
        Ok(())
    }
}

fn raw_value_from_json(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(b),
        Value::Number(n) => RawValue::Numeric(n.to_string()),
        Value::String(s) => RawValue::Text(s),
        Value::Object(map) if map.len() == 1 => {
            if let Some(Value::String(encoded)) = map.get("$bytes") {
                return match BASE64.decode(encoded) {
                    Ok(bytes) => RawValue::Bytes(bytes),
                    Err(e) => {
                        warn!(error = %e, "Invalid $bytes payload, keeping it as text");
                        RawValue::Text(encoded.clone())
                    }
                };
            }
            if let Some(Value::String(time)) = map.get("$time") {
                return RawValue::Time(time.clone());
            }
            RawValue::Text(Value::Object(map).to_string())
        }
        other => RawValue::Text(other.to_string()),
    }
}
