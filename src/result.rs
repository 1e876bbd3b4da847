//! Canonical result shape and the normalizer that produces it from each
//! backend's raw output.
//!
//! Callers branch on the statement kind, never on the backend: a read yields
//! [`Rows`], a write yields a [`WriteOutcome`].

use crate::error::{ClientError, Result};
use crate::statement::StatementKind;
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// One result row: column name to value, in the column order the backend
/// reported.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Pair column names with a positional tuple.
    pub fn zip(columns: &[String], values: Vec<Value>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(ClientError::protocol(format!(
                "row has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self {
            entries: columns.iter().cloned().zip(values).collect(),
        })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn require(&self, column: &str) -> Result<&Value> {
        self.get(column)
            .ok_or_else(|| ClientError::protocol(format!("missing column `{}`", column)))
    }

    pub fn i64(&self, column: &str) -> Result<i64> {
        let value = self.require(column)?;
        value.as_i64().ok_or_else(|| mismatch(column, "integer", value))
    }

    pub fn f64(&self, column: &str) -> Result<f64> {
        let value = self.require(column)?;
        value.as_f64().ok_or_else(|| mismatch(column, "number", value))
    }

    pub fn text(&self, column: &str) -> Result<String> {
        let value = self.require(column)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(column, "text", value))
    }

    /// Absent columns and NULL both read as `None`.
    pub fn opt_i64(&self, column: &str) -> Result<Option<i64>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| mismatch(column, "integer", value)),
        }
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(v)) => Ok(Some(v.clone())),
            Some(other) => Ok(Some(other.to_string())),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &Value) -> ClientError {
    ClientError::protocol(format!(
        "column `{}`: expected {}, found {:?}",
        column, expected, found
    ))
}

impl Serialize for Row {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Output of a read statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Rows {
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

/// Output of a write statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WriteOutcome {
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
    /// Rows produced by the write itself, e.g. `INSERT ... RETURNING`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub returned: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultSet {
    Rows(Rows),
    Write(WriteOutcome),
}

impl ResultSet {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Rows(_) => StatementKind::Read,
            Self::Write(_) => StatementKind::Write,
        }
    }

    pub fn rows(&self) -> Option<&Rows> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Write(_) => None,
        }
    }

    pub fn into_rows(self) -> Result<Rows> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Write(_) => Err(ClientError::protocol("expected a row set, got a write outcome")),
        }
    }

    pub fn into_write(self) -> Result<WriteOutcome> {
        match self {
            Self::Write(outcome) => Ok(outcome),
            Self::Rows(_) => Err(ClientError::protocol("expected a write outcome, got a row set")),
        }
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        match self {
            Self::Write(outcome) => outcome.last_insert_id,
            Self::Rows(_) => None,
        }
    }

    pub fn rows_affected(&self) -> u64 {
        match self {
            Self::Write(outcome) => outcome.rows_affected,
            Self::Rows(_) => 0,
        }
    }
}

/// What the embedded engine reports for one executed statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalRaw {
    pub columns: Vec<String>,
    pub tuples: Vec<Vec<Value>>,
    pub last_insert_rowid: Option<i64>,
    pub changes: u64,
}

/// A backend's result before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Local(LocalRaw),
    /// Full response body of the remote `/execute` call.
    Remote(JsonValue),
}

/// Convert a backend result into the canonical shape for `kind`.
pub fn normalize(raw: RawResult, kind: StatementKind) -> Result<ResultSet> {
    match raw {
        RawResult::Local(local) => normalize_local(local, kind),
        RawResult::Remote(body) => normalize_remote(&body, kind),
    }
}

fn zip_all(columns: &[String], tuples: Vec<Vec<Value>>) -> Result<Vec<Row>> {
    tuples
        .into_iter()
        .map(|tuple| Row::zip(columns, tuple))
        .collect()
}

fn normalize_local(raw: LocalRaw, kind: StatementKind) -> Result<ResultSet> {
    let rows = zip_all(&raw.columns, raw.tuples)?;
    Ok(match kind {
        StatementKind::Read => ResultSet::Rows(Rows {
            columns: raw.columns,
            rows,
        }),
        StatementKind::Write => ResultSet::Write(WriteOutcome {
            last_insert_id: raw.last_insert_rowid,
            rows_affected: raw.changes,
            returned: rows,
        }),
    })
}

fn normalize_remote(body: &JsonValue, kind: StatementKind) -> Result<ResultSet> {
    let results = body
        .get("results")
        .and_then(JsonValue::as_object)
        .ok_or_else(|| ClientError::protocol("response has no `results` object"))?;

    let tabular = match (results.get("columns"), results.get("rows")) {
        (Some(columns), Some(rows)) => Some(remote_rows(columns, rows)?),
        (None, None) => None,
        _ => return Err(ClientError::protocol("`columns` and `rows` must appear together")),
    };

    match kind {
        StatementKind::Read => tabular
            .map(ResultSet::Rows)
            .ok_or_else(|| ClientError::protocol("read response has no `columns`/`rows`")),
        StatementKind::Write => {
            let returned = tabular.map(|t| t.rows).unwrap_or_default();
            let rows_affected = match results.get("rows_affected") {
                Some(n) => n
                    .as_u64()
                    .ok_or_else(|| ClientError::protocol("`rows_affected` is not a count"))?,
                None if !returned.is_empty() => returned.len() as u64,
                None => {
                    return Err(ClientError::protocol("write response has no `rows_affected`"))
                }
            };
            let last_insert_id = match results.get("last_insert_rowid") {
                None | Some(JsonValue::Null) => None,
                Some(n) => Some(
                    n.as_i64()
                        .ok_or_else(|| ClientError::protocol("`last_insert_rowid` is not an integer"))?,
                ),
            };
            Ok(ResultSet::Write(WriteOutcome {
                last_insert_id,
                rows_affected,
                returned,
            }))
        }
    }
}

/// Rows arrive either as positional arrays or as keyed objects; both are laid
/// out in the order of `columns`.
fn remote_rows(columns: &JsonValue, rows: &JsonValue) -> Result<Rows> {
    let columns: Vec<String> = columns
        .as_array()
        .ok_or_else(|| ClientError::protocol("`columns` is not an array"))?
        .iter()
        .map(|c| {
            c.as_str()
                .map(str::to_string)
                .ok_or_else(|| ClientError::protocol("column name is not a string"))
        })
        .collect::<Result<_>>()?;

    let raw_rows = rows
        .as_array()
        .ok_or_else(|| ClientError::protocol("`rows` is not an array"))?;

    let mut out = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        let values = match raw {
            JsonValue::Array(cells) => cells.iter().map(Value::from_json).collect(),
            JsonValue::Object(keyed) => columns
                .iter()
                .map(|c| {
                    keyed
                        .get(c)
                        .map(Value::from_json)
                        .ok_or_else(|| ClientError::protocol(format!("row is missing column `{}`", c)))
                })
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(ClientError::protocol("row is neither an array nor an object")),
        };
        out.push(Row::zip(&columns, values)?);
    }

    Ok(Rows { columns, rows: out })
}
