//! Schema-adaptive flattening of nested JSON records.
//!
//! One pass explodes every list-typed column into extra rows and expands every
//! object-typed column into `{parent}_{child}` columns; passes repeat until no
//! column holds a list or an object. Arrays only ever become more rows and
//! objects only ever become leaf columns, so each pass strictly reduces the
//! nesting that remains and the loop terminates in at most depth(record)
//! passes.

use serde_json::Value;

use crate::domain::model::{FlatTable, Scalar};
use crate::utils::error::{PipelineError, Result};

const PATH_SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Scalar,
    List,
    Object,
}

fn kind_label(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Scalar => "scalar",
        ColumnKind::List => "list",
        ColumnKind::Object => "object",
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Working form of a batch mid-flattening: a header plus row-major cells that
/// may still hold nested values.
#[derive(Debug)]
struct Batch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Batch {
    /// One top-level object is a batch of one; a top-level array must contain
    /// only objects. Anything else cannot be given a tabular schema.
    fn from_value(value: &Value) -> Result<Self> {
        let records: Vec<&serde_json::Map<String, Value>> = match value {
            Value::Object(map) => vec![map],
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(PipelineError::malformed(format!(
                        "batch elements must be objects, found {}",
                        value_label(other)
                    ))),
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(PipelineError::malformed(format!(
                    "top-level value must be an object or an array of objects, found {}",
                    value_label(other)
                )))
            }
        };

        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|column| column == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    fn has_nested(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .any(|cell| matches!(cell, Value::Array(_) | Value::Object(_)))
    }

    fn into_table(self) -> FlatTable {
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(scalar_from_value).collect())
            .collect();
        FlatTable {
            columns: self.columns,
            rows,
        }
    }
}

// Invariant at call time: the batch reached its fixed point, so no cell holds
// an array or object anymore.
fn scalar_from_value(value: Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(b),
        Value::Number(n) => Scalar::Number(n),
        Value::String(s) => Scalar::String(s),
        Value::Array(_) | Value::Object(_) => Scalar::Null,
    }
}

/// Flattens one structured record, or an array of records sharing a schema,
/// into a rectangular table of scalar columns. Pure; all failures are either
/// `MalformedInput` or `SchemaConflict`.
pub fn flatten(value: &Value) -> Result<FlatTable> {
    let mut batch = Batch::from_value(value)?;
    while batch.has_nested() {
        batch = flatten_pass(batch)?;
    }
    Ok(batch.into_table())
}

enum Slot {
    Keep(usize),
    Child(usize, String),
}

/// One pass over the batch schema: explode list columns, expand object
/// columns, keep scalar columns unchanged.
fn flatten_pass(batch: Batch) -> Result<Batch> {
    let kinds = batch
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| classify_column(&batch.rows, idx, name))
        .collect::<Result<Vec<_>>>()?;

    // List columns explode one at a time, so several list columns in one
    // record yield their cross product: one row per leaf combination.
    let mut rows = batch.rows;
    for (idx, kind) in kinds.iter().enumerate() {
        if *kind == ColumnKind::List {
            rows = explode_column(rows, idx);
        }
    }

    let mut columns = Vec::new();
    let mut slots = Vec::new();
    for (idx, kind) in kinds.iter().enumerate() {
        match kind {
            ColumnKind::Object => {
                for child in child_fields(&rows, idx) {
                    columns.push(format!(
                        "{}{}{}",
                        batch.columns[idx], PATH_SEPARATOR, child
                    ));
                    slots.push(Slot::Child(idx, child));
                }
            }
            _ => {
                columns.push(batch.columns[idx].clone());
                slots.push(Slot::Keep(idx));
            }
        }
    }

    // Path joining must stay injective; a collision is a schema conflict,
    // never a silent merge.
    for (i, name) in columns.iter().enumerate() {
        if columns[..i].iter().any(|earlier| earlier == name) {
            return Err(PipelineError::schema_conflict(
                name.clone(),
                "flattening produced colliding column paths",
            ));
        }
    }

    let rows = rows
        .iter()
        .map(|row| {
            slots
                .iter()
                .map(|slot| match slot {
                    Slot::Keep(idx) => row[*idx].clone(),
                    Slot::Child(idx, child) => match &row[*idx] {
                        Value::Object(map) => map.get(child).cloned().unwrap_or(Value::Null),
                        _ => Value::Null,
                    },
                })
                .collect()
        })
        .collect();

    Ok(Batch { columns, rows })
}

/// A column is list-typed if any non-null cell is an array, object-typed if
/// any non-null cell is an object. Nulls fit every kind; cells of differing
/// kinds in one column have no single widening and are rejected.
fn classify_column(rows: &[Vec<Value>], idx: usize, name: &str) -> Result<ColumnKind> {
    let mut kind: Option<ColumnKind> = None;
    for row in rows {
        let observed = match &row[idx] {
            Value::Null => continue,
            Value::Array(_) => ColumnKind::List,
            Value::Object(_) => ColumnKind::Object,
            _ => ColumnKind::Scalar,
        };
        match kind {
            None => kind = Some(observed),
            Some(existing) if existing == observed => {}
            Some(existing) => {
                return Err(PipelineError::schema_conflict(
                    name,
                    format!(
                        "column mixes {} and {} values across rows",
                        kind_label(existing),
                        kind_label(observed)
                    ),
                ));
            }
        }
    }
    Ok(kind.unwrap_or(ColumnKind::Scalar))
}

/// One output row per list element, other columns duplicated unchanged. An
/// empty list or a null cell contributes no rows.
fn explode_column(rows: Vec<Vec<Value>>, idx: usize) -> Vec<Vec<Value>> {
    let mut exploded = Vec::new();
    for row in rows {
        match &row[idx] {
            Value::Array(items) => {
                for item in items {
                    let mut copy = row.clone();
                    copy[idx] = item.clone();
                    exploded.push(copy);
                }
            }
            Value::Null => {}
            _ => exploded.push(row),
        }
    }
    exploded
}

/// Child field names of an object column, in first-seen order across rows.
fn child_fields(rows: &[Vec<Value>], idx: usize) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = &row[idx] {
            for key in map.keys() {
                if !fields.iter().any(|field| field == key) {
                    fields.push(key.clone());
                }
            }
        }
    }
    fields
}
