//! Registry column schema and write coercion.
//!
//! The registry reports a data type per column. At startup the reported
//! columns are checked against the fields this crate depends on, and the
//! result is a [`CoercionTable`] that normalizes every outgoing row to the
//! column types the registry expects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{AppError, Result};
use crate::models::fields;

/// Column data types the coercion table understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
    Text,
    Checkbox,
    /// Socrata `calendar_date` (floating timestamp)
    Timestamp,
}

impl FieldType {
    /// Map a Socrata `dataTypeName`; unknown types are passed through untouched.
    pub fn from_socrata(data_type_name: &str) -> Option<Self> {
        match data_type_name {
            "number" => Some(Self::Number),
            "text" => Some(Self::Text),
            "checkbox" => Some(Self::Checkbox),
            "calendar_date" => Some(Self::Timestamp),
            _ => None,
        }
    }
}

/// Column metadata as reported by the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnMeta {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "dataTypeName")]
    pub data_type_name: String,
}

impl ColumnMeta {
    pub fn new(field_name: impl Into<String>, data_type_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            data_type_name: data_type_name.into(),
        }
    }
}

/// A field the scheduler relies on and the types it may have.
#[derive(Debug, Clone)]
pub struct ExpectedField {
    pub name: &'static str,
    pub accepted: &'static [FieldType],
}

/// Fields that must exist in the registry.
#[derive(Debug, Clone)]
pub struct RegistrySchema {
    fields: Vec<ExpectedField>,
}

impl RegistrySchema {
    /// The feed registry schema.
    pub fn feed_registry() -> Self {
        Self {
            fields: vec![
                ExpectedField {
                    name: fields::FEED_NAME,
                    accepted: &[FieldType::Text],
                },
                ExpectedField {
                    name: fields::ACTIVE,
                    accepted: &[FieldType::Checkbox],
                },
                ExpectedField {
                    name: fields::UPDATE_FREQUENCY,
                    accepted: &[FieldType::Text],
                },
                ExpectedField {
                    name: fields::LAST_INGESTED,
                    accepted: &[FieldType::Text, FieldType::Timestamp],
                },
            ],
        }
    }

    pub fn fields(&self) -> &[ExpectedField] {
        &self.fields
    }

    /// Check reported columns and build the coercion table.
    ///
    /// Every problem is listed in a single error.
    pub fn validate(&self, reported: &[ColumnMeta]) -> Result<CoercionTable> {
        let table = CoercionTable::from_columns(reported);
        let reported_types: BTreeMap<&str, &str> = reported
            .iter()
            .map(|c| (c.field_name.as_str(), c.data_type_name.as_str()))
            .collect();

        let mut problems = Vec::new();
        for expected in &self.fields {
            match reported_types.get(expected.name) {
                None => problems.push(format!("missing column {:?}", expected.name)),
                Some(type_name) => {
                    let ok = FieldType::from_socrata(type_name)
                        .is_some_and(|t| expected.accepted.contains(&t));
                    if !ok {
                        problems.push(format!(
                            "column {:?} has type {:?}, expected one of {:?}",
                            expected.name, type_name, expected.accepted
                        ));
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(table)
        } else {
            Err(AppError::schema(problems.join("; ")))
        }
    }
}

/// Typed per-column coercion applied before rows are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercionTable {
    columns: BTreeMap<String, FieldType>,
}

impl CoercionTable {
    /// Build a table from reported columns, skipping types it cannot coerce.
    pub fn from_columns(columns: &[ColumnMeta]) -> Self {
        let columns = columns
            .iter()
            .filter_map(|c| {
                FieldType::from_socrata(&c.data_type_name).map(|t| (c.field_name.clone(), t))
            })
            .collect();
        Self { columns }
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.columns.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Coerce a row for writing.
    ///
    /// - typed columns are converted to their column type; null or empty
    ///   values are omitted so the stored value is left as is
    /// - server-maintained system fields (`:created_at`, ...) are dropped,
    ///   `:id` is kept as the upsert key
    /// - every other field passes through unchanged
    pub fn coerce(&self, row: Map<String, Value>) -> Result<Map<String, Value>> {
        let mut out = Map::with_capacity(row.len());

        for (key, value) in row {
            if key.starts_with(':') && key != fields::ROW_ID {
                continue;
            }

            match self.columns.get(&key) {
                Some(field_type) => {
                    if is_blank(&value) {
                        continue;
                    }
                    let coerced = coerce_value(*field_type, value)
                        .map_err(|msg| AppError::validation(format!("field {key:?}: {msg}")))?;
                    out.insert(key, coerced);
                }
                None => {
                    out.insert(key, value);
                }
            }
        }

        Ok(out)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_decimal(s: &str) -> bool {
    s.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

fn coerce_value(field_type: FieldType, value: Value) -> std::result::Result<Value, String> {
    match (field_type, value) {
        (FieldType::Number, Value::Number(n)) => Ok(Value::Number(n)),
        // Kept as text: SODA accepts numeric strings, and reparsing would
        // round anything beyond f64 precision.
        (FieldType::Number, Value::String(s)) => {
            if is_decimal(&s) {
                Ok(Value::String(s))
            } else {
                Err(format!("{s:?} is not a number"))
            }
        }
        (FieldType::Number, Value::Bool(b)) => Ok(Value::Number(Number::from(u8::from(b)))),

        (FieldType::Text | FieldType::Timestamp, Value::String(s)) => Ok(Value::String(s)),
        (FieldType::Text | FieldType::Timestamp, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (FieldType::Text, Value::Bool(b)) => Ok(Value::String(b.to_string())),

        (FieldType::Checkbox, Value::Bool(b)) => Ok(Value::Bool(b)),
        (FieldType::Checkbox, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("{s:?} is not a checkbox value")),
        },

        (field_type, other) => Err(format!("cannot coerce {other} to {field_type:?}")),
    }
}
