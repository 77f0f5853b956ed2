//! Parsed model metadata: fields, column names, primary keys and relationships.

mod parse;
mod registry;

pub use registry::{Registry, Scanner};

use crate::codec;
use crate::error::CodecError;
use crate::model::{is_zero, Record};
use crate::sql::{BindValue, SqlType};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Uint,
    Float,
    Bool,
    Time,
    Uuid,
    /// A registered scanner type, stored as JSON.
    Scanner(String),
    /// Another registered model.
    Struct(String),
    Pointer(Box<FieldKind>),
    Slice(Box<FieldKind>),
}

impl FieldKind {
    /// The kind behind any number of pointers.
    pub fn indirect(&self) -> &FieldKind {
        match self {
            FieldKind::Pointer(inner) => inner.indirect(),
            other => other,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, FieldKind::Pointer(_))
    }

    /// Model name for struct, pointer-to-struct and slice-of-struct kinds.
    pub fn model_name(&self) -> Option<&str> {
        match self.indirect() {
            FieldKind::Struct(name) => Some(name),
            FieldKind::Slice(inner) => inner.model_name(),
            _ => None,
        }
    }

    pub fn zero_value(&self) -> Value {
        match self {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Int | FieldKind::Uint => Value::from(0),
            FieldKind::Float => Value::from(0.0),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Slice(_) => Value::Array(Vec::new()),
            FieldKind::Time
            | FieldKind::Uuid
            | FieldKind::Scanner(_)
            | FieldKind::Struct(_)
            | FieldKind::Pointer(_) => Value::Null,
        }
    }

    pub fn sql_type(&self) -> SqlType {
        match self.indirect() {
            FieldKind::String => SqlType::Text,
            FieldKind::Int | FieldKind::Uint => SqlType::BigInt,
            FieldKind::Float => SqlType::Double,
            FieldKind::Bool => SqlType::Bool,
            FieldKind::Time => SqlType::Timestamp,
            FieldKind::Uuid => SqlType::Uuid,
            _ => SqlType::Json,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Int => write!(f, "int"),
            FieldKind::Uint => write!(f, "uint"),
            FieldKind::Float => write!(f, "float64"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::Time => write!(f, "time.Time"),
            FieldKind::Uuid => write!(f, "uuid"),
            FieldKind::Scanner(name) | FieldKind::Struct(name) => write!(f, "{}", name),
            FieldKind::Pointer(inner) => write!(f, "*{}", inner),
            FieldKind::Slice(inner) => write!(f, "[]{}", inner),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationshipKind {
    BelongsTo,
    HasOne,
    HasMany,
    Many2Many,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinTable {
    pub table: String,
    /// Join column holding the owner's key.
    pub foreign_key: String,
    /// Join column holding the related model's key.
    pub association_foreign_key: String,
}

/// Link from an owning field to a related model, referenced by name.
///
/// For `BelongsTo`, `foreign_key` names a field on the owner and `association_key` a field on
/// the related model. For `HasOne`/`HasMany` it is the other way round. For `Many2Many`, both
/// name primary fields and the join table carries the columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub model: String,
    pub foreign_key: String,
    pub association_key: String,
    pub join_table: Option<JoinTable>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    /// Empty for relationship and ignored fields.
    pub db_name: String,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub tags: HashMap<String, String>,
    pub valid: String,
    pub relationship: Option<Relationship>,
}

impl Field {
    /// Stored in a column of the model's own table.
    pub fn is_column(&self) -> bool {
        !self.db_name.is_empty() && self.relationship.is_none()
    }

    pub fn sql_type(&self) -> SqlType {
        self.kind.sql_type()
    }

    /// Converts a record value into a bindable parameter.
    pub fn bind_value(&self, value: &Value) -> Result<BindValue, CodecError> {
        if value.is_null() {
            return Ok(BindValue::Null(self.sql_type()));
        }
        Ok(match self.kind.indirect() {
            FieldKind::String => BindValue::String(codec::to_string(value)),
            FieldKind::Int => BindValue::I64(codec::to_int(value)?),
            FieldKind::Uint => {
                let n = codec::to_uint(value)?;
                BindValue::I64(i64::try_from(n).map_err(|_| CodecError::NotNumber(n.to_string()))?)
            }
            FieldKind::Float => BindValue::F64(codec::to_float(value)?),
            FieldKind::Bool => BindValue::Bool(codec::to_bool(value)),
            FieldKind::Time => match parse_stored_time(&codec::to_string(value))? {
                Some(t) => BindValue::Time(t),
                None => BindValue::Null(SqlType::Timestamp),
            },
            FieldKind::Uuid => {
                let s = codec::to_string(value);
                if s.is_empty() {
                    BindValue::Null(SqlType::Uuid)
                } else {
                    BindValue::Uuid(
                        uuid::Uuid::parse_str(&s).map_err(|_| CodecError::InvalidUuid(s.clone()))?,
                    )
                }
            }
            FieldKind::Scanner(_) | FieldKind::Slice(_) => BindValue::Json(value.clone()),
            other => {
                return Err(CodecError::Scan(format!(
                    "field {} of kind {} has no column",
                    self.name, other
                )))
            }
        })
    }

    /// Normalizes a value read from the database into the record representation.
    pub fn decode_column(&self, value: Value) -> Value {
        if value.is_null() {
            return if self.kind.is_pointer() {
                Value::Null
            } else {
                self.kind.zero_value()
            };
        }
        match self.kind.indirect() {
            FieldKind::Bool => match value {
                Value::Number(n) => Value::Bool(n.as_i64().unwrap_or(0) != 0),
                Value::String(s) => Value::Bool(s == "1" || s == "true" || s == "t"),
                other => other,
            },
            FieldKind::Int => match codec::to_int(&value) {
                Ok(i) => Value::from(i),
                Err(_) => value,
            },
            FieldKind::Uint => match codec::to_uint(&value) {
                Ok(u) => Value::from(u),
                Err(_) => value,
            },
            FieldKind::Float => match codec::to_float(&value) {
                Ok(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(value),
                Err(_) => value,
            },
            FieldKind::Time => match parse_stored_time(&codec::to_string(&value)) {
                Ok(Some(t)) => Value::String(codec::format_time(&t)),
                _ => value,
            },
            FieldKind::Scanner(_) | FieldKind::Slice(_) => match value {
                Value::String(s) => {
                    serde_json::from_str(&s).unwrap_or_else(|_| Value::String(s.clone()))
                }
                other => other,
            },
            _ => value,
        }
    }
}

/// Times inside records are RFC 3339; SQLite may hand back `YYYY-MM-DD HH:MM:SS`.
fn parse_stored_time(s: &str) -> Result<Option<DateTime<Utc>>, CodecError> {
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(t.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Some(Utc.from_utc_datetime(&naive)));
        }
    }
    codec::parse_time(s, codec::DEFAULT_TIME_FORMAT)
}

#[derive(Debug)]
pub struct Schema {
    pub name: String,
    pub table: String,
    pub fields: Vec<Field>,
    by_name: HashMap<String, usize>,
    primary: Vec<usize>,
    prioritized: usize,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Primary fields in declared key order.
    pub fn primary_fields(&self) -> Vec<&Field> {
        self.primary.iter().map(|&i| &self.fields[i]).collect()
    }

    pub fn prioritized_primary_field(&self) -> &Field {
        &self.fields[self.prioritized]
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.field(name).and_then(|f| f.relationship.as_ref())
    }

    pub fn columns(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_column())
    }

    pub fn primary_key_is_zero(&self, record: &Record) -> bool {
        let field = self.prioritized_primary_field();
        record.get(&field.name).map(is_zero).unwrap_or(true)
    }

    /// Comma-joined primary values, the form used in paths and error labels.
    pub fn primary_value(&self, record: &Record) -> String {
        self.primary_fields()
            .iter()
            .map(|f| codec::to_string(record.get(&f.name).unwrap_or(&Value::Null)))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// A record holding every field's zero value.
    pub fn new_record(&self) -> Record {
        self.fields
            .iter()
            .filter(|f| !f.db_name.is_empty() || f.relationship.is_some())
            .map(|f| (f.name.clone(), f.kind.zero_value()))
            .collect()
    }

    /// Maps a row keyed by column name onto field names.
    pub fn record_from_row(&self, mut row: Record) -> Record {
        let mut record = self.new_record();
        for field in self.columns() {
            if let Some(v) = row.remove(&field.db_name) {
                record.insert(field.name.clone(), field.decode_column(v));
            }
        }
        record
    }
}
