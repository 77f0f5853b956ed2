//! Field-scoped validation errors and the tag-driven `validations:validate` callback.

use crate::codec;
use crate::db::{CallbackKind, Callbacks, Scope};
use crate::error::AppError;
use crate::model::{is_zero, Record};
use crate::schema::{Field, Schema};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

pub const VALIDATE_CALLBACK: &str = "validations:validate";

/// A failed check on one column of one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationError {
    pub model: String,
    /// Comma-joined primary key values of the record.
    pub primary: String,
    pub column: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        model: impl Into<String>,
        primary: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationError {
            model: model.into(),
            primary: primary.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn for_record(schema: &Schema, record: &Record, column: &str, message: impl Into<String>) -> Self {
        Self::new(schema.name.clone(), schema.primary_value(record), column, message)
    }

    /// Form label of the failing input: `{Model}_{pk}_{Column}`.
    pub fn label(&self) -> String {
        format!("{}_{}_{}", self.model, self.primary, self.column)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Rule {
    Required,
    Length(usize, usize),
    Numeric,
    Email,
}

fn length_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^length\(([0-9]+)\|([0-9]+)\)$").ok())
        .as_ref()
}

fn email_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").ok())
        .as_ref()
}

/// Parses `required,length(6|20)~too short,email` into rules with optional custom messages.
fn parse_rules(valid: &str) -> Vec<(Rule, Option<String>)> {
    valid
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            let (name, message) = match part.split_once('~') {
                Some((n, m)) => (n.trim(), Some(m.trim().to_string())),
                None => (part, None),
            };
            let rule = match name {
                "required" => Rule::Required,
                "numeric" => Rule::Numeric,
                "email" => Rule::Email,
                other => {
                    let caps = length_regex()?.captures(other)?;
                    Rule::Length(caps[1].parse().ok()?, caps[2].parse().ok()?)
                }
            };
            Some((rule, message))
        })
        .collect()
}

fn check(rule: &Rule, field: &Field, value: &Value) -> Option<String> {
    let name = &field.name;
    if *rule == Rule::Required {
        return is_zero(value).then(|| format!("{} can't be blank", name));
    }
    if is_zero(value) {
        return None;
    }
    let text = codec::to_string(value);
    match rule {
        Rule::Required => None,
        Rule::Length(min, max) => {
            let n = text.chars().count();
            (n < *min || n > *max).then(|| {
                format!("{} is the wrong length (should be {}~{} characters)", name, min, max)
            })
        }
        Rule::Numeric => (!text.chars().all(|c| c.is_ascii_digit()))
            .then(|| format!("{} is not a number", name)),
        Rule::Email => (!email_regex().is_some_and(|re| re.is_match(&text)))
            .then(|| format!("{} is not a valid email address", name)),
    }
}

/// Runs every field's rules against the record.
pub fn validate_record(schema: &Schema, record: &Record) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for field in &schema.fields {
        if field.valid.is_empty() {
            continue;
        }
        let value = record.get(&field.name).unwrap_or(&Value::Null);
        for (rule, custom) in parse_rules(&field.valid) {
            if let Some(message) = check(&rule, field, value) {
                errors.push(ValidationError::for_record(
                    schema,
                    record,
                    &field.name,
                    custom.unwrap_or(message),
                ));
            }
        }
    }
    errors
}

struct Validate;

#[async_trait]
impl crate::db::Callback for Validate {
    async fn call(&self, scope: &mut Scope<'_>) -> Result<(), AppError> {
        if scope.db.skip_validations() || scope.has_error() {
            return Ok(());
        }
        let errors = validate_record(scope.schema, scope.record);
        scope.errors.extend(errors);
        Ok(())
    }
}

/// Installs `validations:validate` before create and before update.
pub fn register_callbacks(callbacks: &Callbacks) {
    callbacks.register(CallbackKind::BeforeCreate, VALIDATE_CALLBACK, Validate);
    callbacks.register(CallbackKind::BeforeUpdate, VALIDATE_CALLBACK, Validate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldDef, ModelDef};
    use crate::schema::Registry;
    use serde_json::json;

    fn schema() -> std::sync::Arc<Schema> {
        let registry = Registry::new();
        registry
            .register(
                ModelDef::new("User")
                    .with_id_and_timestamps()
                    .field(FieldDef::new("Name", "string").valid("required"))
                    .field(FieldDef::new("Password", "string").valid("length(6|20)"))
                    .field(FieldDef::new("Phone", "string").valid("numeric"))
                    .field(FieldDef::new("Email", "string").valid("email"))
                    .field(FieldDef::new("Code", "string").valid("required~Code is mandatory")),
            )
            .unwrap();
        registry.parse("User").unwrap()
    }

    #[test]
    fn messages_follow_rules() {
        let schema = schema();
        let record: Record = json!({
            "ID": 1, "Name": "", "Password": "abc", "Phone": "12a", "Email": "nope", "Code": ""
        })
        .as_object()
        .cloned()
        .unwrap();
        let messages: Vec<String> = validate_record(&schema, &record)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Name can't be blank",
                "Password is the wrong length (should be 6~20 characters)",
                "Phone is not a number",
                "Email is not a valid email address",
                "Code is mandatory",
            ]
        );
    }

    #[test]
    fn valid_record_and_labels() {
        let schema = schema();
        let record: Record = json!({
            "ID": 3, "Name": "jinzhu", "Password": "secret12", "Phone": "", "Email": "a@b.io", "Code": "x"
        })
        .as_object()
        .cloned()
        .unwrap();
        assert!(validate_record(&schema, &record).is_empty());

        let err = ValidationError::for_record(&schema, &record, "Name", "bad");
        assert_eq!(err.label(), "User_3_Name");
        assert_eq!(err.to_string(), "bad");
    }
}
