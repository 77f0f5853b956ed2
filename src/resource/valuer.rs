//! Reading a meta's value out of a record, loading missing relationship hops on the way.

use crate::context::Context;
use crate::db::Db;
use crate::error::AppError;
use crate::model::{is_zero, Record};
use crate::schema::{Field, RelationshipKind, Schema};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Valuer: Send + Sync {
    /// May fill in lazily loaded parts of `record`.
    async fn value(&self, record: &mut Record, ctx: &Context) -> Result<Value, AppError>;
}

#[async_trait]
impl<F> Valuer for F
where
    F: Fn(&Record, &Context) -> Value + Send + Sync,
{
    async fn value(&self, record: &mut Record, ctx: &Context) -> Result<Value, AppError> {
        Ok(self(record, ctx))
    }
}

/// Default valuer for a dotted field path.
///
/// Zero-valued relationship hops of a persisted owner are loaded with one association query
/// each; a zero final column triggers a reload of its owner. Missing intermediate objects are
/// allocated, so the walk always ends in the field's value or its zero value.
pub(crate) struct PathValuer {
    pub(crate) base_model: String,
    pub(crate) path: Vec<String>,
}

#[async_trait]
impl Valuer for PathValuer {
    async fn value(&self, record: &mut Record, ctx: &Context) -> Result<Value, AppError> {
        let db = ctx.get_db();
        let mut model = self.base_model.clone();
        let mut current: &mut Record = record;
        for (i, segment) in self.path.iter().enumerate() {
            let schema = db.schema(&model)?;
            let Some(field) = schema.field(segment) else {
                return Ok(Value::Null);
            };
            let last = i + 1 == self.path.len();

            if let Some(rel) = &field.relationship {
                if rel.kind == RelationshipKind::BelongsTo
                    && !schema.primary_key_is_zero(current)
                    && current.get(segment).map(is_zero).unwrap_or(true)
                    && current.get(&rel.foreign_key).map(is_zero).unwrap_or(true)
                {
                    reload_ignoring_missing(&db, &model, current).await?;
                }
                load_unloaded(&db, &schema, current, field).await?;
            } else if last
                && !schema.primary_key_is_zero(current)
                && current.get(segment).map(is_zero).unwrap_or(true)
            {
                reload_ignoring_missing(&db, &model, current).await?;
            }

            if last {
                return Ok(current
                    .get(segment)
                    .cloned()
                    .unwrap_or_else(|| field.kind.zero_value()));
            }

            let Some(rel) = &field.relationship else {
                return Ok(Value::Null);
            };
            let related = db.schema(&rel.model)?;
            let slot = current.entry(segment.clone()).or_insert(Value::Null);
            if !slot.is_object() {
                *slot = Value::Object(related.new_record());
            }
            current = match slot.as_object_mut() {
                Some(next) => next,
                None => return Ok(Value::Null),
            };
            model = rel.model.clone();
        }
        Ok(Value::Null)
    }
}

/// Loads the association behind `field` into a persisted `record` whose in-memory value is
/// zero. In-memory columns of `record` are left as they are.
pub(crate) async fn load_unloaded(
    db: &Db,
    schema: &Schema,
    record: &mut Record,
    field: &Field,
) -> Result<(), AppError> {
    if field.relationship.is_none()
        || schema.primary_key_is_zero(record)
        || !record.get(&field.name).map(is_zero).unwrap_or(true)
    {
        return Ok(());
    }
    let loaded = db.find_association(&schema.name, record, &field.name).await?;
    record.insert(field.name.clone(), loaded);
    Ok(())
}

async fn reload_ignoring_missing(
    db: &Db,
    model: &str,
    record: &mut Record,
) -> Result<(), AppError> {
    match db.reload(model, record).await {
        Ok(()) | Err(AppError::RecordNotFound) => Ok(()),
        Err(e) => Err(e),
    }
}
