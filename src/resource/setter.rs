//! Writing submitted values into records, one strategy per field kind.

use super::meta_values::{MetaValue, MetaValues};
use super::processor::Decoded;
use super::valuer::load_unloaded;
use super::Resource;
use crate::codec;
use crate::context::Context;
use crate::error::{AppError, CodecError, SchemaError};
use crate::model::{is_zero, Record};
use crate::schema::{Field, FieldKind, Relationship, RelationshipKind};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

#[async_trait]
pub trait Setter: Send + Sync {
    async fn set(&self, record: &mut Record, value: &MetaValue, ctx: &mut Context) -> Result<(), AppError>;
}

#[async_trait]
impl<F> Setter for F
where
    F: Fn(&mut Record, &MetaValue, &mut Context) -> Result<(), AppError> + Send + Sync,
{
    async fn set(&self, record: &mut Record, value: &MetaValue, ctx: &mut Context) -> Result<(), AppError> {
        self(record, value, ctx)
    }
}

#[derive(Debug)]
enum Strategy {
    Int,
    Uint,
    Float,
    Bool,
    Text,
    Strings,
    Time,
    Uuid,
    Scanner(String),
    Relation(Relationship),
}

/// The related model's resource: the one configured on the meta, else a default one built on
/// first use.
struct NestedResource {
    configured: Option<Arc<Resource>>,
    built: OnceLock<Arc<Resource>>,
}

impl NestedResource {
    fn get(&self, model: &str, ctx: &Context) -> Result<Arc<Resource>, AppError> {
        if let Some(res) = self.configured.as_ref().or_else(|| self.built.get()) {
            return Ok(res.clone());
        }
        let mut res = Resource::new(model, ctx.get_db().registry())?;
        res.add_default_metas()?;
        let res = Arc::new(res);
        Ok(self.built.get_or_init(|| res).clone())
    }
}

/// Default setter of a meta: walks to the object holding the field, then applies the
/// strategy chosen for the field's kind.
pub(crate) struct FieldSetter {
    meta: String,
    hops: Vec<String>,
    base_model: String,
    owner_model: String,
    field: Field,
    strategy: Strategy,
    nested: NestedResource,
}

impl FieldSetter {
    pub(crate) fn new(
        meta: &str,
        hops: Vec<String>,
        base_model: &str,
        owner_model: &str,
        field: &Field,
        resource: Option<Arc<Resource>>,
    ) -> Result<Self, SchemaError> {
        let strategy = match (&field.relationship, field.kind.indirect()) {
            (Some(rel), _) => Strategy::Relation(rel.clone()),
            (None, FieldKind::Int) => Strategy::Int,
            (None, FieldKind::Uint) => Strategy::Uint,
            (None, FieldKind::Float) => Strategy::Float,
            (None, FieldKind::Bool) => Strategy::Bool,
            (None, FieldKind::String) => Strategy::Text,
            (None, FieldKind::Time) => Strategy::Time,
            (None, FieldKind::Uuid) => Strategy::Uuid,
            (None, FieldKind::Scanner(name)) => Strategy::Scanner(name.clone()),
            (None, FieldKind::Slice(inner)) if **inner == FieldKind::String => Strategy::Strings,
            (None, other) => {
                return Err(SchemaError::NoSetter {
                    meta: meta.to_string(),
                    kind: other.to_string(),
                })
            }
        };
        Ok(FieldSetter {
            meta: meta.to_string(),
            hops,
            base_model: base_model.to_string(),
            owner_model: owner_model.to_string(),
            field: field.clone(),
            strategy,
            nested: NestedResource {
                configured: resource,
                built: OnceLock::new(),
            },
        })
    }

    /// The object holding the field. Hops not yet loaded on a persisted record are fetched
    /// first; a hop with nothing stored becomes an empty object.
    async fn owner_object<'a>(
        &self,
        record: &'a mut Record,
        ctx: &Context,
    ) -> Result<Option<&'a mut Record>, AppError> {
        let db = ctx.get_db();
        let mut model = self.base_model.clone();
        let mut current: &'a mut Record = record;
        for hop in &self.hops {
            let schema = db.schema(&model)?;
            let Some(field) = schema.field(hop) else {
                return Ok(None);
            };
            load_unloaded(&db, &schema, current, field).await?;
            if let Some(rel) = &field.relationship {
                model = rel.model.clone();
            }
            let slot = current.entry(hop.clone()).or_insert(Value::Null);
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot.as_object_mut() {
                Some(next) => next,
                None => return Ok(None),
            };
        }
        Ok(Some(current))
    }

    fn scalar(&self, value: &MetaValue, ctx: &Context) -> Result<Value, AppError> {
        let raw = &value.value;
        Ok(match &self.strategy {
            Strategy::Int => Value::from(codec::to_int(raw)?),
            Strategy::Uint => Value::from(codec::to_uint(raw)?),
            Strategy::Float => serde_json::Number::from_f64(codec::to_float(raw)?)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Strategy::Bool => Value::Bool(codec::to_bool(raw)),
            Strategy::Text => Value::String(codec::to_string(raw)),
            Strategy::Strings => Value::Array(codec::to_array(raw).into_iter().map(Value::String).collect()),
            Strategy::Time => match codec::parse_time(&codec::to_string(raw), &ctx.time_format)? {
                Some(t) => Value::String(codec::format_time(&t)),
                None => Value::Null,
            },
            Strategy::Uuid => {
                let s = codec::to_string(raw);
                if s.is_empty() {
                    Value::Null
                } else {
                    let id = uuid::Uuid::parse_str(&s).map_err(|_| CodecError::InvalidUuid(s.clone()))?;
                    Value::String(id.to_string())
                }
            }
            Strategy::Scanner(name) => {
                if raw.is_null() && value.has_nested() {
                    return Ok(nested_object(&value.meta_values));
                }
                let registry = ctx.get_db().registry().clone();
                let scanner = registry
                    .scanner(name)
                    .ok_or_else(|| CodecError::Scan(format!("no scanner registered for {}", name)))?;
                match scanner.scan(raw) {
                    Ok(v) => v,
                    Err(_) => scanner.scan(&Value::String(codec::to_string(raw)))?,
                }
            }
            Strategy::Relation(_) => Value::Null,
        })
    }

    async fn set_relation(
        &self,
        rel: &Relationship,
        owner: &mut Record,
        value: &MetaValue,
        ctx: &mut Context,
    ) -> Result<(), AppError> {
        if value.value.is_null() && value.has_nested() {
            return self.decode_nested(rel, owner, value, ctx).await;
        }
        match rel.kind {
            RelationshipKind::BelongsTo => self.set_belongs_to(rel, owner, value, ctx).await,
            RelationshipKind::Many2Many => self.set_many2many(rel, owner, value, ctx).await,
            RelationshipKind::HasOne | RelationshipKind::HasMany => {
                tracing::warn!(meta = %self.meta, "has-one and has-many fields take nested values only");
                Ok(())
            }
        }
    }

    /// Submitted value is the related primary key; an unchanged key leaves the record alone.
    async fn set_belongs_to(
        &self,
        rel: &Relationship,
        owner: &mut Record,
        value: &MetaValue,
        ctx: &mut Context,
    ) -> Result<(), AppError> {
        let keys = codec::to_array(&value.value);
        let current = match owner.get(&rel.foreign_key) {
            Some(fk) if !is_zero(fk) => codec::to_array(fk),
            _ => Vec::new(),
        };
        if keys == current {
            return Ok(());
        }
        let db = ctx.get_db();
        owner.insert(self.field.name.clone(), Value::Null);
        if keys.is_empty() {
            let schema = db.schema(&self.owner_model)?;
            let zero = schema
                .field(&rel.foreign_key)
                .map(|f| f.kind.zero_value())
                .unwrap_or(Value::Null);
            owner.insert(rel.foreign_key.clone(), zero);
            return Ok(());
        }
        let found = db.find_by_primary_keys(&rel.model, &keys).await?;
        if let Some(target) = found.into_iter().next() {
            let key = target.get(&rel.association_key).cloned().unwrap_or(Value::Null);
            owner.insert(rel.foreign_key.clone(), key);
            owner.insert(self.field.name.clone(), Value::Object(target));
        }
        Ok(())
    }

    /// Submitted values are the related primary keys. A persisted owner gets its join rows
    /// replaced right away; a new one keeps the list for `Db::save` to link.
    async fn set_many2many(
        &self,
        rel: &Relationship,
        owner: &mut Record,
        value: &MetaValue,
        ctx: &mut Context,
    ) -> Result<(), AppError> {
        let keys = codec::to_array(&value.value);
        let db = ctx.get_db();
        let found = if keys.is_empty() {
            Vec::new()
        } else {
            db.find_by_primary_keys(&rel.model, &keys).await?
        };
        let schema = db.schema(&self.owner_model)?;
        if schema.primary_key_is_zero(owner) {
            owner.insert(
                self.field.name.clone(),
                Value::Array(found.into_iter().map(Value::Object).collect()),
            );
        } else {
            db.replace_association(&self.owner_model, owner, &self.field.name, &found)
                .await?;
            owner.insert(self.field.name.clone(), Value::Array(Vec::new()));
        }
        Ok(())
    }

    /// Nested values decode through the related resource. List fields gain one element per
    /// call; single fields are decoded in place and cleared when the element is destroyed.
    async fn decode_nested(
        &self,
        rel: &Relationship,
        owner: &mut Record,
        value: &MetaValue,
        ctx: &mut Context,
    ) -> Result<(), AppError> {
        let resource = self.nested.get(&rel.model, ctx)?;
        let name = self.field.name.clone();
        match rel.kind {
            RelationshipKind::HasMany | RelationshipKind::Many2Many => {
                let mut child = resource.new_record();
                let decoded = resource.decode(ctx, &mut child, &value.meta_values).await?;
                let list = owner.entry(name).or_insert_with(|| Value::Array(Vec::new()));
                if !list.is_array() {
                    *list = Value::Array(Vec::new());
                }
                if let (Decoded::Applied, Value::Array(items)) = (decoded, list) {
                    items.push(Value::Object(child));
                }
            }
            RelationshipKind::HasOne | RelationshipKind::BelongsTo => {
                let db = ctx.get_db();
                let schema = db.schema(&self.owner_model)?;
                load_unloaded(&db, &schema, owner, &self.field).await?;
                let mut child = match owner.get(&name) {
                    Some(Value::Object(current)) if !current.is_empty() => current.clone(),
                    _ => resource.new_record(),
                };
                match resource.decode(ctx, &mut child, &value.meta_values).await? {
                    Decoded::Applied => {
                        owner.insert(name, Value::Object(child));
                    }
                    Decoded::Skipped => {
                        owner.insert(name, Value::Null);
                        if rel.kind == RelationshipKind::BelongsTo {
                            if let Some(fk) = schema.field(&rel.foreign_key) {
                                owner.insert(fk.name.clone(), fk.kind.zero_value());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Setter for FieldSetter {
    async fn set(&self, record: &mut Record, value: &MetaValue, ctx: &mut Context) -> Result<(), AppError> {
        let Some(target) = self.owner_object(record, ctx).await? else {
            return Ok(());
        };
        if let Strategy::Relation(rel) = &self.strategy {
            return self.set_relation(rel, target, value, ctx).await;
        }
        if self.field.kind.is_pointer() && codec::to_string(&value.value).is_empty() && !value.has_nested() {
            target.insert(self.field.name.clone(), Value::Null);
            return Ok(());
        }
        let v = self.scalar(value, ctx)?;
        target.insert(self.field.name.clone(), v);
        Ok(())
    }
}

/// The object reached by following `hops` in memory, allocating empty objects where missing.
pub(crate) fn object_at<'a>(record: &'a mut Record, hops: &[String]) -> Option<&'a mut Record> {
    let Some((first, rest)) = hops.split_first() else {
        return Some(record);
    };
    let slot = record.entry(first.clone()).or_insert(Value::Null);
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    object_at(slot.as_object_mut()?, rest)
}

/// Plain object built from nested values, indexed elements collected into lists.
fn nested_object(values: &MetaValues) -> Value {
    let mut out = Map::new();
    for mv in values {
        let v = if mv.has_nested() {
            nested_object(&mv.meta_values)
        } else {
            mv.value.clone()
        };
        if mv.index.is_some() {
            let list = out.entry(mv.name.clone()).or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = list {
                items.push(v);
            }
        } else {
            out.insert(mv.name.clone(), v);
        }
    }
    Value::Object(out)
}
