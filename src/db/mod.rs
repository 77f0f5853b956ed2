//! Database session: record-level find, save and delete on top of a `Store`.

mod association;
mod callbacks;

pub use callbacks::{Callback, CallbackKind, Callbacks, Scope};

use crate::codec;
use crate::error::AppError;
use crate::model::{is_zero, Record};
use crate::schema::{FieldKind, Registry, RelationshipKind, Schema};
use crate::sql::{self, BindValue, Direction, Filter};
use crate::store::Store;
use async_recursion::async_recursion;
use serde_json::Value;
use std::sync::Arc;

/// Cheap clonable handle. Every clone starts without per-call settings.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn Store>,
    registry: Arc<Registry>,
    callbacks: Arc<Callbacks>,
    skip_validations: bool,
}

impl Db {
    pub fn new(store: Arc<dyn Store>, registry: Arc<Registry>) -> Self {
        Db {
            store,
            registry,
            callbacks: Arc::new(Callbacks::new()),
            skip_validations: false,
        }
    }

    /// A fresh session sharing the store, registry and callbacks, with settings reset.
    pub fn session(&self) -> Db {
        Db {
            store: self.store.clone(),
            registry: self.registry.clone(),
            callbacks: self.callbacks.clone(),
            skip_validations: false,
        }
    }

    pub fn with_skip_validations(&self, skip: bool) -> Db {
        let mut db = self.clone();
        db.skip_validations = skip;
        db
    }

    pub fn skip_validations(&self) -> bool {
        self.skip_validations
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn schema(&self, model: &str) -> Result<Arc<Schema>, AppError> {
        Ok(self.registry.parse(model)?)
    }

    /// Equality filter on every primary field of `record`.
    pub fn primary_filter(schema: &Schema, record: &Record) -> Result<Filter, AppError> {
        let mut filter = Filter::new();
        for f in schema.primary_fields() {
            let value = record.get(&f.name).unwrap_or(&Value::Null);
            filter = filter.eq(f.db_name.clone(), f.bind_value(value)?);
        }
        Ok(filter)
    }

    pub async fn find(
        &self,
        model: &str,
        filter: &Filter,
        order: Option<(&str, Direction)>,
    ) -> Result<Vec<Record>, AppError> {
        let schema = self.schema(model)?;
        let columns: Vec<&str> = schema.columns().map(|f| f.db_name.as_str()).collect();
        let q = sql::select(&schema.table, &columns, filter, order, None);
        let rows = self.store.fetch_all(&q).await?;
        Ok(rows.into_iter().map(|r| schema.record_from_row(r)).collect())
    }

    /// The first matching row, or `RecordNotFound`.
    pub async fn first(&self, model: &str, filter: &Filter) -> Result<Record, AppError> {
        let schema = self.schema(model)?;
        let columns: Vec<&str> = schema.columns().map(|f| f.db_name.as_str()).collect();
        let order = (
            schema.prioritized_primary_field().db_name.as_str(),
            Direction::Asc,
        );
        let q = sql::select(&schema.table, &columns, filter, Some(order), Some(1));
        match self.store.fetch_optional(&q).await? {
            Some(row) => Ok(schema.record_from_row(row)),
            None => Err(AppError::RecordNotFound),
        }
    }

    pub async fn count(&self, model: &str, filter: &Filter) -> Result<i64, AppError> {
        let schema = self.schema(model)?;
        let q = sql::count(&schema.table, filter);
        self.store.fetch_count(&q).await
    }

    /// Records whose prioritized primary field is one of `keys`, in key order.
    pub async fn find_by_primary_keys(&self, model: &str, keys: &[String]) -> Result<Vec<Record>, AppError> {
        let schema = self.schema(model)?;
        let field = schema.prioritized_primary_field();
        let values = keys
            .iter()
            .map(|k| field.bind_value(&Value::String(k.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let filter = Filter::new().is_in(field.db_name.clone(), values);
        let mut found = self.find(model, &filter, None).await?;
        found.sort_by_key(|r| {
            let key = codec::to_string(r.get(&field.name).unwrap_or(&Value::Null));
            keys.iter().position(|k| *k == key).unwrap_or(usize::MAX)
        });
        Ok(found)
    }

    /// Re-reads the stored columns of `record`.
    pub async fn reload(&self, model: &str, record: &mut Record) -> Result<(), AppError> {
        let schema = self.schema(model)?;
        let filter = Self::primary_filter(&schema, record)?;
        let fresh = self.first(model, &filter).await?;
        for field in schema.columns() {
            if let Some(v) = fresh.get(&field.name) {
                record.insert(field.name.clone(), v.clone());
            }
        }
        Ok(())
    }

    pub async fn delete(&self, model: &str, record: &Record) -> Result<u64, AppError> {
        let schema = self.schema(model)?;
        let filter = Self::primary_filter(&schema, record)?;
        let q = sql::delete(&schema.table, &filter);
        self.store.execute(&q).await
    }

    pub async fn delete_where(&self, model: &str, filter: &Filter) -> Result<u64, AppError> {
        let schema = self.schema(model)?;
        let q = sql::delete(&schema.table, filter);
        self.store.execute(&q).await
    }

    /// Upsert-style save: inserts when the primary key is zero, otherwise updates (inserting when
    /// no row matched). Saves belongs-to targets first and has-one, has-many and many-to-many
    /// associations after the record itself. Not transactional.
    #[async_recursion]
    pub async fn save(&self, model: &str, record: &mut Record) -> Result<(), AppError> {
        let schema = self.schema(model)?;
        self.save_belongs_to(&schema, record).await?;

        let creating = schema.primary_key_is_zero(record);
        let (before, after) = if creating {
            (CallbackKind::BeforeCreate, CallbackKind::AfterCreate)
        } else {
            (CallbackKind::BeforeUpdate, CallbackKind::AfterUpdate)
        };
        let errors = self.callbacks.run(before, self, &schema, record).await?;
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        touch_timestamps(&schema, record);
        if creating {
            self.insert(&schema, record).await?;
        } else if self.update(&schema, record).await? == 0 {
            self.insert(&schema, record).await?;
        }

        let errors = self.callbacks.run(after, self, &schema, record).await?;
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        self.save_associations(&schema, record).await
    }

    async fn save_belongs_to(&self, schema: &Schema, record: &mut Record) -> Result<(), AppError> {
        for field in &schema.fields {
            let Some(rel) = &field.relationship else { continue };
            if rel.kind != RelationshipKind::BelongsTo {
                continue;
            }
            let mut target = match record.remove(&field.name) {
                Some(Value::Object(target)) => target,
                Some(other) => {
                    record.insert(field.name.clone(), other);
                    continue;
                }
                None => continue,
            };
            if !target.is_empty() {
                self.save(&rel.model, &mut target).await?;
                let key = target.get(&rel.association_key).cloned().unwrap_or(Value::Null);
                record.insert(rel.foreign_key.clone(), key);
            }
            record.insert(field.name.clone(), Value::Object(target));
        }
        Ok(())
    }

    async fn save_associations(&self, schema: &Schema, record: &mut Record) -> Result<(), AppError> {
        for field in &schema.fields {
            let Some(rel) = &field.relationship else { continue };
            let owner_key = record.get(&rel.association_key).cloned().unwrap_or(Value::Null);
            match rel.kind {
                RelationshipKind::BelongsTo => {}
                RelationshipKind::HasOne => {
                    if let Some(Value::Object(child)) = record.get_mut(&field.name) {
                        if !child.is_empty() {
                            child.insert(rel.foreign_key.clone(), owner_key);
                            self.save(&rel.model, child).await?;
                        }
                    }
                }
                RelationshipKind::HasMany => {
                    if let Some(Value::Array(children)) = record.get_mut(&field.name) {
                        for child in children.iter_mut() {
                            if let Value::Object(child) = child {
                                child.insert(rel.foreign_key.clone(), owner_key.clone());
                                self.save(&rel.model, child).await?;
                            }
                        }
                    }
                }
                RelationshipKind::Many2Many => {
                    let owner_key = record.get(&rel.foreign_key).cloned().unwrap_or(Value::Null);
                    if let Some(Value::Array(targets)) = record.get_mut(&field.name) {
                        for target in targets.iter_mut() {
                            if let Value::Object(target) = target {
                                let target_schema = self.schema(&rel.model)?;
                                if target_schema.primary_key_is_zero(target) {
                                    self.save(&rel.model, target).await?;
                                }
                                self.link(schema, &field.name, &owner_key, target).await?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn insert(&self, schema: &Schema, record: &mut Record) -> Result<(), AppError> {
        let mut values = Vec::new();
        for field in schema.columns() {
            let current = record.get(&field.name).cloned().unwrap_or(Value::Null);
            if field.auto_increment && is_zero(&current) {
                continue;
            }
            let value = if field.primary_key && field.kind.indirect() == &FieldKind::Uuid && is_zero(&current) {
                let generated = Value::String(uuid::Uuid::new_v4().to_string());
                record.insert(field.name.clone(), generated.clone());
                generated
            } else {
                current
            };
            values.push((field.db_name.clone(), field.bind_value(&value)?));
        }
        let returning: Vec<&str> = schema.columns().map(|f| f.db_name.as_str()).collect();
        let q = sql::insert(&schema.table, values, &returning);
        if let Some(row) = self.store.fetch_optional(&q).await? {
            let stored = schema.record_from_row(row);
            for field in schema.columns() {
                if let Some(v) = stored.get(&field.name) {
                    record.insert(field.name.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    async fn update(&self, schema: &Schema, record: &Record) -> Result<u64, AppError> {
        let filter = Self::primary_filter(schema, record)?;
        let mut values: Vec<(String, BindValue)> = Vec::new();
        for field in schema.columns().filter(|f| !f.primary_key) {
            let value = record.get(&field.name).unwrap_or(&Value::Null);
            values.push((field.db_name.clone(), field.bind_value(value)?));
        }
        if values.is_empty() {
            let n = self.store.fetch_count(&sql::count(&schema.table, &filter)).await?;
            return Ok(n as u64);
        }
        let q = sql::update(&schema.table, values, &filter);
        self.store.execute(&q).await
    }
}

fn touch_timestamps(schema: &Schema, record: &mut Record) {
    let now = Value::String(codec::format_time(&chrono::Utc::now()));
    if let Some(f) = schema.field("CreatedAt") {
        if f.kind.indirect() == &FieldKind::Time && record.get(&f.name).map(is_zero).unwrap_or(true) {
            record.insert(f.name.clone(), now.clone());
        }
    }
    if let Some(f) = schema.field("UpdatedAt") {
        if f.kind.indirect() == &FieldKind::Time {
            record.insert(f.name.clone(), now);
        }
    }
}
