//! The four resource handlers and their permission-checked entry points.

use super::meta_values::MetaValues;
use super::query::{primary_query, primary_query_from_metas};
use super::Resource;
use crate::context::Context;
use crate::error::AppError;
use crate::model::Record;
use crate::roles::PermissionMode;
use crate::sql::{Direction, Filter};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindOne {
    /// The stored record was merged into the caller's record.
    Found,
    /// The submission asked for deletion and the record was deleted; skip remaining processing.
    Destroyed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FindMany {
    Records(Vec<Record>),
    Count(i64),
}

#[async_trait]
pub trait FindOneHandler: Send + Sync {
    async fn find_one(
        &self,
        res: &Resource,
        record: &mut Record,
        meta_values: Option<&MetaValues>,
        ctx: &mut Context,
    ) -> Result<FindOne, AppError>;
}

#[async_trait]
pub trait FindManyHandler: Send + Sync {
    async fn find_many(&self, res: &Resource, ctx: &mut Context) -> Result<FindMany, AppError>;
}

#[async_trait]
pub trait SaveHandler: Send + Sync {
    async fn save(&self, res: &Resource, record: &mut Record, ctx: &mut Context) -> Result<(), AppError>;
}

#[async_trait]
pub trait DeleteHandler: Send + Sync {
    async fn delete(&self, res: &Resource, record: &mut Record, ctx: &mut Context) -> Result<(), AppError>;
}

/// Database-backed handlers every resource starts with.
pub struct DefaultHandlers;

fn merge_columns(res: &Resource, record: &mut Record, found: Record) {
    let schema = res.schema();
    let mut found = found;
    for field in schema.columns() {
        if let Some(v) = found.remove(&field.name) {
            record.insert(field.name.clone(), v);
        }
    }
}

#[async_trait]
impl FindOneHandler for DefaultHandlers {
    async fn find_one(
        &self,
        res: &Resource,
        record: &mut Record,
        meta_values: Option<&MetaValues>,
        ctx: &mut Context,
    ) -> Result<FindOne, AppError> {
        let filter = match meta_values {
            Some(values) => primary_query_from_metas(res, values),
            None => primary_query(res, &ctx.resource_id),
        }
        .ok_or(AppError::RecordNotFound)?;
        let db = ctx.get_db();
        if meta_values.is_some_and(MetaValues::is_destroy) && res.has_permission(PermissionMode::Delete, ctx) {
            db.delete_where(res.model(), &filter).await?;
            return Ok(FindOne::Destroyed);
        }
        let found = db.first(res.model(), &filter).await?;
        merge_columns(res, record, found);
        Ok(FindOne::Found)
    }
}

#[async_trait]
impl FindManyHandler for DefaultHandlers {
    async fn find_many(&self, res: &Resource, ctx: &mut Context) -> Result<FindMany, AppError> {
        let db = ctx.get_db();
        if ctx.count_only {
            return Ok(FindMany::Count(db.count(res.model(), &Filter::new()).await?));
        }
        let order = res.primary_field().db_name.clone();
        let records = db
            .find(res.model(), &Filter::new(), Some((order.as_str(), Direction::Desc)))
            .await?;
        Ok(FindMany::Records(records))
    }
}

#[async_trait]
impl SaveHandler for DefaultHandlers {
    async fn save(&self, res: &Resource, record: &mut Record, ctx: &mut Context) -> Result<(), AppError> {
        ctx.get_db().save(res.model(), record).await
    }
}

#[async_trait]
impl DeleteHandler for DefaultHandlers {
    async fn delete(&self, res: &Resource, record: &mut Record, ctx: &mut Context) -> Result<(), AppError> {
        let filter = primary_query(res, &ctx.resource_id).ok_or(AppError::RecordNotFound)?;
        let db = ctx.get_db();
        let found = db.first(res.model(), &filter).await?;
        db.delete(res.model(), &found).await?;
        merge_columns(res, record, found);
        Ok(())
    }
}

impl Resource {
    pub async fn call_find_one(
        &self,
        record: &mut Record,
        meta_values: Option<&MetaValues>,
        ctx: &mut Context,
    ) -> Result<FindOne, AppError> {
        if !self.has_permission(PermissionMode::Read, ctx) {
            return Err(AppError::PermissionDenied);
        }
        let handler = self.handlers.find_one.clone();
        handler.find_one(self, record, meta_values, ctx).await
    }

    pub async fn call_find_many(&self, ctx: &mut Context) -> Result<FindMany, AppError> {
        if !self.has_permission(PermissionMode::Read, ctx) {
            return Err(AppError::PermissionDenied);
        }
        let handler = self.handlers.find_many.clone();
        handler.find_many(self, ctx).await
    }

    /// Allowed with Create permission for a record without primary key, or with Update.
    pub async fn call_save(&self, record: &mut Record, ctx: &mut Context) -> Result<(), AppError> {
        let creating = self.schema().primary_key_is_zero(record);
        let allowed = (creating && self.has_permission(PermissionMode::Create, ctx))
            || self.has_permission(PermissionMode::Update, ctx);
        if !allowed {
            return Err(AppError::PermissionDenied);
        }
        let handler = self.handlers.save.clone();
        handler.save(self, record, ctx).await
    }

    pub async fn call_delete(&self, record: &mut Record, ctx: &mut Context) -> Result<(), AppError> {
        if !self.has_permission(PermissionMode::Delete, ctx) {
            return Err(AppError::PermissionDenied);
        }
        let handler = self.handlers.delete.clone();
        handler.delete(self, record, ctx).await
    }
}
