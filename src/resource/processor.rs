//! Applying submitted values to a record: find, validate, set metas, post-process.

use super::crud::FindOne;
use super::meta_values::{MetaValues, DESTROY};
use super::query::primary_query_from_metas;
use super::Resource;
use crate::context::Context;
use crate::error::AppError;
use crate::model::Record;
use crate::roles::PermissionMode;
use async_trait::async_trait;
use std::collections::HashSet;

/// Checks a decoded submission. Validation errors are collected on the context.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, record: &Record, meta_values: &MetaValues, ctx: &mut Context) -> Result<(), AppError>;
}

#[async_trait]
impl<F> Validator for F
where
    F: Fn(&Record, &MetaValues, &mut Context) -> Result<(), AppError> + Send + Sync,
{
    async fn validate(&self, record: &Record, meta_values: &MetaValues, ctx: &mut Context) -> Result<(), AppError> {
        self(record, meta_values, ctx)
    }
}

/// Adjusts a record after its metas were applied.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, record: &mut Record, meta_values: &MetaValues, ctx: &mut Context) -> Result<(), AppError>;
}

#[async_trait]
impl<F> Processor for F
where
    F: Fn(&mut Record, &MetaValues, &mut Context) -> Result<(), AppError> + Send + Sync,
{
    async fn process(&self, record: &mut Record, meta_values: &MetaValues, ctx: &mut Context) -> Result<(), AppError> {
        self(record, meta_values, ctx)
    }
}

/// Outcome of [`Resource::decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    Applied,
    /// The submission was a deletion, or asked for one; nothing else was applied.
    Skipped,
}

fn collect(result: Result<(), AppError>, ctx: &mut Context) -> Result<(), AppError> {
    match result {
        Err(AppError::Validation(errors)) => {
            ctx.add_errors(errors);
            Ok(())
        }
        other => other,
    }
}

impl Resource {
    /// Decodes `meta_values` into `record`.
    ///
    /// When the submission carries primary key values the stored record is loaded first (or
    /// deleted, for `_destroy`). Metas are applied in submission order; names without a meta
    /// and metas the caller may not write are skipped. Per-field errors end up on `ctx`.
    pub async fn decode(
        &self,
        ctx: &mut Context,
        record: &mut Record,
        meta_values: &MetaValues,
    ) -> Result<Decoded, AppError> {
        if primary_query_from_metas(self, meta_values).is_some() {
            match self.call_find_one(record, Some(meta_values), ctx).await {
                Ok(FindOne::Found) | Err(AppError::RecordNotFound) => {}
                Ok(FindOne::Destroyed) => return Ok(Decoded::Skipped),
                Err(e) => return Err(e),
            }
        }

        for validator in self.validators.values() {
            let result = validator.validate(record, meta_values, ctx).await;
            collect(result, ctx)?;
        }

        if meta_values.is_destroy() {
            return Ok(Decoded::Skipped);
        }

        let mode = if self.schema().primary_key_is_zero(record) {
            PermissionMode::Create
        } else {
            PermissionMode::Update
        };
        let mut cleared: HashSet<&str> = HashSet::new();
        for mv in meta_values {
            if mv.name == DESTROY {
                continue;
            }
            let Some(meta) = self.metas.get(&mv.name) else {
                tracing::warn!(resource = %self.name, meta = %mv.name, "no meta for submitted value");
                continue;
            };
            if !meta.has_permission(mode, ctx) {
                continue;
            }
            if mv.index.is_some() && cleared.insert(mv.name.as_str()) {
                meta.clear_collection(record);
            }
            meta.set(record, mv, ctx).await?;
        }

        for processor in self.processors.values() {
            let result = processor.process(record, meta_values, ctx).await;
            collect(result, ctx)?;
        }
        Ok(Decoded::Applied)
    }
}
