//! Named before/after create/update hooks run by `Db::save`.

use crate::db::Db;
use crate::error::AppError;
use crate::model::Record;
use crate::schema::Schema;
use crate::validations::ValidationError;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
}

/// What a callback sees: the session, the record's schema and the record being saved.
pub struct Scope<'a> {
    pub db: &'a Db,
    pub schema: &'a Schema,
    pub record: &'a mut Record,
    pub errors: Vec<ValidationError>,
}

impl Scope<'_> {
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[async_trait]
pub trait Callback: Send + Sync {
    async fn call(&self, scope: &mut Scope<'_>) -> Result<(), AppError>;
}

#[async_trait]
impl<F> Callback for F
where
    F: Fn(&mut Scope<'_>) -> Result<(), AppError> + Send + Sync,
{
    async fn call(&self, scope: &mut Scope<'_>) -> Result<(), AppError> {
        self(scope)
    }
}

type Chain = IndexMap<String, Arc<dyn Callback>>;

/// Ordered callback chains. Registering an existing name replaces it in place.
#[derive(Default)]
pub struct Callbacks {
    chains: RwLock<HashMap<CallbackKind, Chain>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: CallbackKind, name: impl Into<String>, callback: impl Callback + 'static) {
        let mut chains = self.chains.write().unwrap_or_else(|e| e.into_inner());
        chains
            .entry(kind)
            .or_default()
            .insert(name.into(), Arc::new(callback));
    }

    pub fn remove(&self, kind: CallbackKind, name: &str) {
        let mut chains = self.chains.write().unwrap_or_else(|e| e.into_inner());
        if let Some(chain) = chains.get_mut(&kind) {
            chain.shift_remove(name);
        }
    }

    pub fn names(&self, kind: CallbackKind) -> Vec<String> {
        let chains = self.chains.read().unwrap_or_else(|e| e.into_inner());
        chains
            .get(&kind)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn chain(&self, kind: CallbackKind) -> Vec<Arc<dyn Callback>> {
        let chains = self.chains.read().unwrap_or_else(|e| e.into_inner());
        chains
            .get(&kind)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Runs every callback of `kind` in order and returns the validation errors they collected.
    pub(crate) async fn run(
        &self,
        kind: CallbackKind,
        db: &Db,
        schema: &Schema,
        record: &mut Record,
    ) -> Result<Vec<ValidationError>, AppError> {
        let mut scope = Scope {
            db,
            schema,
            record,
            errors: Vec::new(),
        };
        for callback in self.chain(kind) {
            callback.call(&mut scope).await?;
        }
        Ok(scope.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Scope<'_>) -> Result<(), AppError> {
        Ok(())
    }

    fn other(_: &mut Scope<'_>) -> Result<(), AppError> {
        Ok(())
    }

    #[test]
    fn replacing_by_name_keeps_position() {
        let callbacks = Callbacks::new();
        callbacks.register(CallbackKind::BeforeCreate, "a", noop);
        callbacks.register(CallbackKind::BeforeCreate, "b", noop);
        callbacks.register(CallbackKind::BeforeCreate, "a", other);
        assert_eq!(callbacks.names(CallbackKind::BeforeCreate), vec!["a", "b"]);
        callbacks.remove(CallbackKind::BeforeCreate, "a");
        assert_eq!(callbacks.names(CallbackKind::BeforeCreate), vec!["b"]);
        assert!(callbacks.names(CallbackKind::AfterUpdate).is_empty());
    }
}
