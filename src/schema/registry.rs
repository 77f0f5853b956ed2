//! Central lookup of model definitions, scanners and memoized schemas.

use super::parse::parse_schema;
use super::Schema;
use crate::config::{validate_model, ModelDef};
use crate::error::{CodecError, ConfigError, SchemaError};
use crate::model::Model;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A custom field type that knows how to build its stored value from arbitrary input.
pub trait Scanner: Send + Sync {
    fn scan(&self, value: &Value) -> Result<Value, CodecError>;
}

impl<F> Scanner for F
where
    F: Fn(&Value) -> Result<Value, CodecError> + Send + Sync,
{
    fn scan(&self, value: &Value) -> Result<Value, CodecError> {
        self(value)
    }
}

#[derive(Default)]
pub struct Registry {
    models: RwLock<IndexMap<String, ModelDef>>,
    scanners: RwLock<HashMap<String, Arc<dyn Scanner>>>,
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, def: ModelDef) -> Result<(), ConfigError> {
        validate_model(&def)?;
        let mut models = write(&self.models);
        if models.contains_key(&def.name) {
            return Err(ConfigError::DuplicateModel(def.name));
        }
        tracing::debug!(model = %def.name, fields = def.fields.len(), "register model");
        models.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn register_model<M: Model>(&self) -> Result<(), ConfigError> {
        self.register(M::model_def())
    }

    pub fn register_scanner(&self, name: impl Into<String>, scanner: impl Scanner + 'static) {
        write(&self.scanners).insert(name.into(), Arc::new(scanner));
    }

    pub fn scanner(&self, name: &str) -> Option<Arc<dyn Scanner>> {
        read(&self.scanners).get(name).cloned()
    }

    pub fn definition(&self, name: &str) -> Option<ModelDef> {
        read(&self.models).get(name).cloned()
    }

    pub fn model_names(&self) -> Vec<String> {
        read(&self.models).keys().cloned().collect()
    }

    /// Parsed schema for a model, computed once and shared afterwards.
    pub fn parse(&self, name: &str) -> Result<Arc<Schema>, SchemaError> {
        if let Some(schema) = read(&self.schemas).get(name) {
            return Ok(schema.clone());
        }
        let def = self
            .definition(name)
            .ok_or_else(|| SchemaError::UnknownModel(name.to_string()))?;
        let schema = Arc::new(parse_schema(&def, self)?);
        let mut schemas = write(&self.schemas);
        Ok(schemas.entry(name.to_string()).or_insert(schema).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldDef;

    #[test]
    fn parse_is_memoized() {
        let registry = Registry::new();
        registry
            .register(ModelDef::new("Language").with_id_and_timestamps().field(FieldDef::new("Name", "string")))
            .unwrap();
        let a = registry.parse("Language").unwrap();
        let b = registry.parse("Language").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(
            registry.register(ModelDef::new("Language")),
            Err(ConfigError::DuplicateModel(_))
        ));
    }

    #[test]
    fn scanners_resolve_field_kinds() {
        let registry = Registry::new();
        registry.register_scanner("Point", |v: &Value| -> Result<Value, CodecError> { Ok(v.clone()) });
        registry
            .register(ModelDef::new("Place").field(FieldDef::new("ID", "uint")).field(FieldDef::new("Location", "Point")))
            .unwrap();
        let schema = registry.parse("Place").unwrap();
        assert_eq!(
            schema.field("Location").unwrap().kind,
            crate::schema::FieldKind::Scanner("Point".into())
        );
    }
}
