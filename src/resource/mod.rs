//! Resources: a model wrapped with primary fields, permissions, metas and CRUD handlers.

mod crud;
mod meta;
mod meta_values;
mod processor;
mod query;
mod setter;
mod valuer;

pub use crud::{DefaultHandlers, DeleteHandler, FindMany, FindManyHandler, FindOne, FindOneHandler, SaveHandler};
pub use meta::Meta;
pub use meta_values::{MetaValue, MetaValues, DESTROY};
pub use processor::{Decoded, Processor, Validator};
pub use query::{primary_query, primary_query_from_metas};
pub use setter::Setter;
pub use valuer::Valuer;

use crate::case;
use crate::context::Context;
use crate::error::SchemaError;
use crate::model::Record;
use crate::roles::{Permission, PermissionMode};
use crate::schema::{Field, Registry, Schema};
use indexmap::IndexMap;
use std::sync::Arc;

struct Handlers {
    find_one: Arc<dyn FindOneHandler>,
    find_many: Arc<dyn FindManyHandler>,
    save: Arc<dyn SaveHandler>,
    delete: Arc<dyn DeleteHandler>,
}

impl Default for Handlers {
    fn default() -> Self {
        let handlers = Arc::new(DefaultHandlers);
        Handlers {
            find_one: handlers.clone(),
            find_many: handlers.clone(),
            save: handlers.clone(),
            delete: handlers,
        }
    }
}

pub struct Resource {
    /// Human label, `Credit Card` for model `CreditCard`.
    pub name: String,
    model: String,
    schema: Arc<Schema>,
    registry: Arc<Registry>,
    primary_fields: Vec<Field>,
    primary_field: Field,
    pub permission: Option<Permission>,
    validators: IndexMap<String, Arc<dyn Validator>>,
    processors: IndexMap<String, Arc<dyn Processor>>,
    metas: IndexMap<String, Arc<Meta>>,
    handlers: Handlers,
}

impl Resource {
    /// Wraps a registered model. Fails for an empty or unknown model name and for models
    /// without primary key.
    pub fn new(model: &str, registry: &Arc<Registry>) -> Result<Self, SchemaError> {
        if model.trim().is_empty() {
            return Err(SchemaError::UnknownModel(model.to_string()));
        }
        let schema = registry.parse(model)?;
        let primary_fields: Vec<Field> = schema.primary_fields().into_iter().cloned().collect();
        if primary_fields.is_empty() {
            return Err(SchemaError::NoPrimaryKey {
                model: model.to_string(),
            });
        }
        Ok(Resource {
            name: case::humanize(model),
            model: model.to_string(),
            primary_field: schema.prioritized_primary_field().clone(),
            primary_fields,
            schema,
            registry: registry.clone(),
            permission: None,
            validators: IndexMap::new(),
            processors: IndexMap::new(),
            metas: IndexMap::new(),
            handlers: Handlers::default(),
        })
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Primary fields in declared order.
    pub fn primary_fields(&self) -> &[Field] {
        &self.primary_fields
    }

    pub fn primary_field(&self) -> &Field {
        &self.primary_field
    }

    /// Path segment used by the HTTP adapter: `credit_cards` for `CreditCard`.
    pub fn param(&self) -> String {
        case::plural_snake(&self.model)
    }

    /// Overrides the primary fields. An empty list restores the schema's primary key.
    pub fn set_primary_fields(&mut self, names: &[&str]) -> Result<(), SchemaError> {
        if names.is_empty() {
            self.primary_fields = self.schema.primary_fields().into_iter().cloned().collect();
            self.primary_field = self.schema.prioritized_primary_field().clone();
            return Ok(());
        }
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let field = self.schema.field(name).ok_or_else(|| SchemaError::FieldNotFound {
                model: self.model.clone(),
                path: name.to_string(),
                segment: name.to_string(),
            })?;
            fields.push(field.clone());
        }
        let prioritized = self.schema.prioritized_primary_field();
        self.primary_field = fields
            .iter()
            .find(|f| f.name == prioritized.name)
            .unwrap_or(&fields[0])
            .clone();
        self.primary_fields = fields;
        Ok(())
    }

    pub fn has_permission(&self, mode: PermissionMode, ctx: &Context) -> bool {
        self.permission
            .as_ref()
            .map_or(true, |p| p.has_permission(mode, &ctx.roles))
    }

    /// A record holding every field's zero value.
    pub fn new_record(&self) -> Record {
        self.schema.new_record()
    }

    /// Binds `meta` to this resource's model and adds it, replacing a meta of the same name.
    pub fn add_meta(&mut self, mut meta: Meta) -> Result<Arc<Meta>, SchemaError> {
        meta.pre_initialize(&self.model, &self.registry)?;
        meta.initialize()?;
        let meta = Arc::new(meta);
        self.metas.insert(meta.name.clone(), meta.clone());
        Ok(meta)
    }

    /// Adds a meta for every field not covered yet. Fields whose kind has no setter are left out.
    pub fn add_default_metas(&mut self) -> Result<(), SchemaError> {
        let names: Vec<String> = self
            .schema
            .fields
            .iter()
            .filter(|f| !f.db_name.is_empty() || f.relationship.is_some())
            .map(|f| f.name.clone())
            .collect();
        for name in names {
            if self.metas.contains_key(&name) {
                continue;
            }
            match self.add_meta(Meta::new(name.clone())) {
                Ok(_) => {}
                Err(SchemaError::NoSetter { .. }) => {
                    tracing::debug!(resource = %self.name, field = %name, "no default meta");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn meta(&self, name: &str) -> Option<&Arc<Meta>> {
        self.metas.get(name)
    }

    pub fn metas(&self) -> impl Iterator<Item = &Arc<Meta>> {
        self.metas.values()
    }

    /// Adds a validator; an existing one with the same name is replaced in place.
    pub fn add_validator(&mut self, name: impl Into<String>, validator: impl Validator + 'static) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    /// Adds a processor; an existing one with the same name is replaced in place.
    pub fn add_processor(&mut self, name: impl Into<String>, processor: impl Processor + 'static) {
        self.processors.insert(name.into(), Arc::new(processor));
    }

    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }

    pub fn processor_names(&self) -> Vec<&str> {
        self.processors.keys().map(String::as_str).collect()
    }

    pub fn set_find_one_handler(&mut self, handler: impl FindOneHandler + 'static) {
        self.handlers.find_one = Arc::new(handler);
    }

    pub fn set_find_many_handler(&mut self, handler: impl FindManyHandler + 'static) {
        self.handlers.find_many = Arc::new(handler);
    }

    pub fn set_save_handler(&mut self, handler: impl SaveHandler + 'static) {
        self.handlers.save = Arc::new(handler);
    }

    pub fn set_delete_handler(&mut self, handler: impl DeleteHandler + 'static) {
        self.handlers.delete = Arc::new(handler);
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("metas", &self.metas.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldDef, ModelDef};
    use crate::error::AppError;
    use serde_json::json;

    fn registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        registry
            .register(ModelDef::new("CreditCard").with_id_and_timestamps().field(FieldDef::new("Number", "string")))
            .unwrap();
        registry
            .register(ModelDef::new("Note").field(FieldDef::new("Body", "string")))
            .unwrap();
        registry
    }

    #[test]
    fn construction_requires_a_primary_key() {
        let registry = registry();
        let res = Resource::new("CreditCard", &registry).unwrap();
        assert_eq!(res.name, "Credit Card");
        assert_eq!(res.param(), "credit_cards");
        assert_eq!(res.primary_field().name, "ID");

        assert!(matches!(
            Resource::new("Note", &registry),
            Err(SchemaError::NoPrimaryKey { .. })
        ));
        assert!(matches!(Resource::new("", &registry), Err(SchemaError::UnknownModel(_))));
        assert!(matches!(Resource::new("Ghost", &registry), Err(SchemaError::UnknownModel(_))));
    }

    #[test]
    fn validators_and_processors_upsert_in_place() {
        fn ok(_: &Record, _: &MetaValues, _: &mut Context) -> Result<(), AppError> {
            Ok(())
        }
        fn touch(record: &mut Record, _: &MetaValues, _: &mut Context) -> Result<(), AppError> {
            record.insert("Number".into(), json!("0000"));
            Ok(())
        }
        let mut res = Resource::new("CreditCard", &registry()).unwrap();
        res.add_validator("a", ok);
        res.add_validator("b", ok);
        res.add_validator("a", ok);
        assert_eq!(res.validator_names(), vec!["a", "b"]);
        res.add_processor("p", touch);
        res.add_processor("p", touch);
        assert_eq!(res.processor_names(), vec!["p"]);
    }

    #[test]
    fn primary_fields_can_be_overridden() {
        let mut res = Resource::new("CreditCard", &registry()).unwrap();
        res.set_primary_fields(&["Number"]).unwrap();
        assert_eq!(res.primary_field().name, "Number");
        assert!(res.set_primary_fields(&["Nope"]).is_err());
        res.set_primary_fields(&[]).unwrap();
        assert_eq!(res.primary_field().name, "ID");
    }
}
