//! Field descriptors of a resource: what a form field reads from and writes to.

use super::meta_values::MetaValue;
use super::setter::{FieldSetter, Setter};
use super::valuer::{PathValuer, Valuer};
use super::Resource;
use crate::codec;
use crate::context::Context;
use crate::error::{AppError, SchemaError};
use crate::model::Record;
use crate::roles::{Permission, PermissionMode};
use crate::schema::{Field, FieldKind, Registry, RelationshipKind};
use crate::validations::ValidationError;
use serde_json::Value;
use std::sync::Arc;

/// A named accessor for one field, possibly reached through relationship hops
/// (`Profile.Phone.Num`).
///
/// Built with [`Meta::new`] and the `with_*` methods, then bound to a model in two phases:
/// [`Meta::pre_initialize`] resolves the path, [`Meta::initialize`] installs the default valuer
/// and setter where none were configured.
pub struct Meta {
    pub name: String,
    /// Dotted field path; the meta name when empty.
    pub field_name: String,
    pub permission: Option<Permission>,
    /// Resource used to decode nested values of relationship fields.
    pub resource: Option<Arc<Resource>>,
    setter: Option<Arc<dyn Setter>>,
    valuer: Option<Arc<dyn Valuer>>,
    formatted_valuer: Option<Arc<dyn Valuer>>,
    base_model: String,
    owner_model: String,
    field: Option<Field>,
}

impl Meta {
    pub fn new(name: impl Into<String>) -> Self {
        Meta {
            name: name.into(),
            field_name: String::new(),
            permission: None,
            resource: None,
            setter: None,
            valuer: None,
            formatted_valuer: None,
            base_model: String::new(),
            owner_model: String::new(),
            field: None,
        }
    }

    pub fn with_field_name(mut self, path: impl Into<String>) -> Self {
        self.field_name = path.into();
        self
    }

    pub fn with_setter(mut self, setter: impl Setter + 'static) -> Self {
        self.setter = Some(Arc::new(setter));
        self
    }

    pub fn with_valuer(mut self, valuer: impl Valuer + 'static) -> Self {
        self.valuer = Some(Arc::new(valuer));
        self
    }

    pub fn with_formatted_valuer(mut self, valuer: impl Valuer + 'static) -> Self {
        self.formatted_valuer = Some(Arc::new(valuer));
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn with_resource(mut self, resource: Arc<Resource>) -> Self {
        self.resource = Some(resource);
        self
    }

    /// The resolved target field, once pre-initialized.
    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    /// Model owning the target field: the base model, or the last hop's model.
    pub fn owner_model(&self) -> &str {
        &self.owner_model
    }

    pub fn setter(&self) -> Option<&Arc<dyn Setter>> {
        self.setter.as_ref()
    }

    pub fn valuer(&self) -> Option<&Arc<dyn Valuer>> {
        self.valuer.as_ref()
    }

    fn path(&self) -> Vec<String> {
        self.field_name.split('.').map(str::to_string).collect()
    }

    /// Resolves the dotted path from `base_model`. Every hop but the last must be a
    /// single-valued relationship.
    pub fn pre_initialize(&mut self, base_model: &str, registry: &Registry) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::InvalidMeta {
                meta: self.field_name.clone(),
                reason: "meta should have a name".into(),
            });
        }
        if self.field_name.is_empty() {
            self.field_name = self.name.clone();
        }
        let not_found = |segment: &str| SchemaError::FieldNotFound {
            model: base_model.to_string(),
            path: self.field_name.clone(),
            segment: segment.to_string(),
        };

        let path = self.path();
        let mut schema = registry.parse(base_model)?;
        let mut resolved = None;
        for (i, segment) in path.iter().enumerate() {
            let field = schema.field(segment).ok_or_else(|| not_found(segment))?;
            if i + 1 == path.len() {
                resolved = Some((field.clone(), schema.name.clone()));
                break;
            }
            let rel = field
                .relationship
                .as_ref()
                .filter(|r| matches!(r.kind, RelationshipKind::BelongsTo | RelationshipKind::HasOne))
                .ok_or_else(|| not_found(segment))?;
            schema = registry.parse(&rel.model)?;
        }
        let (field, owner) = resolved.ok_or_else(|| not_found(&self.field_name))?;
        self.base_model = base_model.to_string();
        self.owner_model = owner;
        self.field = Some(field);
        Ok(())
    }

    /// Installs the default valuer and setter. Fails when the field kind has no setter.
    pub fn initialize(&mut self) -> Result<(), SchemaError> {
        let field = self.field.clone().ok_or_else(|| SchemaError::InvalidMeta {
            meta: self.name.clone(),
            reason: "not pre-initialized".into(),
        })?;
        let mut path = self.path();
        if self.valuer.is_none() {
            self.valuer = Some(Arc::new(PathValuer {
                base_model: self.base_model.clone(),
                path: path.clone(),
            }));
        }
        if self.setter.is_none() {
            path.pop();
            let setter = FieldSetter::new(
                &self.name,
                path,
                &self.base_model,
                &self.owner_model,
                &field,
                self.resource.clone(),
            )?;
            self.setter = Some(Arc::new(setter));
        }
        Ok(())
    }

    pub fn has_permission(&self, mode: PermissionMode, ctx: &Context) -> bool {
        self.permission
            .as_ref()
            .map_or(true, |p| p.has_permission(mode, &ctx.roles))
    }

    /// Applies a submitted value. Coercion failures become a validation error on the context
    /// and do not stop the caller.
    pub async fn set(&self, record: &mut Record, value: &MetaValue, ctx: &mut Context) -> Result<(), AppError> {
        let setter = self.setter.clone().ok_or_else(|| SchemaError::NoSetter {
            meta: self.name.clone(),
            kind: self
                .field
                .as_ref()
                .map(|f| f.kind.to_string())
                .unwrap_or_default(),
        })?;
        match setter.set(record, value, ctx).await {
            Ok(()) => Ok(()),
            Err(AppError::Codec(e)) => {
                let schema = ctx.get_db().schema(&self.base_model)?;
                ctx.add_error(ValidationError::for_record(
                    &schema,
                    record,
                    &self.name,
                    format!(
                        "Failed to set Meta {}'s value with {}, got {}",
                        self.name,
                        codec::to_string(&value.value),
                        e
                    ),
                ));
                Ok(())
            }
            Err(AppError::Validation(errors)) => {
                ctx.add_errors(errors);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn value(&self, record: &mut Record, ctx: &Context) -> Result<Value, AppError> {
        match &self.valuer {
            Some(valuer) => valuer.value(record, ctx).await,
            None => Ok(Value::Null),
        }
    }

    /// The formatted valuer's output, falling back to the plain value.
    pub async fn formatted_value(&self, record: &mut Record, ctx: &Context) -> Result<Value, AppError> {
        match &self.formatted_valuer {
            Some(valuer) => valuer.value(record, ctx).await,
            None => self.value(record, ctx).await,
        }
    }

    /// Empties a list field before the first indexed element of a submission is applied.
    pub(crate) fn clear_collection(&self, record: &mut Record) {
        let Some(field) = &self.field else { return };
        if !matches!(field.kind.indirect(), FieldKind::Slice(_)) {
            return;
        }
        let mut hops = self.path();
        hops.pop();
        if let Some(owner) = super::setter::object_at(record, &hops) {
            owner.insert(field.name.clone(), Value::Array(Vec::new()));
        }
    }
}

impl std::fmt::Debug for Meta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meta")
            .field("name", &self.name)
            .field("field_name", &self.field_name)
            .field("owner_model", &self.owner_model)
            .finish()
    }
}
