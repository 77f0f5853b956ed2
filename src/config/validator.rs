//! Model definition validation: unique names and primary key references.

use crate::config::ModelDef;
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(models: &[ModelDef]) -> Result<(), ConfigError> {
    let mut model_names: HashSet<&str> = HashSet::new();
    for m in models {
        if m.name.trim().is_empty() {
            return Err(ConfigError::Validation("model name must not be empty".into()));
        }
        if !model_names.insert(m.name.as_str()) {
            return Err(ConfigError::DuplicateModel(m.name.clone()));
        }
        validate_model(m)?;
    }
    Ok(())
}

pub fn validate_model(model: &ModelDef) -> Result<(), ConfigError> {
    let mut field_names: HashSet<&str> = HashSet::new();
    for f in &model.fields {
        if f.name.trim().is_empty() || f.ty.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "model {}: field name and type are required",
                model.name
            )));
        }
        if !field_names.insert(f.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                model: model.name.clone(),
                field: f.name.clone(),
            });
        }
    }
    if let Some(pk) = &model.primary_key {
        for name in pk.names() {
            if !field_names.contains(name) {
                return Err(ConfigError::InvalidPrimaryKey {
                    model: model.name.clone(),
                    field: name.to_string(),
                });
            }
        }
    }
    Ok(())
}
