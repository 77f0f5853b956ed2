//! Builds a `Schema` from a `ModelDef`: tags, kinds, primary keys and relationship guessing.

use super::{Field, FieldKind, JoinTable, Registry, Relationship, RelationshipKind, Schema};
use crate::case::{plural_snake, to_db_name};
use crate::config::{FieldDef, ModelDef};
use crate::error::SchemaError;
use std::collections::HashMap;

/// Tag settings keyed by upper-case name with underscores removed (`primary_key` -> `PRIMARYKEY`).
pub(crate) fn parse_tags(tag: &str) -> HashMap<String, String> {
    let mut settings = HashMap::new();
    for part in tag.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = match part.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (part, ""),
        };
        let key = key.to_ascii_uppercase().replace('_', "");
        let key = match key.as_str() {
            "ASSOCIATIONFOREIGNKEY" => "REFERENCES".to_string(),
            "ASSOCIATIONJOINTABLEFOREIGNKEY" => "JOINREFERENCES".to_string(),
            "JOINTABLEFOREIGNKEY" => "JOINFOREIGNKEY".to_string(),
            _ => key,
        };
        settings.insert(key, value.to_string());
    }
    settings
}

pub(crate) fn parse_kind(ty: &str, registry: &Registry) -> Option<FieldKind> {
    let ty = ty.trim();
    if let Some(inner) = ty.strip_prefix('*') {
        return parse_kind(inner, registry).map(|k| FieldKind::Pointer(Box::new(k)));
    }
    if let Some(inner) = ty.strip_prefix("[]") {
        return parse_kind(inner, registry).map(|k| FieldKind::Slice(Box::new(k)));
    }
    Some(match ty {
        "string" => FieldKind::String,
        "int" | "int8" | "int16" | "int32" | "int64" => FieldKind::Int,
        "uint" | "uint8" | "uint16" | "uint32" | "uint64" => FieldKind::Uint,
        "float32" | "float64" => FieldKind::Float,
        "bool" => FieldKind::Bool,
        "time.Time" | "time" => FieldKind::Time,
        "uuid" | "uuid.UUID" => FieldKind::Uuid,
        other if registry.scanner(other).is_some() => FieldKind::Scanner(other.to_string()),
        other if registry.definition(other).is_some() => FieldKind::Struct(other.to_string()),
        _ => return None,
    })
}

fn column_name(def: &FieldDef) -> String {
    let tags = parse_tags(&def.tag);
    match tags.get("COLUMN") {
        Some(c) if !c.is_empty() => c.clone(),
        _ => to_db_name(&def.name),
    }
}

/// Primary field names in key order: explicit model keys, then tagged fields, else `ID`.
pub(crate) fn primary_names(def: &ModelDef) -> Vec<String> {
    let mut names: Vec<String> = def
        .primary_key
        .as_ref()
        .map(|pk| pk.names().into_iter().map(str::to_string).collect())
        .unwrap_or_default();
    for f in &def.fields {
        if parse_tags(&f.tag).contains_key("PRIMARYKEY") && !names.contains(&f.name) {
            names.push(f.name.clone());
        }
    }
    if names.is_empty() && def.fields.iter().any(|f| f.name == "ID") {
        names.push("ID".to_string());
    }
    names
}

/// The primary field whose column is `id`, else the first primary field.
pub(crate) fn prioritized_name(def: &ModelDef) -> Option<String> {
    let names = primary_names(def);
    names
        .iter()
        .find(|n| {
            def.fields
                .iter()
                .any(|f| &f.name == *n && column_name(f) == "id")
        })
        .or_else(|| names.first())
        .cloned()
}

fn has_field(def: &ModelDef, name: &str) -> bool {
    def.fields.iter().any(|f| f.name == name)
}

pub(crate) fn parse_schema(def: &ModelDef, registry: &Registry) -> Result<Schema, SchemaError> {
    let pk_names = primary_names(def);
    let prioritized = prioritized_name(def).ok_or_else(|| SchemaError::NoPrimaryKey {
        model: def.name.clone(),
    })?;
    let single_key = pk_names.len() == 1;

    let mut fields = Vec::with_capacity(def.fields.len());
    for fd in &def.fields {
        let tags = parse_tags(&fd.tag);
        let kind = parse_kind(&fd.ty, registry).ok_or_else(|| SchemaError::UnknownType {
            model: def.name.clone(),
            field: fd.name.clone(),
            ty: fd.ty.clone(),
        })?;
        let ignored = fd.tag.trim() == "-";
        let relationship = if ignored {
            None
        } else {
            guess_relationship(def, fd, &kind, &tags, registry)?
        };
        let primary_key = pk_names.contains(&fd.name);
        let integer = matches!(kind.indirect(), FieldKind::Int | FieldKind::Uint);
        let auto_increment = primary_key
            && single_key
            && integer
            && tags
                .get("AUTOINCREMENT")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        let db_name = if ignored || relationship.is_some() {
            String::new()
        } else {
            column_name(fd)
        };
        fields.push(Field {
            name: fd.name.clone(),
            db_name,
            kind,
            primary_key,
            auto_increment,
            tags,
            valid: fd.valid.clone(),
            relationship,
        });
    }

    let by_name: HashMap<String, usize> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();
    let mut primary = Vec::with_capacity(pk_names.len());
    for name in &pk_names {
        match by_name.get(name) {
            Some(&i) if fields[i].is_column() => primary.push(i),
            _ => {
                return Err(SchemaError::NoPrimaryKey {
                    model: def.name.clone(),
                })
            }
        }
    }
    let prioritized = by_name[&prioritized];

    Ok(Schema {
        name: def.name.clone(),
        table: def.table.clone().unwrap_or_else(|| plural_snake(&def.name)),
        fields,
        by_name,
        primary,
        prioritized,
    })
}

fn invalid(def: &ModelDef, fd: &FieldDef, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidRelationship {
        model: def.name.clone(),
        field: fd.name.clone(),
        reason: reason.into(),
    }
}

fn guess_relationship(
    def: &ModelDef,
    fd: &FieldDef,
    kind: &FieldKind,
    tags: &HashMap<String, String>,
    registry: &Registry,
) -> Result<Option<Relationship>, SchemaError> {
    let is_slice = matches!(kind.indirect(), FieldKind::Slice(_));
    let Some(target_name) = kind.model_name() else {
        return Ok(None);
    };
    let target = registry
        .definition(target_name)
        .ok_or_else(|| SchemaError::UnknownModel(target_name.to_string()))?;
    let owner_pk = prioritized_name(def).ok_or_else(|| SchemaError::NoPrimaryKey {
        model: def.name.clone(),
    })?;
    let target_pk = prioritized_name(&target).ok_or_else(|| SchemaError::NoPrimaryKey {
        model: target.name.clone(),
    })?;
    let explicit_fk = tags.get("FOREIGNKEY").filter(|v| !v.is_empty()).cloned();
    let explicit_ref = tags.get("REFERENCES").filter(|v| !v.is_empty()).cloned();

    if is_slice {
        if let Some(join) = tags.get("MANY2MANY").filter(|v| !v.is_empty()) {
            let owner_key = explicit_fk.unwrap_or_else(|| owner_pk.clone());
            let target_key = explicit_ref.unwrap_or_else(|| target_pk.clone());
            let join_fk = tags
                .get("JOINFOREIGNKEY")
                .filter(|v| !v.is_empty())
                .map(|v| to_db_name(v))
                .unwrap_or_else(|| to_db_name(&format!("{}{}", def.name, owner_key)));
            let join_ref = tags
                .get("JOINREFERENCES")
                .filter(|v| !v.is_empty())
                .map(|v| to_db_name(v))
                .unwrap_or_else(|| to_db_name(&format!("{}{}", target.name, target_key)));
            return Ok(Some(Relationship {
                kind: RelationshipKind::Many2Many,
                model: target.name.clone(),
                foreign_key: owner_key,
                association_key: target_key,
                join_table: Some(JoinTable {
                    table: join.clone(),
                    foreign_key: join_fk,
                    association_foreign_key: join_ref,
                }),
            }));
        }
        let fk = explicit_fk.unwrap_or_else(|| format!("{}{}", def.name, owner_pk));
        if !has_field(&target, &fk) {
            return Err(invalid(def, fd, format!("{} has no foreign key {}", target.name, fk)));
        }
        return Ok(Some(Relationship {
            kind: RelationshipKind::HasMany,
            model: target.name.clone(),
            foreign_key: fk,
            association_key: explicit_ref.unwrap_or(owner_pk),
            join_table: None,
        }));
    }

    let has_one_fk = explicit_fk
        .clone()
        .unwrap_or_else(|| format!("{}{}", def.name, owner_pk));
    let belongs_fk = explicit_fk.unwrap_or_else(|| format!("{}{}", fd.name, target_pk));

    if has_field(def, &belongs_fk) && (tags.contains_key("FOREIGNKEY") || !has_field(&target, &has_one_fk)) {
        return Ok(Some(Relationship {
            kind: RelationshipKind::BelongsTo,
            model: target.name.clone(),
            foreign_key: belongs_fk,
            association_key: explicit_ref.unwrap_or(target_pk),
            join_table: None,
        }));
    }
    if has_field(&target, &has_one_fk) {
        return Ok(Some(Relationship {
            kind: RelationshipKind::HasOne,
            model: target.name.clone(),
            foreign_key: has_one_fk,
            association_key: explicit_ref.unwrap_or(owner_pk),
            join_table: None,
        }));
    }
    Err(invalid(
        def,
        fd,
        format!("no foreign key linking {} and {}", def.name, target.name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldDef;

    fn registry() -> Registry {
        let registry = Registry::new();
        registry
            .register(ModelDef::new("CreditCard").with_id_and_timestamps().field(FieldDef::new("Number", "string")))
            .unwrap();
        registry
            .register(ModelDef::new("Company").with_id_and_timestamps().field(FieldDef::new("Name", "string")))
            .unwrap();
        registry
            .register(
                ModelDef::new("Address")
                    .with_id_and_timestamps()
                    .field(FieldDef::new("UserID", "uint"))
                    .field(FieldDef::new("Address1", "string")),
            )
            .unwrap();
        registry
            .register(ModelDef::new("Language").with_id_and_timestamps().field(FieldDef::new("Name", "string")))
            .unwrap();
        registry
            .register(
                ModelDef::new("Profile")
                    .with_id_and_timestamps()
                    .field(FieldDef::new("UserID", "uint"))
                    .field(FieldDef::new("Name", "string")),
            )
            .unwrap();
        registry
            .register(
                ModelDef::new("User")
                    .with_id_and_timestamps()
                    .field(FieldDef::new("Name", "string"))
                    .field(FieldDef::new("Profile", "Profile"))
                    .field(FieldDef::new("CreditCardID", "uint"))
                    .field(FieldDef::new("CreditCard", "CreditCard"))
                    .field(FieldDef::new("Addresses", "[]Address"))
                    .field(FieldDef::new("CompanyID", "uint"))
                    .field(FieldDef::new("Company", "*Company"))
                    .field(FieldDef::new("Languages", "[]Language").tag("many2many:user_languages"))
                    .field(FieldDef::new("Secret", "string").tag("-")),
            )
            .unwrap();
        registry
    }

    #[test]
    fn tags_are_normalized() {
        let tags = parse_tags("column:full_name; PRIMARY_KEY ;foreignKey:OwnerID");
        assert_eq!(tags.get("COLUMN").map(String::as_str), Some("full_name"));
        assert!(tags.contains_key("PRIMARYKEY"));
        assert_eq!(tags.get("FOREIGNKEY").map(String::as_str), Some("OwnerID"));
    }

    #[test]
    fn guesses_relationships() {
        let registry = registry();
        let user = registry.parse("User").unwrap();
        assert_eq!(user.table, "users");
        assert_eq!(user.prioritized_primary_field().name, "ID");
        assert!(user.prioritized_primary_field().auto_increment);

        let profile = user.relationship("Profile").unwrap();
        assert_eq!(profile.kind, RelationshipKind::HasOne);
        assert_eq!(profile.foreign_key, "UserID");

        let card = user.relationship("CreditCard").unwrap();
        assert_eq!(card.kind, RelationshipKind::BelongsTo);
        assert_eq!(card.foreign_key, "CreditCardID");

        assert_eq!(user.relationship("Company").unwrap().kind, RelationshipKind::BelongsTo);
        assert_eq!(user.relationship("Addresses").unwrap().kind, RelationshipKind::HasMany);

        let languages = user.relationship("Languages").unwrap();
        assert_eq!(languages.kind, RelationshipKind::Many2Many);
        let join = languages.join_table.as_ref().unwrap();
        assert_eq!(join.table, "user_languages");
        assert_eq!(join.foreign_key, "user_id");
        assert_eq!(join.association_foreign_key, "language_id");

        assert_eq!(user.field("CreditCardID").unwrap().db_name, "credit_card_id");
        assert!(!user.field("Secret").unwrap().is_column());
        assert!(user.columns().all(|f| f.relationship.is_none()));
    }

    #[test]
    fn composite_keys_keep_declared_order() {
        let registry = Registry::new();
        registry
            .register(
                ModelDef::new("Membership")
                    .primary_key(&["GroupCode", "MemberCode"])
                    .field(FieldDef::new("MemberCode", "string"))
                    .field(FieldDef::new("GroupCode", "string")),
            )
            .unwrap();
        let schema = registry.parse("Membership").unwrap();
        let names: Vec<&str> = schema.primary_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["GroupCode", "MemberCode"]);
        assert_eq!(schema.prioritized_primary_field().name, "GroupCode");
        assert!(!schema.prioritized_primary_field().auto_increment);
    }

    #[test]
    fn missing_primary_key_and_unknown_types_fail() {
        let registry = Registry::new();
        registry
            .register(ModelDef::new("Note").field(FieldDef::new("Body", "string")))
            .unwrap();
        assert!(matches!(registry.parse("Note"), Err(SchemaError::NoPrimaryKey { .. })));

        registry
            .register(ModelDef::new("Thing").field(FieldDef::new("ID", "uint")).field(FieldDef::new("Shape", "Polygon")))
            .unwrap();
        assert!(matches!(registry.parse("Thing"), Err(SchemaError::UnknownType { .. })));
        assert!(matches!(registry.parse("Nope"), Err(SchemaError::UnknownModel(_))));
    }
}
