//! Create tables for registered models, plus many-to-many join tables.

use crate::error::AppError;
use crate::schema::{Field, Registry, RelationshipKind, Schema};
use crate::sql::{quoted, SqlType};
use crate::store::{Dialect, Store};

fn type_str(ty: SqlType, dialect: Dialect) -> &'static str {
    match (dialect, ty) {
        (Dialect::Postgres, SqlType::Bool) => "BOOLEAN",
        (Dialect::Postgres, SqlType::BigInt) => "BIGINT",
        (Dialect::Postgres, SqlType::Double) => "DOUBLE PRECISION",
        (Dialect::Postgres, SqlType::Text) => "TEXT",
        (Dialect::Postgres, SqlType::Uuid) => "UUID",
        (Dialect::Postgres, SqlType::Timestamp) => "TIMESTAMPTZ",
        (Dialect::Postgres, SqlType::Json) => "JSONB",
        (Dialect::Sqlite, SqlType::Bool) => "BOOLEAN",
        (Dialect::Sqlite, SqlType::BigInt) => "BIGINT",
        (Dialect::Sqlite, SqlType::Double) => "REAL",
        (Dialect::Sqlite, _) => "TEXT",
    }
}

fn column_def(field: &Field, dialect: Dialect) -> String {
    if field.auto_increment {
        return match dialect {
            Dialect::Postgres => format!("{} BIGSERIAL PRIMARY KEY", quoted(&field.db_name)),
            Dialect::Sqlite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quoted(&field.db_name)),
        };
    }
    let mut def = format!("{} {}", quoted(&field.db_name), type_str(field.sql_type(), dialect));
    if field.primary_key {
        def.push_str(" NOT NULL");
    }
    def
}

pub fn create_table_sql(schema: &Schema, dialect: Dialect) -> String {
    let mut defs: Vec<String> = schema.columns().map(|f| column_def(f, dialect)).collect();
    let primary = schema.primary_fields();
    if !primary.iter().any(|f| f.auto_increment) {
        let cols: Vec<String> = primary.iter().map(|f| quoted(&f.db_name)).collect();
        defs.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quoted(&schema.table),
        defs.join(", ")
    )
}

/// Join table DDL for each many-to-many field of `schema`.
pub fn join_table_sql(
    schema: &Schema,
    registry: &Registry,
    dialect: Dialect,
) -> Result<Vec<String>, AppError> {
    let mut statements = Vec::new();
    for field in &schema.fields {
        let Some(rel) = &field.relationship else { continue };
        if rel.kind != RelationshipKind::Many2Many {
            continue;
        }
        let Some(join) = &rel.join_table else { continue };
        let target = registry.parse(&rel.model)?;
        let owner_type = schema
            .field(&rel.foreign_key)
            .map(Field::sql_type)
            .unwrap_or(SqlType::BigInt);
        let target_type = target
            .field(&rel.association_key)
            .map(Field::sql_type)
            .unwrap_or(SqlType::BigInt);
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {} ({} {} NOT NULL, {} {} NOT NULL, PRIMARY KEY ({}, {}))",
            quoted(&join.table),
            quoted(&join.foreign_key),
            type_str(owner_type, dialect),
            quoted(&join.association_foreign_key),
            type_str(target_type, dialect),
            quoted(&join.foreign_key),
            quoted(&join.association_foreign_key),
        ));
    }
    Ok(statements)
}

/// Creates missing tables for the named models. Existing tables are left untouched.
pub async fn auto_migrate(
    store: &dyn Store,
    registry: &Registry,
    models: &[String],
) -> Result<(), AppError> {
    let dialect = store.dialect();
    for name in models {
        let schema = registry.parse(name)?;
        store.execute_raw(&create_table_sql(&schema, dialect)).await?;
        for sql in join_table_sql(&schema, registry, dialect)? {
            store.execute_raw(&sql).await?;
        }
        tracing::info!(model = %name, table = %schema.table, "migrated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldDef, ModelDef};

    #[test]
    fn table_ddl_per_dialect() {
        let registry = Registry::new();
        registry
            .register(ModelDef::new("Language").with_id_and_timestamps().field(FieldDef::new("Name", "string")))
            .unwrap();
        registry
            .register(
                ModelDef::new("User")
                    .with_id_and_timestamps()
                    .field(FieldDef::new("Active", "bool"))
                    .field(FieldDef::new("Languages", "[]Language").tag("many2many:user_languages")),
            )
            .unwrap();
        let user = registry.parse("User").unwrap();
        assert_eq!(
            create_table_sql(&user, Dialect::Postgres),
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" BIGSERIAL PRIMARY KEY, \"created_at\" TIMESTAMPTZ, \"updated_at\" TIMESTAMPTZ, \"active\" BOOLEAN)"
        );
        assert!(create_table_sql(&user, Dialect::Sqlite).contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        let joins = join_table_sql(&user, &registry, Dialect::Sqlite).unwrap();
        assert_eq!(
            joins,
            vec!["CREATE TABLE IF NOT EXISTS \"user_languages\" (\"user_id\" BIGINT NOT NULL, \"language_id\" BIGINT NOT NULL, PRIMARY KEY (\"user_id\", \"language_id\"))".to_string()]
        );
    }

    #[test]
    fn composite_keys_get_table_constraint() {
        let registry = Registry::new();
        registry
            .register(
                ModelDef::new("Membership")
                    .primary_key(&["GroupCode", "MemberCode"])
                    .field(FieldDef::new("GroupCode", "string"))
                    .field(FieldDef::new("MemberCode", "string")),
            )
            .unwrap();
        let schema = registry.parse("Membership").unwrap();
        assert!(create_table_sql(&schema, Dialect::Sqlite)
            .ends_with("PRIMARY KEY (\"group_code\", \"member_code\"))"));
    }
}
