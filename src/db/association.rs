//! Loading and replacing related records through a field's relationship.

use super::Db;
use crate::error::{AppError, SchemaError};
use crate::model::{is_zero, Record};
use crate::schema::{JoinTable, Relationship, RelationshipKind, Schema};
use crate::sql::{self, BindValue, Direction, Filter};
use serde_json::Value;

impl Db {
    fn relationship<'s>(schema: &'s Schema, field: &str) -> Result<&'s Relationship, AppError> {
        schema.relationship(field).ok_or_else(|| {
            AppError::Schema(SchemaError::InvalidRelationship {
                model: schema.name.clone(),
                field: field.to_string(),
                reason: "not a relationship".into(),
            })
        })
    }

    fn join_table(rel: &Relationship) -> Result<&JoinTable, AppError> {
        rel.join_table.as_ref().ok_or_else(|| {
            AppError::Schema(SchemaError::InvalidRelationship {
                model: rel.model.clone(),
                field: rel.foreign_key.clone(),
                reason: "many2many without join table".into(),
            })
        })
    }

    /// Owner-side key bound with the owner's field type.
    fn owner_key(schema: &Schema, field: &str, record: &Record) -> Result<BindValue, AppError> {
        let key_field = schema.field(field).ok_or_else(|| {
            AppError::Schema(SchemaError::InvalidRelationship {
                model: schema.name.clone(),
                field: field.to_string(),
                reason: "key field missing".into(),
            })
        })?;
        Ok(key_field.bind_value(record.get(field).unwrap_or(&Value::Null))?)
    }

    /// Loads the related value of `field`: an object (or null) for belongs-to and has-one,
    /// a list for has-many and many-to-many.
    pub async fn find_association(&self, model: &str, record: &Record, field: &str) -> Result<Value, AppError> {
        let schema = self.schema(model)?;
        let rel = Self::relationship(&schema, field)?;
        let target = self.schema(&rel.model)?;
        match rel.kind {
            RelationshipKind::BelongsTo => {
                let fk = record.get(&rel.foreign_key).cloned().unwrap_or(Value::Null);
                if is_zero(&fk) {
                    return Ok(Value::Null);
                }
                let column = column_of(&target, &rel.association_key)?;
                let key = Self::owner_key(&schema, &rel.foreign_key, record)?;
                self.first_or_null(&rel.model, &Filter::new().eq(column, key)).await
            }
            RelationshipKind::HasOne => {
                let column = column_of(&target, &rel.foreign_key)?;
                let key = Self::owner_key(&schema, &rel.association_key, record)?;
                self.first_or_null(&rel.model, &Filter::new().eq(column, key)).await
            }
            RelationshipKind::HasMany => {
                let column = column_of(&target, &rel.foreign_key)?;
                let key = Self::owner_key(&schema, &rel.association_key, record)?;
                let order = target.prioritized_primary_field().db_name.clone();
                let rows = self
                    .find(&rel.model, &Filter::new().eq(column, key), Some((order.as_str(), Direction::Asc)))
                    .await?;
                Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
            }
            RelationshipKind::Many2Many => {
                let join = Self::join_table(rel)?;
                let owner = Self::owner_key(&schema, &rel.foreign_key, record)?;
                let q = sql::select(
                    &join.table,
                    &[join.association_foreign_key.as_str()],
                    &Filter::new().eq(join.foreign_key.clone(), owner),
                    None,
                    None,
                );
                let rows = self.store.fetch_all(&q).await?;
                let key_field = target.field(&rel.association_key).ok_or_else(|| {
                    AppError::Schema(SchemaError::NoPrimaryKey { model: target.name.clone() })
                })?;
                let keys = rows
                    .iter()
                    .filter_map(|r| r.get(&join.association_foreign_key))
                    .map(|v| key_field.bind_value(v))
                    .collect::<Result<Vec<_>, _>>()?;
                if keys.is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                let column = key_field.db_name.clone();
                let order = target.prioritized_primary_field().db_name.clone();
                let rows = self
                    .find(&rel.model, &Filter::new().is_in(column, keys), Some((order.as_str(), Direction::Asc)))
                    .await?;
                Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
            }
        }
    }

    async fn first_or_null(&self, model: &str, filter: &Filter) -> Result<Value, AppError> {
        match self.first(model, filter).await {
            Ok(found) => Ok(Value::Object(found)),
            Err(AppError::RecordNotFound) => Ok(Value::Null),
            Err(e) => Err(e),
        }
    }

    /// Replaces the whole many-to-many set of `field` with `targets`.
    pub async fn replace_association(
        &self,
        model: &str,
        record: &Record,
        field: &str,
        targets: &[Record],
    ) -> Result<(), AppError> {
        let schema = self.schema(model)?;
        let rel = Self::relationship(&schema, field)?;
        if rel.kind != RelationshipKind::Many2Many {
            return Err(AppError::BadRequest(format!(
                "{}.{}: only many2many associations can be replaced",
                model, field
            )));
        }
        let join = Self::join_table(rel)?;
        let owner = Self::owner_key(&schema, &rel.foreign_key, record)?;
        let q = sql::delete(&join.table, &Filter::new().eq(join.foreign_key.clone(), owner));
        self.store.execute(&q).await?;
        let owner_value = record.get(&rel.foreign_key).cloned().unwrap_or(Value::Null);
        for target in targets {
            self.link(&schema, field, &owner_value, target).await?;
        }
        Ok(())
    }

    /// Inserts the join row linking owner and target unless it already exists.
    pub(crate) async fn link(
        &self,
        schema: &Schema,
        field: &str,
        owner_value: &Value,
        target: &Record,
    ) -> Result<(), AppError> {
        let rel = Self::relationship(schema, field)?;
        let join = Self::join_table(rel)?;
        let target_schema = self.schema(&rel.model)?;
        let owner_field = schema.field(&rel.foreign_key).ok_or_else(|| {
            AppError::Schema(SchemaError::NoPrimaryKey { model: schema.name.clone() })
        })?;
        let target_field = target_schema.field(&rel.association_key).ok_or_else(|| {
            AppError::Schema(SchemaError::NoPrimaryKey { model: target_schema.name.clone() })
        })?;
        let owner = owner_field.bind_value(owner_value)?;
        let assoc = target_field.bind_value(target.get(&rel.association_key).unwrap_or(&Value::Null))?;
        let filter = Filter::new()
            .eq(join.foreign_key.clone(), owner.clone())
            .eq(join.association_foreign_key.clone(), assoc.clone());
        if self.store.fetch_count(&sql::count(&join.table, &filter)).await? > 0 {
            return Ok(());
        }
        let q = sql::insert(
            &join.table,
            vec![
                (join.foreign_key.clone(), owner),
                (join.association_foreign_key.clone(), assoc),
            ],
            &[],
        );
        self.store.execute(&q).await?;
        Ok(())
    }
}

fn column_of(schema: &Schema, field: &str) -> Result<String, AppError> {
    schema
        .field(field)
        .filter(|f| f.is_column())
        .map(|f| f.db_name.clone())
        .ok_or_else(|| {
            AppError::Schema(SchemaError::InvalidRelationship {
                model: schema.name.clone(),
                field: field.to_string(),
                reason: "not a column".into(),
            })
        })
}
