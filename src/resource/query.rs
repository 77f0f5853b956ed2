//! Primary-key predicates from identifier strings or submitted values.

use super::meta_values::MetaValues;
use super::Resource;
use crate::codec;
use crate::sql::Filter;
use serde_json::Value;

/// Predicate for a path identifier. With composite keys, `id` must carry exactly one
/// comma-separated value per primary field, in declared order.
pub fn primary_query(resource: &Resource, id: &str) -> Option<Filter> {
    if id.is_empty() {
        return None;
    }
    let fields = resource.primary_fields();
    if fields.len() == 1 {
        let field = resource.primary_field();
        let value = field.bind_value(&Value::String(id.to_string())).ok()?;
        return Some(Filter::new().eq(field.db_name.clone(), value));
    }
    let parts: Vec<&str> = id.split(',').collect();
    if parts.len() != fields.len() {
        return None;
    }
    let mut filter = Filter::new();
    for (field, part) in fields.iter().zip(parts) {
        let value = field.bind_value(&Value::String(part.to_string())).ok()?;
        filter = filter.eq(field.db_name.clone(), value);
    }
    Some(filter)
}

/// Predicate from the primary fields present among `meta_values`.
pub fn primary_query_from_metas(resource: &Resource, meta_values: &MetaValues) -> Option<Filter> {
    let mut filter = Filter::new();
    for field in resource.primary_fields() {
        let Some(mv) = meta_values.get(&field.name) else {
            continue;
        };
        let raw = codec::to_string(&mv.value);
        if raw.is_empty() {
            continue;
        }
        let value = field.bind_value(&Value::String(raw)).ok()?;
        filter = filter.eq(field.db_name.clone(), value);
    }
    (!filter.is_empty()).then_some(filter)
}
