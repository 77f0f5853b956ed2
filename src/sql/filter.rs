//! WHERE predicates over quoted, table-qualified columns.

use super::builder::{quoted, QueryBuf};
use super::params::BindValue;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq { column: String, value: BindValue },
    In { column: String, values: Vec<BindValue> },
}

/// Equality and membership clauses joined with AND, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: BindValue) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.into(),
            value,
        });
        self
    }

    pub fn is_in(mut self, column: impl Into<String>, values: Vec<BindValue>) -> Self {
        self.conditions.push(Condition::In {
            column: column.into(),
            values,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Appends ` WHERE ...` to the query, numbering parameters after those already bound.
    pub(crate) fn push_where(&self, table: &str, q: &mut QueryBuf) {
        if self.conditions.is_empty() {
            return;
        }
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for c in &self.conditions {
            match c {
                Condition::Eq { column, value } => {
                    let n = q.push_param(value.clone());
                    clauses.push(format!("{}.{} = ${}", quoted(table), quoted(column), n));
                }
                Condition::In { column, values } => {
                    if values.is_empty() {
                        clauses.push("1 = 0".to_string());
                        continue;
                    }
                    let placeholders: Vec<String> = values
                        .iter()
                        .map(|v| format!("${}", q.push_param(v.clone())))
                        .collect();
                    clauses.push(format!(
                        "{}.{} IN ({})",
                        quoted(table),
                        quoted(column),
                        placeholders.join(", ")
                    ));
                }
            }
        }
        q.sql.push_str(" WHERE ");
        q.sql.push_str(&clauses.join(" AND "));
    }

    /// Predicate text and bound values on their own, e.g. `"users"."id" = $1`.
    pub fn to_sql(&self, table: &str) -> (String, Vec<BindValue>) {
        let mut q = QueryBuf::default();
        self.push_where(table, &mut q);
        let sql = q.sql.strip_prefix(" WHERE ").unwrap_or("").to_string();
        (sql, q.params)
    }
}
