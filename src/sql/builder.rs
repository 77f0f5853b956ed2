//! Builds parameterized SELECT, COUNT, INSERT, UPDATE and DELETE statements.

use super::filter::{Direction, Filter};
use super::params::BindValue;

/// Quote identifier (safe: only from model definitions).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    pub(crate) fn push_param(&mut self, v: BindValue) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

pub fn select(
    table: &str,
    columns: &[&str],
    filter: &Filter,
    order: Option<(&str, Direction)>,
    limit: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.sql = format!("SELECT {} FROM {}", column_list(columns), quoted(table));
    filter.push_where(table, &mut q);
    if let Some((column, direction)) = order {
        let dir = match direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        q.sql
            .push_str(&format!(" ORDER BY {}.{} {}", quoted(table), quoted(column), dir));
    }
    if let Some(n) = limit {
        q.sql.push_str(&format!(" LIMIT {}", n));
    }
    q
}

pub fn count(table: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.sql = format!("SELECT COUNT(*) AS \"count\" FROM {}", quoted(table));
    filter.push_where(table, &mut q);
    q
}

/// INSERT with RETURNING so generated keys come back in the same round trip.
pub fn insert(table: &str, values: Vec<(String, BindValue)>, returning: &[&str]) -> QueryBuf {
    let mut q = QueryBuf::default();
    if values.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES", quoted(table));
    } else {
        let cols: Vec<String> = values.iter().map(|(c, _)| quoted(c)).collect();
        let placeholders: Vec<String> = values
            .into_iter()
            .map(|(_, v)| format!("${}", q.push_param(v)))
            .collect();
        q.sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(table),
            cols.join(", "),
            placeholders.join(", ")
        );
    }
    if !returning.is_empty() {
        q.sql.push_str(&format!(" RETURNING {}", column_list(returning)));
    }
    q
}

pub fn update(table: &str, values: Vec<(String, BindValue)>, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::default();
    let sets: Vec<String> = values
        .into_iter()
        .map(|(c, v)| format!("{} = ${}", quoted(&c), q.push_param(v)))
        .collect();
    q.sql = format!("UPDATE {} SET {}", quoted(table), sets.join(", "));
    filter.push_where(table, &mut q);
    q
}

pub fn delete(table: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.sql = format!("DELETE FROM {}", quoted(table));
    filter.push_where(table, &mut q);
    q
}
