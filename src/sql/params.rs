//! Typed bind values that sqlx can encode for PostgreSQL and SQLite.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::sqlite::{Sqlite, SqliteTypeInfo};
use sqlx::{Database, Type};

/// Column type, also used to type NULL parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    BigInt,
    Double,
    Text,
    Uuid,
    Timestamp,
    Json,
}

impl SqlType {
    fn pg_type_info(self) -> PgTypeInfo {
        match self {
            SqlType::Bool => <bool as Type<Postgres>>::type_info(),
            SqlType::BigInt => <i64 as Type<Postgres>>::type_info(),
            SqlType::Double => <f64 as Type<Postgres>>::type_info(),
            SqlType::Text => <String as Type<Postgres>>::type_info(),
            SqlType::Uuid => <uuid::Uuid as Type<Postgres>>::type_info(),
            SqlType::Timestamp => <DateTime<Utc> as Type<Postgres>>::type_info(),
            SqlType::Json => <Value as Type<Postgres>>::type_info(),
        }
    }
}

/// A value bound to a query parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null(SqlType),
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Time(DateTime<Utc>),
    Json(Value),
}

impl BindValue {
    pub fn sql_type(&self) -> SqlType {
        match self {
            BindValue::Null(t) => *t,
            BindValue::Bool(_) => SqlType::Bool,
            BindValue::I64(_) => SqlType::BigInt,
            BindValue::F64(_) => SqlType::Double,
            BindValue::String(_) => SqlType::Text,
            BindValue::Uuid(_) => SqlType::Uuid,
            BindValue::Time(_) => SqlType::Timestamp,
            BindValue::Json(_) => SqlType::Json,
        }
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            BindValue::Null(_) => <Option<i64> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            BindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            BindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            BindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            BindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            BindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            BindValue::Time(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf)?,
            BindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.sql_type().pg_type_info())
    }
}

impl Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}

impl<'q> Encode<'q, Sqlite> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            BindValue::Null(_) => <Option<i64> as Encode<Sqlite>>::encode_by_ref(&None, buf)?,
            BindValue::Bool(b) => <bool as Encode<Sqlite>>::encode_by_ref(b, buf)?,
            BindValue::I64(n) => <i64 as Encode<Sqlite>>::encode_by_ref(n, buf)?,
            BindValue::F64(n) => <f64 as Encode<Sqlite>>::encode_by_ref(n, buf)?,
            BindValue::String(s) => <String as Encode<Sqlite>>::encode_by_ref(s, buf)?,
            BindValue::Uuid(u) => {
                <String as Encode<Sqlite>>::encode_by_ref(&u.hyphenated().to_string(), buf)?
            }
            BindValue::Time(t) => {
                <String as Encode<Sqlite>>::encode_by_ref(&crate::codec::format_time(t), buf)?
            }
            BindValue::Json(v) => <String as Encode<Sqlite>>::encode_by_ref(&v.to_string(), buf)?,
        })
    }

    fn produces(&self) -> Option<SqliteTypeInfo> {
        Some(match self {
            BindValue::Null(_) => <i64 as Type<Sqlite>>::type_info(),
            BindValue::Bool(_) => <bool as Type<Sqlite>>::type_info(),
            BindValue::I64(_) => <i64 as Type<Sqlite>>::type_info(),
            BindValue::F64(_) => <f64 as Type<Sqlite>>::type_info(),
            _ => <String as Type<Sqlite>>::type_info(),
        })
    }
}

impl Type<Sqlite> for BindValue {
    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}
