//! Response envelopes for resource payloads: `{"data": ..., "meta": {"resource": ...}}`.

use crate::model::Record;
use crate::resource::Resource;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub meta: ResourceMeta,
}

#[derive(Serialize)]
pub struct ResourceMeta {
    /// Human label of the resource, e.g. `Credit Card`.
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

type Reply<T> = (StatusCode, Json<Envelope<T>>);

fn reply<T: Serialize>(status: StatusCode, res: &Resource, data: T, count: Option<u64>) -> Reply<T> {
    let meta = ResourceMeta {
        resource: res.name.clone(),
        count,
    };
    (status, Json(Envelope { data, meta }))
}

/// 201 with the saved record.
pub fn created(res: &Resource, record: Record) -> Reply<Record> {
    reply(StatusCode::CREATED, res, record, None)
}

pub fn one(res: &Resource, record: Record) -> Reply<Record> {
    reply(StatusCode::OK, res, record, None)
}

pub fn many(res: &Resource, records: Vec<Record>) -> Reply<Vec<Record>> {
    let count = records.len() as u64;
    reply(StatusCode::OK, res, records, Some(count))
}

/// Answer to a count-only listing.
pub fn count(res: &Resource, n: i64) -> Reply<serde_json::Value> {
    let n = n.max(0) as u64;
    reply(StatusCode::OK, res, json!({ "count": n }), Some(n))
}
