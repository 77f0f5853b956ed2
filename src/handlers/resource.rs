//! Resource CRUD handlers: list, create, read, update, delete.

use crate::context::Context;
use crate::error::AppError;
use crate::extractors::{CurrentRoles, Submission};
use crate::resource::{Decoded, FindMany, FindOne, Resource};
use crate::response;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

fn resource_by_path(state: &AppState, segment: &str) -> Result<Arc<Resource>, AppError> {
    state
        .admin
        .get_resource(segment)
        .ok_or_else(|| AppError::BadRequest(format!("unknown resource '{}'", segment)))
}

fn context(state: &AppState, roles: CurrentRoles) -> Context {
    state.admin.new_context().with_roles(roles.0)
}

fn fail_on_errors(ctx: &mut Context) -> Result<(), AppError> {
    if ctx.has_error() {
        return Err(AppError::Validation(ctx.take_errors()));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    roles: CurrentRoles,
) -> Result<Response, AppError> {
    let res = resource_by_path(&state, &segment)?;
    let mut ctx = context(&state, roles);
    ctx.count_only = matches!(params.get("count").map(String::as_str), Some("1" | "true"));
    match res.call_find_many(&mut ctx).await? {
        FindMany::Records(records) => Ok(response::many(&res, records).into_response()),
        FindMany::Count(n) => Ok(response::count(&res, n).into_response()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    roles: CurrentRoles,
    Submission(values): Submission,
) -> Result<Response, AppError> {
    let res = resource_by_path(&state, &segment)?;
    let mut ctx = context(&state, roles);
    let mut record = res.new_record();
    let decoded = res.decode(&mut ctx, &mut record, &values).await?;
    fail_on_errors(&mut ctx)?;
    if decoded == Decoded::Skipped {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    res.call_save(&mut record, &mut ctx).await?;
    tracing::info!(resource = %res.name, id = %res.schema().primary_value(&record), "created");
    Ok(response::created(&res, record).into_response())
}

pub async fn read(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    roles: CurrentRoles,
) -> Result<Response, AppError> {
    let res = resource_by_path(&state, &segment)?;
    let mut ctx = context(&state, roles).with_resource_id(id);
    let mut record = res.new_record();
    match res.call_find_one(&mut record, None, &mut ctx).await? {
        FindOne::Found => Ok(response::one(&res, record).into_response()),
        FindOne::Destroyed => Err(AppError::RecordNotFound),
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    roles: CurrentRoles,
    Submission(values): Submission,
) -> Result<Response, AppError> {
    let res = resource_by_path(&state, &segment)?;
    let mut ctx = context(&state, roles).with_resource_id(id);
    let mut record = res.new_record();
    res.call_find_one(&mut record, None, &mut ctx).await?;
    let decoded = res.decode(&mut ctx, &mut record, &values).await?;
    fail_on_errors(&mut ctx)?;
    if decoded == Decoded::Skipped {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    res.call_save(&mut record, &mut ctx).await?;
    tracing::info!(resource = %res.name, id = %ctx.resource_id, "updated");
    Ok(response::one(&res, record).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    roles: CurrentRoles,
) -> Result<Response, AppError> {
    let res = resource_by_path(&state, &segment)?;
    let mut ctx = context(&state, roles).with_resource_id(id);
    let mut record = res.new_record();
    res.call_delete(&mut record, &mut ctx).await?;
    tracing::info!(resource = %res.name, id = %ctx.resource_id, "deleted");
    Ok(response::one(&res, record).into_response())
}
