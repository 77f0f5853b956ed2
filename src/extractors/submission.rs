//! Extract submitted meta values from a form or JSON body.

use crate::error::AppError;
use crate::resource::MetaValues;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde_json::Value;

/// Submitted values. Form keys carry the configured prefix (`QorResource.Name`); JSON bodies
/// are objects keyed by meta name.
#[derive(Clone, Debug, Default)]
pub struct Submission(pub MetaValues);

#[async_trait]
impl FromRequest<AppState> for Submission {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);
        if is_json {
            let Json(body) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !body.is_object() {
                return Err(AppError::BadRequest("body must be a JSON object".into()));
            }
            return Ok(Submission(MetaValues::from_json(&body)));
        }
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(Submission(MetaValues::from_form(
            &state.admin.config().form_prefix,
            &pairs,
        )))
    }
}
