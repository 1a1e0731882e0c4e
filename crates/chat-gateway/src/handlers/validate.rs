use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use crate::models::validate::{ValidateReply, ValidateRequest};
use crate::security::ClientIdentity;
use crate::services::ValidateService;
use crate::utils::error::CodeCheckError;

/// POST /validateCode
pub async fn validate_handler(
    State(validate): State<Arc<ValidateService>>,
    client: ClientIdentity,
    body: Bytes,
) -> Result<Json<ValidateReply>, CodeCheckError> {
    let request = ValidateRequest::from_slice(&body);
    let reply = validate.validate(&request, &client)?;

    Ok(Json(reply))
}
