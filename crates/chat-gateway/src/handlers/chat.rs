use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::models::chat::{ChatReply, ChatRequest};
use crate::security::ClientIdentity;
use crate::services::ChatService;
use crate::utils::error::ApiError;

pub const ACCESS_CODE_HEADER: &str = "x-access-code";

/// POST /chat
pub async fn chat_handler(
    State(chat): State<Arc<ChatService>>,
    client: ClientIdentity,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let access_code = headers
        .get(ACCESS_CODE_HEADER)
        .and_then(|v| v.to_str().ok());

    let request = ChatRequest::from_slice(&body);
    let reply = chat.handle(request, access_code, &client).await?;

    Ok(Json(reply))
}
