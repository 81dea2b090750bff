use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    dto::contact::ContactRequest,
    error::{AppError, AppResult},
    models::ContactMessage,
    response::ApiResponse,
    services::contact_service,
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message stored", body = ApiResponse<ContactMessage>),
        (status = 400, description = "Email and message are required"),
    ),
    tag = "Contact"
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<ContactMessage>>)> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let resp = contact_service::submit_message(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
