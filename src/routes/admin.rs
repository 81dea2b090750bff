use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        contact::MessageList,
    },
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::ContactMessage,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::contact_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/messages", get(list_messages))
        .route("/messages/{id}/read", patch(mark_message_read))
        .route("/messages/{id}", delete(delete_message))
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Admin token issued", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Admin"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let email = payload.email.clone();
    let resp = state.gate.login(payload).inspect_err(|err| {
        if matches!(err, AppError::InvalidCredentials) {
            tracing::warn!(email = %email, "admin login rejected");
        }
    })?;
    tracing::info!(email = %email, "admin logged in");
    Ok(Json(ApiResponse::success(
        "Login successful",
        resp,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/messages",
    params(Pagination),
    responses(
        (status = 200, description = "Contact messages, newest first", body = ApiResponse<MessageList>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> AppResult<Json<ApiResponse<MessageList>>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let resp = contact_service::list_messages(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/messages/{id}/read",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message marked as read", body = ApiResponse<ContactMessage>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn mark_message_read(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ContactMessage>>> {
    let resp = contact_service::mark_read(&state, &admin, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_message(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = contact_service::delete_message(&state, &admin, id).await?;
    Ok(Json(resp))
}
