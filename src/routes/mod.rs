use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::{get, post},
};

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod admin;
pub mod contact;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/contact", post(contact::submit_contact))
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
}

/// Full application router with state bound. Tower layers are added by
/// the server binary.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
