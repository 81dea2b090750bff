use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderCreated, OrderList, UpdateOrderStatusRequest,
        UpdatePaymentStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/admin", get(list_orders))
        .route("/{id}", get(get_order).delete(delete_order))
        .route(
            "/{id}/status",
            patch(update_order_status).put(update_order_status),
        )
        .route("/{id}/payment", patch(update_payment_status))
}

/// Non-UUID ids can never match a stored order.
fn parse_order_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Client token that dedupes retried submissions")
    ),
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderCreated>),
        (status = 200, description = "Earlier order returned for a repeated idempotency key", body = ApiResponse<OrderCreated>),
        (status = 400, description = "Invalid order"),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderCreated>>)> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidOrder(e.body_text()))?;
    let key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            AppError::BadRequest("Idempotency-Key must be visible ASCII".into())
        })?),
        None => None,
    };

    let outcome = order_service::create_order(&state, payload, key).await?;
    let (status, message) = if outcome.replayed {
        (StatusCode::OK, "Order already submitted")
    } else {
        (StatusCode::CREATED, "Order created")
    };
    let data = OrderCreated {
        id: outcome.order.id,
        status: outcome.order.status,
        amounts: outcome.order.amounts,
    };

    Ok((
        status,
        Json(ApiResponse::success(message, data, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "List orders (admin only)", body = ApiResponse<OrderList>),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<OrderListQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let resp = order_service::list_orders(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with normalized amounts", body = ApiResponse<Order>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let id = parse_order_id(&id)?;
    let resp = order_service::get_order(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Update order status", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidStatus(e.body_text()))?;
    let id = parse_order_id(&id)?;
    let resp = order_service::update_order_status(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Update payment status", body = ApiResponse<Order>),
        (status = 400, description = "Invalid payment status"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePaymentStatusRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidStatus(e.body_text()))?;
    let id = parse_order_id(&id)?;
    let resp = order_service::update_payment_status(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let id = parse_order_id(&id)?;
    let resp = order_service::delete_order(&state, &admin, id).await?;
    Ok(Json(resp))
}
