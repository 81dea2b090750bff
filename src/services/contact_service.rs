use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::contact::{ContactRequest, MessageList},
    entity::contact_messages::{
        ActiveModel as MessageActive, Column as MessageCol, Entity as Messages,
        Model as MessageModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::ContactMessage,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn submit_message(
    state: &AppState,
    payload: ContactRequest,
) -> AppResult<ApiResponse<ContactMessage>> {
    let email = non_blank(payload.email)
        .map(|e| e.to_lowercase())
        .ok_or_else(|| AppError::BadRequest("email is required".into()))?;
    let message = non_blank(payload.message)
        .ok_or_else(|| AppError::BadRequest("message is required".into()))?;

    let now = Utc::now().fixed_offset();
    let model = MessageActive {
        id: Set(Uuid::new_v4()),
        name: Set(non_blank(payload.name)),
        email: Set(email),
        subject: Set(non_blank(payload.subject)),
        message: Set(message),
        read: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    let saved = message_from_entity(model);
    tracing::info!(message_id = %saved.id, "contact message received");

    if let Err(err) = state.notifier.contact_received(&saved).await {
        tracing::warn!(message_id = %saved.id, error = %err, "contact notification failed");
    }

    Ok(ApiResponse::success(
        "Message received",
        saved,
        Some(Meta::empty()),
    ))
}

pub async fn list_messages(
    state: &AppState,
    query: Pagination,
) -> AppResult<ApiResponse<MessageList>> {
    let (page, limit, offset) = query.normalize();

    let finder = Messages::find()
        .order_by_desc(MessageCol::CreatedAt)
        .order_by_desc(MessageCol::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(message_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Messages",
        MessageList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn mark_read(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<ContactMessage>> {
    let result = Messages::update_many()
        .col_expr(MessageCol::Read, Expr::value(true))
        .col_expr(MessageCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(MessageCol::Id.eq(id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let model = Messages::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    audit::record(
        &state.orm,
        Some(admin.email()),
        "message_mark_read",
        Some("contact_messages"),
        serde_json::json!({ "message_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Message marked as read",
        message_from_entity(model),
        Some(Meta::empty()),
    ))
}

pub async fn delete_message(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Messages::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(message_id = %id, admin = admin.email(), "contact message deleted");
    audit::record(
        &state.orm,
        Some(admin.email()),
        "message_delete",
        Some("contact_messages"),
        serde_json::json!({ "message_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Message deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn message_from_entity(model: MessageModel) -> ContactMessage {
    ContactMessage {
        id: model.id,
        name: model.name,
        email: model.email,
        subject: model.subject,
        message: model.message,
        read: model.read,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
