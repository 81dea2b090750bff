use chrono::{Duration, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    amounts::{PriorAmounts, compute_amounts, stored_amounts},
    audit,
    dto::orders::{
        CreateOrderRequest, OrderList, UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
    },
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{Amounts, Customer, LineItem, Order, OrderStatus, Payment, PaymentStatus, Shipping},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Result of an order submission. `replayed` is set when an earlier order
/// with the same idempotency key was returned instead of inserting again.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub order: Order,
    pub replayed: bool,
}

/// A checkout payload that passed boundary validation.
struct NewOrder {
    customer: Customer,
    items: Vec<LineItem>,
    shipping: Shipping,
    payment_method: String,
    prior: Option<PriorAmounts>,
    status: OrderStatus,
    client_created_at: Option<chrono::DateTime<Utc>>,
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
    idempotency_key: Option<&str>,
) -> AppResult<CreateOutcome> {
    let idempotency_key = normalize_idempotency_key(idempotency_key)?;
    let new_order = validate_new_order(payload)?;

    if let Some(key) = idempotency_key.as_deref() {
        if let Some(existing) = find_recent_by_key(state, key).await? {
            tracing::info!(order_id = %existing.id, "idempotent replay of order submission");
            let order = load_normalized(state, existing).await?;
            return Ok(CreateOutcome {
                order,
                replayed: true,
            });
        }
    }

    let amounts = compute_amounts(&new_order.items, &new_order.shipping, new_order.prior.as_ref());
    let now = Utc::now().fixed_offset();

    let model = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(new_order.customer.name),
        customer_email: Set(new_order.customer.email),
        customer_phone: Set(new_order.customer.phone),
        address_line1: Set(new_order.customer.address_line1),
        address_line2: Set(new_order.customer.address_line2),
        city: Set(new_order.customer.city),
        country: Set(new_order.customer.country),
        postal_code: Set(new_order.customer.postal_code),
        items: Set(to_json(&new_order.items)?),
        shipping: Set(to_json(&new_order.shipping)?),
        payment_method: Set(new_order.payment_method),
        payment_status: Set(PaymentStatus::Unpaid.as_str().to_owned()),
        amounts: Set(Some(to_json(&amounts)?)),
        status: Set(new_order.status.as_str().to_owned()),
        idempotency_key: Set(idempotency_key),
        client_created_at: Set(new_order.client_created_at.map(|dt| dt.fixed_offset())),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let model = model.insert(&state.orm).await?;

    let order = order_from_entity(model)?.order;
    tracing::info!(
        order_id = %order.id,
        status = %order.status,
        total = %order.amounts.total,
        "order created"
    );

    Ok(CreateOutcome {
        order,
        replayed: false,
    })
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = find_order(state, id).await?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

/// Loads one order with its amounts normalized.
pub async fn find_order(state: &AppState, id: Uuid) -> AppResult<Order> {
    let model = Orders::find_by_id(id).one(&state.orm).await?;
    let model = match model {
        Some(m) => m,
        None => return Err(AppError::NotFound),
    };
    load_normalized(state, model).await
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status = parse_status(status)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        condition = condition.add(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(OrderCol::CustomerName)))
                        .like(LikeExpr::new(pattern.clone()).escape('!')),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col(OrderCol::CustomerEmail)))
                        .like(LikeExpr::new(pattern).escape('!')),
                ),
        );
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => finder
            .order_by_asc(OrderCol::CreatedAt)
            .order_by_asc(OrderCol::Id),
        SortOrder::Desc => finder
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut orders = Vec::with_capacity(models.len());
    for model in models {
        orders.push(load_normalized(state, model).await?);
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let next = parse_status(&payload.status)?;

    let mut update = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(next.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(OrderCol::Id.eq(id));

    if state.orders.lock_terminal_status {
        let current = Orders::find_by_id(id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let current_status = stored_status(&current)?;
        if !current_status.can_transition_to(next, true) {
            return Err(AppError::InvalidTransition {
                from: current_status,
                to: next,
            });
        }
        // Guard against a concurrent move into a terminal state.
        update = update.filter(OrderCol::Status.eq(current_status.as_str()));
    }

    let result = update.exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return match Orders::find_by_id(id).one(&state.orm).await? {
            None => Err(AppError::NotFound),
            Some(current) => Err(AppError::InvalidTransition {
                from: stored_status(&current)?,
                to: next,
            }),
        };
    }

    let order = find_order(state, id).await?;
    tracing::info!(order_id = %id, status = %order.status, admin = admin.email(), "order status updated");
    audit::record(
        &state.orm,
        Some(admin.email()),
        "order_status_update",
        Some("orders"),
        serde_json::json!({ "order_id": id, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn update_payment_status(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
    payload: UpdatePaymentStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let next: PaymentStatus = payload
        .status
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidStatus(payload.status.clone()))?;

    let result = Orders::update_many()
        .col_expr(OrderCol::PaymentStatus, Expr::value(next.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(OrderCol::Id.eq(id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let order = find_order(state, id).await?;
    tracing::info!(order_id = %id, payment_status = %next, admin = admin.email(), "payment status updated");
    audit::record(
        &state.orm,
        Some(admin.email()),
        "order_payment_update",
        Some("orders"),
        serde_json::json!({ "order_id": id, "payment_status": next }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment status updated",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(order_id = %id, admin = admin.email(), "order deleted");
    audit::record(
        &state.orm,
        Some(admin.email()),
        "order_delete",
        Some("orders"),
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

pub fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::InvalidStatus(raw.to_string()))
}

fn validate_new_order(payload: CreateOrderRequest) -> AppResult<NewOrder> {
    if payload.items.is_empty() {
        return Err(AppError::InvalidOrder(
            "order must include at least one item".into(),
        ));
    }

    let mut items = Vec::with_capacity(payload.items.len());
    for (index, item) in payload.items.into_iter().enumerate() {
        if item.price.is_sign_negative() && !item.price.is_zero() {
            return Err(AppError::InvalidOrder(format!(
                "items[{index}].price must not be negative"
            )));
        }
        if item.quantity < 1 {
            return Err(AppError::InvalidOrder(format!(
                "items[{index}].quantity must be at least 1"
            )));
        }
        items.push(LineItem {
            product_ref: item.product_ref,
            title: item.title,
            slug: item.slug,
            image_ref: item.image_ref,
            unit_price: item.price,
            quantity: item.quantity,
        });
    }

    let shipping_input = payload.shipping.unwrap_or_default();
    if shipping_input.fee.is_some_and(|fee| fee.is_sign_negative() && !fee.is_zero()) {
        return Err(AppError::InvalidOrder(
            "shipping.fee must not be negative".into(),
        ));
    }

    let prior = payload.amounts.map(|a| PriorAmounts {
        subtotal: a.subtotal,
        shipping: a.shipping,
        total: a.total,
    });
    if prior
        .and_then(|p| p.shipping)
        .is_some_and(|fee| fee.is_sign_negative() && !fee.is_zero())
    {
        return Err(AppError::InvalidOrder(
            "amounts.shipping must not be negative".into(),
        ));
    }

    let status = match payload.status.as_deref().map(str::trim) {
        None | Some("") => OrderStatus::default(),
        Some(raw) => parse_status(raw)?,
    };

    Ok(NewOrder {
        customer: payload.customer,
        items,
        shipping: Shipping {
            method: shipping_input.method,
            fee: shipping_input.fee,
        },
        payment_method: payload.payment.map(|p| p.method).unwrap_or_default(),
        prior,
        status,
        client_created_at: payload.created_at,
    })
}

fn normalize_idempotency_key(raw: Option<&str>) -> AppResult<Option<String>> {
    let Some(key) = raw.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(AppError::BadRequest(format!(
            "Idempotency-Key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(Some(key.to_owned()))
}

async fn find_recent_by_key(state: &AppState, key: &str) -> AppResult<Option<OrderModel>> {
    let window_start = Utc::now() - Duration::seconds(state.orders.idempotency_window_secs);
    let latest = Orders::find()
        .filter(OrderCol::IdempotencyKey.eq(key))
        .order_by_desc(OrderCol::CreatedAt)
        .one(&state.orm)
        .await?;
    Ok(latest.filter(|m| m.created_at.with_timezone(&Utc) >= window_start))
}

/// Order view plus the amounts that had to be recomputed, if any.
/// `persist` is false when part of the stored document could not be read,
/// so the recomputed figures are shown but never saved.
struct Normalized {
    order: Order,
    backfilled: Option<Amounts>,
    persist: bool,
}

/// Converts a stored row and writes recomputed amounts back. A failed
/// write-back is logged; the caller still gets the normalized view.
async fn load_normalized(state: &AppState, model: OrderModel) -> AppResult<Order> {
    let Normalized {
        order,
        backfilled,
        persist,
    } = order_from_entity(model)?;

    if backfilled.is_some() && !persist {
        tracing::warn!(order_id = %order.id, "stored document partly unreadable, backfill not saved");
    }

    if let Some(amounts) = backfilled.filter(|_| persist) {
        let persisted = match to_json(&amounts) {
            Ok(value) => Orders::update_many()
                .col_expr(OrderCol::Amounts, Expr::value(value))
                .filter(OrderCol::Id.eq(order.id))
                .exec(&state.orm)
                .await
                .map_err(AppError::from),
            Err(err) => Err(err),
        };
        match persisted {
            Ok(_) => tracing::debug!(order_id = %order.id, "backfilled order amounts"),
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "failed to persist backfilled amounts")
            }
        }
    }

    Ok(order)
}

fn order_from_entity(model: OrderModel) -> AppResult<Normalized> {
    let status = stored_status(&model)?;
    let payment_status: PaymentStatus = model.payment_status.parse().map_err(|e| {
        AppError::Internal(anyhow::anyhow!("order {} has {e} as payment status", model.id))
    })?;

    let (items, items_readable) = stored_items(model.id, model.items);
    let (shipping, shipping_readable) = match serde_json::from_value::<Shipping>(model.shipping) {
        Ok(shipping) => (shipping, true),
        Err(err) => {
            tracing::warn!(order_id = %model.id, error = %err, "unreadable shipping block");
            (Shipping::default(), false)
        }
    };

    let (amounts, backfilled) = match stored_amounts(model.amounts.as_ref()) {
        Some(amounts) => (amounts, None),
        None => {
            let prior = model.amounts.as_ref().map(PriorAmounts::from_json);
            let amounts = compute_amounts(&items, &shipping, prior.as_ref());
            (amounts, Some(amounts))
        }
    };

    let order = Order {
        id: model.id,
        customer: Customer {
            name: model.customer_name,
            email: model.customer_email,
            phone: model.customer_phone,
            address_line1: model.address_line1,
            address_line2: model.address_line2,
            city: model.city,
            country: model.country,
            postal_code: model.postal_code,
        },
        items,
        shipping,
        payment: Payment {
            method: model.payment_method,
            status: payment_status,
        },
        amounts,
        status,
        client_created_at: model.client_created_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    };

    Ok(Normalized {
        order,
        backfilled,
        persist: items_readable && shipping_readable,
    })
}

/// Decodes stored lines one by one. A line that cannot be read at all is
/// left out, which prices it as zero; the flag reports whether every line
/// was read.
fn stored_items(order_id: Uuid, value: serde_json::Value) -> (Vec<LineItem>, bool) {
    let serde_json::Value::Array(raw) = value else {
        tracing::warn!(order_id = %order_id, "order items are not a list, pricing as empty");
        return (Vec::new(), false);
    };

    let mut readable = true;
    let mut items = Vec::with_capacity(raw.len());
    for (index, line) in raw.into_iter().enumerate() {
        match serde_json::from_value::<LineItem>(line) {
            Ok(item) => items.push(item),
            Err(err) => {
                tracing::warn!(order_id = %order_id, index, error = %err, "unreadable order line");
                readable = false;
            }
        }
    }
    (items, readable)
}

fn stored_status(model: &OrderModel) -> AppResult<OrderStatus> {
    model.status.parse().map_err(|e| {
        AppError::Internal(anyhow::anyhow!("order {} has {e} as status", model.id))
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '!') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}
