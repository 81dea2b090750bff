mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;
use uuid::Uuid;
use woodmart_api::{
    config::OrderPolicy,
    dto::orders::{UpdateOrderStatusRequest, UpdatePaymentStatusRequest},
    entity::{
        AuditLogs,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::AppError,
    models::{OrderStatus, PaymentStatus},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service,
    state::AppState,
};

use common::{admin, chair_order, order_payload, setup_state, setup_state_with};

fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

fn status_request(status: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status: status.into(),
    }
}

async fn stored_status(state: &AppState, id: Uuid) -> anyhow::Result<String> {
    let model = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .expect("order row");
    Ok(model.status)
}

#[tokio::test]
async fn create_order_computes_amounts_and_starts_pending() -> anyhow::Result<()> {
    let state = setup_state().await?;

    let outcome =
        order_service::create_order(&state, chair_order("Ada Lovelace", "ada@example.com"), None)
            .await?;
    assert!(!outcome.replayed);

    let order = outcome.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment.status, PaymentStatus::Unpaid);
    assert_eq!(order.amounts.subtotal, dec("20"));
    assert_eq!(order.amounts.shipping, dec("5"));
    assert_eq!(order.amounts.total, dec("25"));

    let fetched = order_service::find_order(&state, order.id).await?;
    assert_eq!(fetched.amounts, order.amounts);
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.customer.email, "ada@example.com");
    Ok(())
}

#[tokio::test]
async fn client_amounts_and_timestamps_are_not_trusted() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let client_time = "2001-01-01T00:00:00Z";

    let payload = order_payload(json!({
        "items": [{ "price": 10, "quantity": 1 }],
        "amounts": { "subtotal": 1, "shipping": 3, "total": 1 },
        "created_at": client_time,
    }));
    let order = order_service::create_order(&state, payload, None)
        .await?
        .order;

    // only the shipping figure is used, as a fee fallback
    assert_eq!(order.amounts.total, dec("13"));
    assert_eq!(
        order.client_created_at.map(|t| t.to_rfc3339()),
        Some("2001-01-01T00:00:00+00:00".to_string())
    );
    assert!(order.created_at > Utc::now() - Duration::minutes(1));
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected_and_nothing_persisted() -> anyhow::Result<()> {
    let state = setup_state().await?;

    let err = order_service::create_order(&state, order_payload(json!({ "items": [] })), None)
        .await
        .expect_err("empty order must fail");
    assert!(matches!(err, AppError::InvalidOrder(_)));

    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_lines_and_status_are_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;

    let cases = [
        json!({ "items": [{ "price": -1, "quantity": 1 }] }),
        json!({ "items": [{ "price": 1, "quantity": 0 }] }),
        json!({ "items": [{ "price": 1, "quantity": 1 }], "shipping": { "fee": -2 } }),
    ];
    for payload in cases {
        let err = order_service::create_order(&state, order_payload(payload), None)
            .await
            .expect_err("invalid order");
        assert!(matches!(err, AppError::InvalidOrder(_)), "got {err:?}");
    }

    let err = order_service::create_order(
        &state,
        order_payload(json!({ "items": [{ "price": 1, "quantity": 1 }], "status": "lost" })),
        None,
    )
    .await
    .expect_err("unknown status");
    assert!(matches!(err, AppError::InvalidStatus(_)));

    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    Ok(())
}

#[test]
fn unknown_fields_fail_to_decode() {
    let result = serde_json::from_value::<woodmart_api::dto::orders::CreateOrderRequest>(json!({
        "items": [{ "price": 1, "quantity": 1 }],
        "coupon": "FREE"
    }));
    assert!(result.is_err());
}

#[tokio::test]
async fn missing_order_is_not_found() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let err = order_service::find_order(&state, Uuid::new_v4())
        .await
        .expect_err("no such order");
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn status_transition_and_rejected_status() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin();
    let order = order_service::create_order(&state, chair_order("Ada", "ada@example.com"), None)
        .await?
        .order;

    let resp = order_service::update_order_status(&state, &admin, order.id, status_request("shipped"))
        .await?;
    let updated = resp.data.expect("order");
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert!(updated.updated_at >= order.updated_at);

    let err = order_service::update_order_status(&state, &admin, order.id, status_request("bogus"))
        .await
        .expect_err("bogus status");
    assert!(matches!(err, AppError::InvalidStatus(_)));
    assert_eq!(stored_status(&state, order.id).await?, "shipped");

    let err = order_service::update_order_status(&state, &admin, Uuid::new_v4(), status_request("shipped"))
        .await
        .expect_err("unknown id");
    assert!(matches!(err, AppError::NotFound));

    // every successful admin mutation leaves an audit entry
    assert_eq!(AuditLogs::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn terminal_states_reopen_unless_locked() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin();
    let order = order_service::create_order(&state, chair_order("Ada", "ada@example.com"), None)
        .await?
        .order;

    order_service::update_order_status(&state, &admin, order.id, status_request("cancelled")).await?;
    let reopened =
        order_service::update_order_status(&state, &admin, order.id, status_request("processing"))
            .await?;
    assert_eq!(reopened.data.expect("order").status, OrderStatus::Processing);

    let locked = setup_state_with(
        OrderPolicy {
            lock_terminal_status: true,
            ..OrderPolicy::default()
        },
        None,
    )
    .await?;
    let order = order_service::create_order(&locked, chair_order("Ada", "ada@example.com"), None)
        .await?
        .order;
    order_service::update_order_status(&locked, &admin, order.id, status_request("delivered")).await?;

    let err = order_service::update_order_status(&locked, &admin, order.id, status_request("processing"))
        .await
        .expect_err("delivered is final");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing
        }
    ));
    assert_eq!(stored_status(&locked, order.id).await?, "delivered");

    // re-asserting the same terminal state is allowed
    order_service::update_order_status(&locked, &admin, order.id, status_request("delivered")).await?;
    Ok(())
}

#[tokio::test]
async fn payment_status_and_delete() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin();
    let order = order_service::create_order(&state, chair_order("Ada", "ada@example.com"), None)
        .await?
        .order;

    let paid = order_service::update_payment_status(
        &state,
        &admin,
        order.id,
        UpdatePaymentStatusRequest {
            status: "paid".into(),
        },
    )
    .await?;
    assert_eq!(paid.data.expect("order").payment.status, PaymentStatus::Paid);

    let err = order_service::update_payment_status(
        &state,
        &admin,
        order.id,
        UpdatePaymentStatusRequest {
            status: "refunded".into(),
        },
    )
    .await
    .expect_err("unknown payment status");
    assert!(matches!(err, AppError::InvalidStatus(_)));

    order_service::delete_order(&state, &admin, order.id).await?;
    assert_eq!(Orders::find().count(&state.orm).await?, 0);

    let err = order_service::delete_order(&state, &admin, order.id)
        .await
        .expect_err("already deleted");
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

async fn insert_legacy_order(state: &AppState, amounts: Option<serde_json::Value>) -> anyhow::Result<Uuid> {
    insert_legacy_document(
        state,
        json!([{ "price": 15, "qty": 1 }]),
        json!({ "fee": 0 }),
        amounts,
        "new",
    )
    .await
}

async fn insert_legacy_document(
    state: &AppState,
    items: serde_json::Value,
    shipping: serde_json::Value,
    amounts: Option<serde_json::Value>,
    status: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let created_at = (Utc::now() - Duration::days(3)).fixed_offset();
    OrderActive {
        id: Set(id),
        customer_name: Set("Legacy Buyer".into()),
        customer_email: Set("legacy@example.com".into()),
        customer_phone: Set(String::new()),
        address_line1: Set(String::new()),
        address_line2: Set(None),
        city: Set(String::new()),
        country: Set(String::new()),
        postal_code: Set(String::new()),
        items: Set(items),
        shipping: Set(shipping),
        payment_method: Set(String::new()),
        payment_status: Set("unpaid".into()),
        amounts: Set(amounts),
        status: Set(status.into()),
        idempotency_key: Set(None),
        client_created_at: Set(None),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(&state.orm)
    .await?;
    Ok(id)
}

#[tokio::test]
async fn legacy_order_is_backfilled_once_and_stays_stable() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let id = insert_legacy_order(&state, None).await?;
    let before = Orders::find_by_id(id).one(&state.orm).await?.expect("row");

    let first = order_service::find_order(&state, id).await?;
    assert_eq!(first.status, OrderStatus::New);
    assert_eq!(first.amounts.subtotal, dec("15"));
    assert_eq!(first.amounts.shipping, dec("0"));
    assert_eq!(first.amounts.total, dec("15"));

    let second = order_service::find_order(&state, id).await?;
    assert_eq!(first.amounts, second.amounts);

    let after = Orders::find_by_id(id).one(&state.orm).await?.expect("row");
    let stored = after.amounts.expect("amounts written back");
    assert_eq!(stored["total"].as_f64(), Some(15.0));
    assert_eq!(after.updated_at, before.updated_at);
    Ok(())
}

#[tokio::test]
async fn malformed_stored_amounts_are_recomputed() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let id = insert_legacy_order(
        &state,
        Some(json!({ "subtotal": "15", "shipping": "2.5", "total": "n/a" })),
    )
    .await?;

    let order = order_service::find_order(&state, id).await?;
    // shipping block has fee 0, so the stale figure is not used
    assert_eq!(order.amounts.total, dec("15"));
    Ok(())
}

#[tokio::test]
async fn loosely_typed_legacy_items_still_price() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let id = insert_legacy_document(
        &state,
        json!([{ "title": 123, "price": 15, "qty": 2 }]),
        json!({ "fee": 5 }),
        None,
        "new",
    )
    .await?;

    let order = order_service::find_order(&state, id).await?;
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].title, "123");
    assert_eq!(order.amounts.subtotal, dec("30"));
    assert_eq!(order.amounts.shipping, dec("5"));
    assert_eq!(order.amounts.total, dec("35"));

    let stored = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .expect("row")
        .amounts
        .expect("amounts written back");
    assert_eq!(stored["total"].as_f64(), Some(35.0));
    Ok(())
}

#[tokio::test]
async fn unreadable_items_are_priced_but_not_written_back() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let id = insert_legacy_document(
        &state,
        json!(["junk", { "price": 15, "qty": 1 }]),
        json!({ "fee": 0 }),
        None,
        "new",
    )
    .await?;

    let order = order_service::find_order(&state, id).await?;
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.amounts.total, dec("15"));

    let row = Orders::find_by_id(id).one(&state.orm).await?.expect("row");
    assert!(row.amounts.is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_stored_status_is_rejected_by_the_schema() -> anyhow::Result<()> {
    let state = setup_state().await?;
    insert_legacy_document(&state, json!([]), json!({}), None, "archived")
        .await
        .expect_err("status outside the lifecycle");
    for status in ["pending", "new", "processing", "shipped", "delivered", "cancelled"] {
        insert_legacy_document(&state, json!([]), json!({}), None, status).await?;
    }
    Ok(())
}

#[tokio::test]
async fn idempotency_key_replays_within_window() -> anyhow::Result<()> {
    let state = setup_state().await?;

    let first = order_service::create_order(
        &state,
        chair_order("Ada", "ada@example.com"),
        Some("checkout-42"),
    )
    .await?;
    let replay = order_service::create_order(
        &state,
        chair_order("Ada", "ada@example.com"),
        Some("checkout-42"),
    )
    .await?;

    assert!(!first.replayed);
    assert!(replay.replayed);
    assert_eq!(first.order.id, replay.order.id);
    assert_eq!(Orders::find().count(&state.orm).await?, 1);

    // age the first order past the window
    Orders::update_many()
        .col_expr(
            OrderCol::CreatedAt,
            Expr::value((Utc::now() - Duration::days(2)).fixed_offset()),
        )
        .filter(OrderCol::Id.eq(first.order.id))
        .exec(&state.orm)
        .await?;

    let fresh = order_service::create_order(
        &state,
        chair_order("Ada", "ada@example.com"),
        Some("checkout-42"),
    )
    .await?;
    assert!(!fresh.replayed);
    assert_ne!(fresh.order.id, first.order.id);

    let err = order_service::create_order(
        &state,
        chair_order("Ada", "ada@example.com"),
        Some(&"k".repeat(129)),
    )
    .await
    .expect_err("oversized key");
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn list_filters_searches_and_paginates() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin();

    let ada = order_service::create_order(&state, chair_order("Ada Lovelace", "ada@example.com"), None)
        .await?
        .order;
    order_service::create_order(&state, chair_order("Grace Hopper", "grace@navy.example"), None).await?;
    order_service::create_order(&state, chair_order("Alan Turing", "alan@example.com"), None).await?;
    order_service::update_order_status(&state, &admin, ada.id, status_request("shipped")).await?;

    let all = order_service::list_orders(&state, OrderListQuery::default()).await?;
    assert_eq!(all.meta.as_ref().and_then(|m| m.total), Some(3));
    let items = all.data.expect("list").items;
    assert_eq!(items.len(), 3);
    // newest first by default
    assert_eq!(items[0].customer.name, "Alan Turing");

    let shipped = order_service::list_orders(
        &state,
        OrderListQuery {
            status: Some("shipped".into()),
            ..Default::default()
        },
    )
    .await?;
    let items = shipped.data.expect("list").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, ada.id);

    let search = order_service::list_orders(
        &state,
        OrderListQuery {
            q: Some("NAVY".into()),
            ..Default::default()
        },
    )
    .await?;
    let items = search.data.expect("list").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].customer.name, "Grace Hopper");

    let wildcard = order_service::list_orders(
        &state,
        OrderListQuery {
            q: Some("%".into()),
            ..Default::default()
        },
    )
    .await?;
    assert!(wildcard.data.expect("list").items.is_empty());

    let page = order_service::list_orders(
        &state,
        OrderListQuery {
            page: Some(2),
            per_page: Some(2),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?;
    let meta = page.meta.expect("meta");
    assert_eq!(meta.pages, Some(2));
    let items = page.data.expect("list").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].customer.name, "Alan Turing");

    let err = order_service::list_orders(
        &state,
        OrderListQuery {
            status: Some("lost".into()),
            ..Default::default()
        },
    )
    .await
    .expect_err("bad filter");
    assert!(matches!(err, AppError::InvalidStatus(_)));
    Ok(())
}
