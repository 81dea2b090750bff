use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Amounts, Customer, Order, OrderStatus};

/// Checkout or manual order payload. Unknown fields are rejected; any
/// amounts sent by the client are only used as a shipping fee fallback.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    pub shipping: Option<ShippingInput>,
    #[serde(default)]
    pub payment: Option<PaymentInput>,
    #[serde(default)]
    pub amounts: Option<AmountsInput>,
    #[serde(default)]
    pub status: Option<String>,
    /// Advisory only, the server always assigns `created_at`.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LineItemInput {
    #[serde(default)]
    pub product_ref: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ShippingInput {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub fee: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PaymentInput {
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AmountsInput {
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub shipping: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCreated {
    pub id: Uuid,
    pub status: OrderStatus,
    pub amounts: Amounts,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
