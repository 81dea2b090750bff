use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        contact::{ContactRequest, MessageList},
        orders::{
            AmountsInput, CreateOrderRequest, LineItemInput, OrderCreated, OrderList,
            PaymentInput, ShippingInput, UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
        },
    },
    models::{
        Amounts, ContactMessage, Customer, LineItem, Order, OrderStatus, Payment, PaymentStatus,
        Shipping,
    },
    response::{ApiResponse, Meta},
    routes::{admin, contact, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::update_payment_status,
        orders::delete_order,
        admin::login,
        admin::list_messages,
        admin::mark_message_read,
        admin::delete_message,
        contact::submit_contact
    ),
    components(
        schemas(
            Order,
            OrderStatus,
            PaymentStatus,
            Customer,
            LineItem,
            Shipping,
            Payment,
            Amounts,
            ContactMessage,
            CreateOrderRequest,
            LineItemInput,
            ShippingInput,
            PaymentInput,
            AmountsInput,
            OrderCreated,
            OrderList,
            UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
            LoginRequest,
            LoginResponse,
            ContactRequest,
            MessageList,
            params::Pagination,
            params::OrderListQuery,
            params::SortOrder,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderCreated>,
            ApiResponse<OrderList>,
            ApiResponse<LoginResponse>,
            ApiResponse<ContactMessage>,
            ApiResponse<MessageList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin login and inbox"),
        (name = "Contact", description = "Contact form"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
