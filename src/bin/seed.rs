use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::json;
use uuid::Uuid;
use woodmart_api::{
    amounts::compute_amounts,
    db::{create_orm_conn, run_migrations},
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    models::{Customer, LineItem, OrderStatus, PaymentStatus, Shipping},
};

struct DemoOrder {
    key: &'static str,
    customer: Customer,
    items: Vec<LineItem>,
    shipping: Shipping,
    status: OrderStatus,
    age_days: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let orm = create_orm_conn(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let mut inserted = 0;
    for demo in demo_orders() {
        if seed_order(&orm, demo).await? {
            inserted += 1;
        }
    }
    if seed_legacy_order(&orm).await? {
        inserted += 1;
    }

    println!("Seed completed. Inserted {inserted} orders");
    Ok(())
}

async fn seed_order(orm: &sea_orm::DatabaseConnection, demo: DemoOrder) -> anyhow::Result<bool> {
    if already_seeded(orm, demo.key).await? {
        println!("Skipping {}, already present", demo.key);
        return Ok(false);
    }

    let amounts = compute_amounts(&demo.items, &demo.shipping, None);
    let created_at = (Utc::now() - Duration::days(demo.age_days)).fixed_offset();
    OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(demo.customer.name),
        customer_email: Set(demo.customer.email),
        customer_phone: Set(demo.customer.phone),
        address_line1: Set(demo.customer.address_line1),
        address_line2: Set(demo.customer.address_line2),
        city: Set(demo.customer.city),
        country: Set(demo.customer.country),
        postal_code: Set(demo.customer.postal_code),
        items: Set(serde_json::to_value(&demo.items)?),
        shipping: Set(serde_json::to_value(&demo.shipping)?),
        payment_method: Set("cod".to_string()),
        payment_status: Set(PaymentStatus::Unpaid.as_str().to_string()),
        amounts: Set(Some(serde_json::to_value(amounts)?)),
        status: Set(demo.status.as_str().to_string()),
        idempotency_key: Set(Some(demo.key.to_string())),
        client_created_at: Set(None),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(orm)
    .await?;

    println!("Inserted {} ({}, total {})", demo.key, demo.status, amounts.total);
    Ok(true)
}

/// An order written before amounts were stored. Reading it through the API
/// recomputes and backfills its totals.
async fn seed_legacy_order(orm: &sea_orm::DatabaseConnection) -> anyhow::Result<bool> {
    const KEY: &str = "seed-legacy";
    if already_seeded(orm, KEY).await? {
        println!("Skipping {KEY}, already present");
        return Ok(false);
    }

    let created_at = (Utc::now() - Duration::days(30)).fixed_offset();
    OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set("Legacy Buyer".to_string()),
        customer_email: Set("legacy@example.com".to_string()),
        customer_phone: Set(String::new()),
        address_line1: Set("1 Old Road".to_string()),
        address_line2: Set(None),
        city: Set("Leeds".to_string()),
        country: Set("UK".to_string()),
        postal_code: Set("LS1 1AA".to_string()),
        items: Set(json!([{ "productId": "chair-oak", "title": "Oak chair", "price": "15", "qty": 1 }])),
        shipping: Set(json!({ "method": "pickup", "fee": 0 })),
        payment_method: Set("cod".to_string()),
        payment_status: Set(PaymentStatus::Unpaid.as_str().to_string()),
        amounts: Set(None),
        status: Set(OrderStatus::New.as_str().to_string()),
        idempotency_key: Set(Some(KEY.to_string())),
        client_created_at: Set(None),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(orm)
    .await?;

    println!("Inserted {KEY} without amounts");
    Ok(true)
}

async fn already_seeded(orm: &sea_orm::DatabaseConnection, key: &str) -> anyhow::Result<bool> {
    let existing = Orders::find()
        .filter(OrderCol::IdempotencyKey.eq(key))
        .one(orm)
        .await?;
    Ok(existing.is_some())
}

fn line(product_ref: &str, title: &str, cents: i64, quantity: i64) -> LineItem {
    LineItem {
        product_ref: product_ref.to_string(),
        title: title.to_string(),
        slug: product_ref.to_string(),
        image_ref: None,
        unit_price: Decimal::new(cents, 2),
        quantity,
    }
}

fn customer(name: &str, email: &str, city: &str) -> Customer {
    Customer {
        name: name.to_string(),
        email: email.to_string(),
        phone: "+44 20 7946 0000".to_string(),
        address_line1: "221B Baker Street".to_string(),
        address_line2: None,
        city: city.to_string(),
        country: "UK".to_string(),
        postal_code: "NW1 6XE".to_string(),
    }
}

fn demo_orders() -> Vec<DemoOrder> {
    vec![
        DemoOrder {
            key: "seed-1",
            customer: customer("Ada Lovelace", "ada@example.com", "London"),
            items: vec![
                line("table-walnut", "Walnut dining table", 89900, 1),
                line("chair-oak", "Oak chair", 12950, 4),
            ],
            shipping: Shipping {
                method: "courier".to_string(),
                fee: Some(Decimal::new(2500, 2)),
            },
            status: OrderStatus::Pending,
            age_days: 1,
        },
        DemoOrder {
            key: "seed-2",
            customer: customer("Grace Hopper", "grace@example.com", "Bristol"),
            items: vec![line("lamp-brass", "Brass floor lamp", 14999, 2)],
            shipping: Shipping {
                method: "standard".to_string(),
                fee: Some(Decimal::new(999, 2)),
            },
            status: OrderStatus::Shipped,
            age_days: 5,
        },
        DemoOrder {
            key: "seed-3",
            customer: customer("Alan Turing", "alan@example.com", "Manchester"),
            items: vec![line("shelf-pine", "Pine wall shelf", 3450, 3)],
            shipping: Shipping {
                method: "pickup".to_string(),
                fee: None,
            },
            status: OrderStatus::Delivered,
            age_days: 12,
        },
    ]
}
