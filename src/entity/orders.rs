use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub items: Json,
    pub shipping: Json,
    pub payment_method: String,
    pub payment_status: String,
    pub amounts: Option<Json>,
    pub status: String,
    pub idempotency_key: Option<String>,
    pub client_created_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
