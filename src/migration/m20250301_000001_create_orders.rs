use sea_orm_migration::prelude::*;

const ORDER_STATUSES: [&str; 6] = [
    "pending",
    "new",
    "processing",
    "shipped",
    "delivered",
    "cancelled",
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                    .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                    .col(ColumnDef::new(Orders::CustomerPhone).string().not_null())
                    .col(ColumnDef::new(Orders::AddressLine1).string().not_null())
                    .col(ColumnDef::new(Orders::AddressLine2).string().null())
                    .col(ColumnDef::new(Orders::City).string().not_null())
                    .col(ColumnDef::new(Orders::Country).string().not_null())
                    .col(ColumnDef::new(Orders::PostalCode).string().not_null())
                    .col(ColumnDef::new(Orders::Items).json_binary().not_null())
                    .col(ColumnDef::new(Orders::Shipping).json_binary().not_null())
                    .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string()
                            .not_null()
                            .check(Expr::col(Orders::PaymentStatus).is_in(["unpaid", "paid"])),
                    )
                    // Backfilled on read when missing.
                    .col(ColumnDef::new(Orders::Amounts).json_binary().null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string()
                            .not_null()
                            .check(
                                Expr::col(Orders::Status).is_in(ORDER_STATUSES),
                            ),
                    )
                    .col(ColumnDef::new(Orders::IdempotencyKey).string_len(128).null())
                    .col(
                        ColumnDef::new(Orders::ClientCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_idempotency_key")
                    .table(Orders::Table)
                    .col(Orders::IdempotencyKey)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_status_created_at")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    #[sea_orm(iden = "address_line1")]
    AddressLine1,
    #[sea_orm(iden = "address_line2")]
    AddressLine2,
    City,
    Country,
    PostalCode,
    Items,
    Shipping,
    PaymentMethod,
    PaymentStatus,
    Amounts,
    Status,
    IdempotencyKey,
    ClientCreatedAt,
    CreatedAt,
    UpdatedAt,
}
