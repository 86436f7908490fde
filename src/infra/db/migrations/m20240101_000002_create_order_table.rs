//! Migration: Create the order table, owned by an account.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_account_table::Account;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Order::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Order::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Order::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(Order::Amount).decimal_len(12, 2).not_null())
                    .col(
                        ColumnDef::new(Order::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Order::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_account")
                            .from(Order::Table, Order::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing an account's orders filters on the owner
        manager
            .create_index(
                Index::create()
                    .name("idx_order_account_id")
                    .table(Order::Table)
                    .col(Order::AccountId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Order::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Order {
    Table,
    Id,
    AccountId,
    Amount,
    Status,
    CreatedAt,
}
