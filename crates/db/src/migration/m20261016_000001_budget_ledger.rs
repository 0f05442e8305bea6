//! Budgets, transactions, and the per-budget balance history.
//!
//! Storage-level guards: one budget per user, strictly positive transaction
//! amounts, non-negative balances, at most one history row per transaction.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    UserId,
    Currency,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    BudgetId,
    CategoryId,
    Amount,
    TransactionType,
    Note,
    CreatedAt,
}

#[derive(Iden)]
enum BudgetsHistory {
    Table,
    Id,
    BudgetId,
    TransactionId,
    Balance,
    CreatedAt,
}

/// NUMERIC(19,4) where the backend supports it. SQLite caps declared
/// precision at 16 and stores amounts as REAL either way.
fn money_column<T: IntoIden>(manager: &SchemaManager, column: T) -> ColumnDef {
    let mut def = ColumnDef::new(column);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => def.decimal(),
        _ => def.decimal_len(19, 4),
    };
    def
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::UserId).uuid().not_null().unique_key())
                    .col(
                        ColumnDef::new(Budgets::Currency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Budgets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Budgets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).uuid().not_null())
                    .col(
                        money_column(manager, Transactions::Amount)
                            .not_null()
                            .check(Expr::col(Transactions::Amount).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionType)
                            .string_len(16)
                            .not_null()
                            .check(
                                Expr::col(Transactions::TransactionType)
                                    .is_in(["deposit", "withdrawal"]),
                            ),
                    )
                    .col(
                        ColumnDef::new(Transactions::Note)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-budget_id")
                            .from(Transactions::Table, Transactions::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BudgetsHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetsHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetsHistory::BudgetId).uuid().not_null())
                    .col(
                        ColumnDef::new(BudgetsHistory::TransactionId)
                            .uuid()
                            .null()
                            .unique_key(),
                    )
                    .col(
                        money_column(manager, BudgetsHistory::Balance)
                            .not_null()
                            .check(Expr::col(BudgetsHistory::Balance).gte(0)),
                    )
                    .col(
                        ColumnDef::new(BudgetsHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets_history-budget_id")
                            .from(BudgetsHistory::Table, BudgetsHistory::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets_history-transaction_id")
                            .from(BudgetsHistory::Table, BudgetsHistory::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets_history-budget_id-created_at")
                    .table(BudgetsHistory::Table)
                    .col(BudgetsHistory::BudgetId)
                    .col(BudgetsHistory::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BudgetsHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        Ok(())
    }
}
