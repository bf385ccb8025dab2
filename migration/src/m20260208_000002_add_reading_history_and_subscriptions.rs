//! 阅读进度与第三方订阅状态。
//!
//! 1. `reading_history`：每个 (user, chapter) 一行，进度为百分比
//! 2. `subscriptions`：每个用户一行，按支付方的订阅 ID 做 upsert

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. reading_history
        manager
            .create_table(
                Table::create()
                    .table(ReadingHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReadingHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReadingHistory::UserId).text().not_null())
                    .col(ColumnDef::new(ReadingHistory::ManhwaId).integer().not_null())
                    .col(ColumnDef::new(ReadingHistory::ChapterId).integer().not_null())
                    .col(
                        ColumnDef::new(ReadingHistory::Progress)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ReadingHistory::LastReadAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reading_history_user")
                            .from(ReadingHistory::Table, ReadingHistory::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reading_history_chapter")
                            .from(ReadingHistory::Table, ReadingHistory::ChapterId)
                            .to(Chapters::Table, Chapters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reading_history_user_chapter")
                    .table(ReadingHistory::Table)
                    .col(ReadingHistory::UserId)
                    .col(ReadingHistory::ChapterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reading_history_last_read_at")
                    .table(ReadingHistory::Table)
                    .col(ReadingHistory::LastReadAt)
                    .to_owned(),
            )
            .await?;

        // 2. subscriptions
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UserId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::ProviderSubscriptionId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::Status).text().not_null())
                    .col(ColumnDef::new(Subscriptions::Plan).text().null())
                    .col(
                        ColumnDef::new(Subscriptions::CurrentPeriodEnd)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_user")
                            .from(Subscriptions::Table, Subscriptions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReadingHistory::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ReadingHistory {
    Table,
    Id,
    UserId,
    ManhwaId,
    ChapterId,
    Progress,
    LastReadAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    ProviderSubscriptionId,
    Status,
    Plan,
    CurrentPeriodEnd,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Chapters {
    Table,
    Id,
}
