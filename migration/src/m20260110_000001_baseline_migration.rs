//! 基线表结构：账户、作品目录和金币账本。
//!
//! 余额约束直接写在表结构里：
//! - `users.coins` 带 `CHECK (coins >= 0)`
//! - `coin_transactions.reference` 唯一，同一支付凭证只入账一次
//! - `user_chapter_purchases` 按 (user, chapter) 唯一，章节不会被重复购买

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend, Statement, TransactionTrait};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        let txn = conn.begin().await?;

        create_account_tables(&txn).await?;
        create_catalog_tables(&txn).await?;
        create_ledger_tables(&txn).await?;
        create_indexes(&txn).await?;

        txn.commit().await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        for table in [
            "user_chapter_purchases",
            "coin_transactions",
            "coin_packages",
            "chapters",
            "manhwa",
            "users",
        ] {
            conn.execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                format!(r#"DROP TABLE IF EXISTS "{}""#, table),
            ))
            .await?;
        }

        Ok(())
    }
}

async fn create_account_tables<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "users" (
            "id" TEXT NOT NULL PRIMARY KEY,
            "email" TEXT,
            "username" TEXT,
            "coins" INTEGER NOT NULL DEFAULT 0 CHECK ("coins" >= 0),
            "role" TEXT NOT NULL DEFAULT 'user',
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )"#,
    ))
    .await?;

    Ok(())
}

async fn create_catalog_tables<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "manhwa" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "title" TEXT NOT NULL,
            "slug" TEXT NOT NULL UNIQUE,
            "description" TEXT,
            "cover_url" TEXT,
            "author" TEXT,
            "status" TEXT NOT NULL DEFAULT 'ongoing',
            "genres" TEXT,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )"#,
    ))
    .await?;

    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "chapters" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "manhwa_id" INTEGER NOT NULL,
            "number" INTEGER NOT NULL,
            "title" TEXT,
            "is_premium" INTEGER NOT NULL DEFAULT 0,
            "coin_price" INTEGER NOT NULL DEFAULT 0 CHECK ("coin_price" >= 0),
            "pages" TEXT,
            "published_at" INTEGER,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE("manhwa_id", "number"),
            FOREIGN KEY("manhwa_id") REFERENCES "manhwa"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "coin_packages" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "name" TEXT NOT NULL,
            "coins" INTEGER NOT NULL CHECK ("coins" > 0),
            "bonus_coins" INTEGER NOT NULL DEFAULT 0 CHECK ("bonus_coins" >= 0),
            "price_cents" INTEGER NOT NULL CHECK ("price_cents" >= 0),
            "currency" TEXT NOT NULL DEFAULT 'usd',
            "is_active" INTEGER NOT NULL DEFAULT 1,
            "sort_order" INTEGER NOT NULL DEFAULT 0,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )"#,
    ))
    .await?;

    Ok(())
}

async fn create_ledger_tables<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    // 只追加；amount 有符号，balance_after 为本行生效后的余额
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "coin_transactions" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "user_id" TEXT NOT NULL,
            "amount" INTEGER NOT NULL,
            "balance_after" INTEGER NOT NULL CHECK ("balance_after" >= 0),
            "kind" TEXT NOT NULL,
            "description" TEXT,
            "reference" TEXT UNIQUE,
            "metadata" TEXT,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY("user_id") REFERENCES "users"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "user_chapter_purchases" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "user_id" TEXT NOT NULL,
            "chapter_id" INTEGER NOT NULL,
            "coins_spent" INTEGER NOT NULL DEFAULT 0,
            "source" TEXT NOT NULL DEFAULT 'coins',
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE("user_id", "chapter_id"),
            FOREIGN KEY("user_id") REFERENCES "users"("id") ON DELETE CASCADE,
            FOREIGN KEY("chapter_id") REFERENCES "chapters"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    Ok(())
}

async fn create_indexes<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let indexes = [
        ("idx_users_role", "users", "role"),
        ("idx_chapters_manhwa_id", "chapters", "manhwa_id"),
        ("idx_coin_packages_is_active", "coin_packages", "is_active"),
        ("idx_coin_transactions_user_id", "coin_transactions", "user_id"),
        ("idx_coin_transactions_kind", "coin_transactions", "kind"),
        (
            "idx_coin_transactions_created_at",
            "coin_transactions",
            "created_at",
        ),
        (
            "idx_user_chapter_purchases_chapter_id",
            "user_chapter_purchases",
            "chapter_id",
        ),
    ];

    for (index_name, table_name, column_name) in &indexes {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!(
                r#"CREATE INDEX IF NOT EXISTS "{}" ON "{}" ("{}")"#,
                index_name, table_name, column_name
            ),
        ))
        .await?;
    }

    Ok(())
}
