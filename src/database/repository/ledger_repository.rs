//! 金币账本仓库
//!
//! 只插入不修改。调用方须在记录余额变化的同一事务中写入账本行。

use crate::database::dto::Pagination;
use crate::entity::coin_transactions::{self, TransactionKind};
use crate::entity::prelude::*;
use crate::entity::transaction_metadata::TransactionMetadata;
use sea_orm::*;

/// 待写入的账本行
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: String,
    pub amount: i64,
    pub balance_after: i64,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub metadata: Option<TransactionMetadata>,
}

pub struct LedgerRepository;

impl LedgerRepository {
    pub async fn insert<C>(db: &C, entry: NewLedgerEntry) -> Result<coin_transactions::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let row = coin_transactions::ActiveModel {
            id: NotSet,
            user_id: Set(entry.user_id),
            amount: Set(entry.amount),
            balance_after: Set(entry.balance_after),
            kind: Set(entry.kind.as_str().to_string()),
            description: Set(entry.description),
            reference: Set(entry.reference),
            metadata: Set(entry.metadata),
            created_at: Set(chrono::Utc::now().timestamp()),
        };

        row.insert(db).await
    }

    pub async fn find_by_reference<C>(
        db: &C,
        reference: &str,
    ) -> Result<Option<coin_transactions::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        CoinTransactions::find()
            .filter(coin_transactions::Column::Reference.eq(reference))
            .one(db)
            .await
    }

    /// 用户账本，最新在前
    pub async fn list_by_user(
        db: &DatabaseConnection,
        user_id: &str,
        page: Pagination,
    ) -> Result<Vec<coin_transactions::Model>, DbErr> {
        CoinTransactions::find()
            .filter(coin_transactions::Column::UserId.eq(user_id))
            .order_by_desc(coin_transactions::Column::Id)
            .limit(page.limit())
            .offset(page.offset())
            .all(db)
            .await
    }

    pub async fn count_by_user(db: &DatabaseConnection, user_id: &str) -> Result<u64, DbErr> {
        CoinTransactions::find()
            .filter(coin_transactions::Column::UserId.eq(user_id))
            .count(db)
            .await
    }

    /// 用户所有账本行的合计
    pub async fn sum_by_user<C>(db: &C, user_id: &str) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let total = CoinTransactions::find()
            .select_only()
            .column_as(coin_transactions::Column::Amount.sum(), "total")
            .filter(coin_transactions::Column::UserId.eq(user_id))
            .into_tuple::<Option<i64>>()
            .one(db)
            .await?;

        Ok(total.flatten().unwrap_or(0))
    }

    /// 某一类型账本行的合计（所有用户）
    pub async fn total_by_kind(db: &DatabaseConnection, kind: TransactionKind) -> Result<i64, DbErr> {
        let total = CoinTransactions::find()
            .select_only()
            .column_as(coin_transactions::Column::Amount.sum(), "total")
            .filter(coin_transactions::Column::Kind.eq(kind.as_str()))
            .into_tuple::<Option<i64>>()
            .one(db)
            .await?;

        Ok(total.flatten().unwrap_or(0))
    }
}
