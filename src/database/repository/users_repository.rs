//! 用户仓库
//!
//! 余额写入均为带条件的 UPDATE：只有余额足够时才会扣款，
//! 返回的 `bool` 表示该行是否被修改。

use crate::database::dto::{Pagination, UpdateUserData};
use crate::entity::prelude::*;
use crate::entity::users::{self, Role};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;

pub struct UsersRepository;

impl UsersRepository {
    // ==================== Accounts ====================

    /// 首次出现时创建账户行，余额为 0
    pub async fn ensure_exists<C>(db: &C, user_id: &str) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now().timestamp();

        let user = users::ActiveModel {
            id: Set(user_id.to_string()),
            email: Set(None),
            username: Set(None),
            coins: Set(0),
            role: Set(Role::User.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Users::insert(user)
            .on_conflict(OnConflict::column(users::Column::Id).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;

        Ok(())
    }

    pub async fn find_or_create<C>(db: &C, user_id: &str) -> Result<users::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::ensure_exists(db, user_id).await?;

        Users::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("User record not found".to_string()))
    }

    pub async fn find_by_id<C>(db: &C, user_id: &str) -> Result<Option<users::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Users::find_by_id(user_id.to_string()).one(db).await
    }

    /// 最新账户在前
    pub async fn list(db: &DatabaseConnection, page: Pagination) -> Result<Vec<users::Model>, DbErr> {
        Users::find()
            .order_by_desc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .limit(page.limit())
            .offset(page.offset())
            .all(db)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, DbErr> {
        Users::find().count(db).await
    }

    /// 更新资料和角色，不修改余额
    pub async fn update(
        db: &DatabaseConnection,
        user_id: &str,
        updates: UpdateUserData,
    ) -> Result<users::Model, DbErr> {
        let existing = Users::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("User record not found".to_string()))?;

        let mut active: users::ActiveModel = existing.into();

        if let Some(email) = updates.email {
            active.email = Set(email);
        }
        if let Some(username) = updates.username {
            active.username = Set(username);
        }
        if let Some(role) = updates.role {
            active.role = Set(role.as_str().to_string());
        }
        active.updated_at = Set(chrono::Utc::now().timestamp());

        active.update(db).await
    }

    // ==================== Balance ====================

    pub async fn balance<C>(db: &C, user_id: &str) -> Result<Option<i64>, DbErr>
    where
        C: ConnectionTrait,
    {
        Users::find_by_id(user_id.to_string())
            .select_only()
            .column(users::Column::Coins)
            .into_tuple::<i64>()
            .one(db)
            .await
    }

    /// 仅当 `coins >= amount` 时执行 `coins = coins - amount`
    pub async fn debit<C>(db: &C, user_id: &str, amount: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = Users::update_many()
            .col_expr(users::Column::Coins, Expr::col(users::Column::Coins).sub(amount))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::Coins.gte(amount))
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// `coins = coins + amount`；用户不存在时返回 false
    pub async fn credit<C>(db: &C, user_id: &str, amount: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = Users::update_many()
            .col_expr(users::Column::Coins, Expr::col(users::Column::Coins).add(amount))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// 所有余额之和，即流通中的金币
    pub async fn total_coins(db: &DatabaseConnection) -> Result<i64, DbErr> {
        let total = Users::find()
            .select_only()
            .column_as(users::Column::Coins.sum(), "total")
            .into_tuple::<Option<i64>>()
            .one(db)
            .await?;

        Ok(total.flatten().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::test_connection;

    #[tokio::test]
    async fn ensure_exists_is_idempotent() {
        let db = test_connection().await;

        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();
        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();

        assert_eq!(UsersRepository::count(&db).await.unwrap(), 1);
        assert_eq!(UsersRepository::balance(&db, "u-1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn debit_refuses_to_overdraw() {
        let db = test_connection().await;
        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();
        assert!(UsersRepository::credit(&db, "u-1", 50).await.unwrap());

        assert!(!UsersRepository::debit(&db, "u-1", 51).await.unwrap());
        assert_eq!(UsersRepository::balance(&db, "u-1").await.unwrap(), Some(50));

        assert!(UsersRepository::debit(&db, "u-1", 50).await.unwrap());
        assert_eq!(UsersRepository::balance(&db, "u-1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn credit_reports_missing_user() {
        let db = test_connection().await;
        assert!(!UsersRepository::credit(&db, "ghost", 10).await.unwrap());
    }

    #[tokio::test]
    async fn update_changes_role_but_not_balance() {
        let db = test_connection().await;
        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();
        UsersRepository::credit(&db, "u-1", 5).await.unwrap();

        let updated = UsersRepository::update(
            &db,
            "u-1",
            UpdateUserData {
                role: Some(Role::Admin),
                username: Some(Some("reader".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(updated.is_admin());
        assert_eq!(updated.username.as_deref(), Some("reader"));
        assert_eq!(updated.coins, 5);
    }
}
