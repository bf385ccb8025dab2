use crate::entity::prelude::*;
use crate::entity::subscriptions::{self, ACTIVE_STATUSES};
use sea_orm::*;

/// webhook 事件携带的订阅状态
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub user_id: String,
    pub provider_subscription_id: String,
    pub status: String,
    pub plan: Option<String>,
    pub current_period_end: Option<i64>,
}

/// 订阅仓库
pub struct SubscriptionsRepository;

impl SubscriptionsRepository {
    pub async fn find_by_user<C>(db: &C, user_id: &str) -> Result<Option<subscriptions::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Subscriptions::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .one(db)
            .await
    }

    /// 每个用户最多一行订阅；只有处于有效状态的新订阅才会替换旧订阅。
    ///
    /// 事件针对的是用户已替换掉的旧订阅时（例如新订阅生效后才到达的旧订阅取消事件）
    /// 返回 `None`，当前订阅行保持不变。
    pub async fn upsert(
        db: &DatabaseConnection,
        data: SubscriptionUpsert,
    ) -> Result<Option<subscriptions::Model>, DbErr> {
        let txn = db.begin().await?;
        let now = chrono::Utc::now().timestamp();

        let same_subscription = Subscriptions::find()
            .filter(
                subscriptions::Column::ProviderSubscriptionId
                    .eq(data.provider_subscription_id.as_str()),
            )
            .one(&txn)
            .await?;

        let existing = match same_subscription {
            Some(row) => Some(row),
            None => match Self::find_by_user(&txn, &data.user_id).await? {
                Some(current) if !ACTIVE_STATUSES.contains(&data.status.as_str()) => {
                    log::info!(
                        "忽略已被替换的订阅 {} 的 {} 事件，用户 {}，当前订阅 {}",
                        data.status,
                        data.provider_subscription_id,
                        data.user_id,
                        current.provider_subscription_id
                    );
                    txn.commit().await?;
                    return Ok(None);
                }
                current => current,
            },
        };

        let saved = match existing {
            Some(row) => {
                let mut active: subscriptions::ActiveModel = row.into();
                active.provider_subscription_id = Set(data.provider_subscription_id);
                active.status = Set(data.status);
                active.plan = Set(data.plan);
                active.current_period_end = Set(data.current_period_end);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            None => {
                subscriptions::ActiveModel {
                    id: NotSet,
                    user_id: Set(data.user_id),
                    provider_subscription_id: Set(data.provider_subscription_id),
                    status: Set(data.status),
                    plan: Set(data.plan),
                    current_period_end: Set(data.current_period_end),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?
            }
        };

        txn.commit().await?;
        Ok(Some(saved))
    }

    pub async fn has_active<C>(db: &C, user_id: &str, now: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(Self::find_by_user(db, user_id)
            .await?
            .is_some_and(|sub| sub.is_active_at(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::test_connection;
    use crate::database::repository::users_repository::UsersRepository;

    fn upsert(user: &str, sub: &str, status: &str, end: Option<i64>) -> SubscriptionUpsert {
        SubscriptionUpsert {
            user_id: user.to_string(),
            provider_subscription_id: sub.to_string(),
            status: status.to_string(),
            plan: Some("monthly".to_string()),
            current_period_end: end,
        }
    }

    #[tokio::test]
    async fn status_updates_replace_the_row() {
        let db = test_connection().await;
        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();
        let now = chrono::Utc::now().timestamp();

        SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_1", "active", Some(now + 3600)))
            .await
            .unwrap();
        assert!(SubscriptionsRepository::has_active(&db, "u-1", now).await.unwrap());

        SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_1", "canceled", Some(now + 3600)))
            .await
            .unwrap();
        assert!(!SubscriptionsRepository::has_active(&db, "u-1", now).await.unwrap());
    }

    #[tokio::test]
    async fn expired_period_is_inactive() {
        let db = test_connection().await;
        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();
        let now = chrono::Utc::now().timestamp();

        SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_1", "active", Some(now - 1)))
            .await
            .unwrap();

        assert!(!SubscriptionsRepository::has_active(&db, "u-1", now).await.unwrap());
    }

    #[tokio::test]
    async fn new_subscription_replaces_old_one_for_user() {
        let db = test_connection().await;
        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();

        SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_1", "canceled", None))
            .await
            .unwrap();
        let saved = SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_2", "active", None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(saved.provider_subscription_id, "sub_2");
        assert!(saved.is_active_at(0));
    }

    #[tokio::test]
    async fn late_cancellation_of_replaced_subscription_is_ignored() {
        let db = test_connection().await;
        UsersRepository::ensure_exists(&db, "u-1").await.unwrap();
        let now = chrono::Utc::now().timestamp();

        SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_old", "active", None))
            .await
            .unwrap();
        SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_new", "active", None))
            .await
            .unwrap();
        let stale = SubscriptionsRepository::upsert(&db, upsert("u-1", "sub_old", "canceled", None))
            .await
            .unwrap();

        assert!(stale.is_none());
        let current = SubscriptionsRepository::find_by_user(&db, "u-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.provider_subscription_id, "sub_new");
        assert_eq!(current.status, "active");
        assert!(SubscriptionsRepository::has_active(&db, "u-1", now).await.unwrap());
    }
}
