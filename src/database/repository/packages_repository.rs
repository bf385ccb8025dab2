use crate::database::dto::{InsertPackageData, UpdatePackageData};
use crate::entity::coin_packages;
use crate::entity::prelude::*;
use sea_orm::*;

/// 金币套餐仓库
pub struct PackagesRepository;

impl PackagesRepository {
    pub async fn insert(
        db: &DatabaseConnection,
        data: InsertPackageData,
    ) -> Result<coin_packages::Model, DbErr> {
        let now = chrono::Utc::now().timestamp();

        let package = coin_packages::ActiveModel {
            id: NotSet,
            name: Set(data.name),
            coins: Set(data.coins),
            bonus_coins: Set(data.bonus_coins),
            price_cents: Set(data.price_cents),
            currency: Set(data
                .currency
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "usd".to_string())),
            is_active: Set(data.is_active.unwrap_or(true)),
            sort_order: Set(data.sort_order.unwrap_or(0)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        package.insert(db).await
    }

    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        updates: UpdatePackageData,
    ) -> Result<coin_packages::Model, DbErr> {
        let package = coin_packages::ActiveModel {
            id: Unchanged(id),
            name: updates.name.map_or(NotSet, Set),
            coins: updates.coins.map_or(NotSet, Set),
            bonus_coins: updates.bonus_coins.map_or(NotSet, Set),
            price_cents: updates.price_cents.map_or(NotSet, Set),
            currency: updates
                .currency
                .map(|c| c.to_lowercase())
                .map_or(NotSet, Set),
            is_active: updates.is_active.map_or(NotSet, Set),
            sort_order: updates.sort_order.map_or(NotSet, Set),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        package.update(db).await
    }

    pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<DeleteResult, DbErr> {
        CoinPackages::delete_by_id(id).exec(db).await
    }

    pub async fn find_by_id<C>(db: &C, id: i32) -> Result<Option<coin_packages::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        CoinPackages::find_by_id(id).one(db).await
    }

    /// 商店在售套餐，按展示顺序
    pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<coin_packages::Model>, DbErr> {
        CoinPackages::find()
            .filter(coin_packages::Column::IsActive.eq(true))
            .order_by_asc(coin_packages::Column::SortOrder)
            .order_by_asc(coin_packages::Column::PriceCents)
            .all(db)
            .await
    }

    pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<coin_packages::Model>, DbErr> {
        CoinPackages::find()
            .order_by_asc(coin_packages::Column::SortOrder)
            .order_by_asc(coin_packages::Column::Id)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::test_connection;

    fn package(name: &str, sort_order: i32, active: bool) -> InsertPackageData {
        InsertPackageData {
            name: name.to_string(),
            coins: 100,
            bonus_coins: 10,
            price_cents: 499,
            currency: Some("USD".to_string()),
            is_active: Some(active),
            sort_order: Some(sort_order),
        }
    }

    #[tokio::test]
    async fn list_active_hides_retired_packages() {
        let db = test_connection().await;
        PackagesRepository::insert(&db, package("Large", 2, true))
            .await
            .unwrap();
        PackagesRepository::insert(&db, package("Small", 1, true))
            .await
            .unwrap();
        PackagesRepository::insert(&db, package("Retired", 0, false))
            .await
            .unwrap();

        let names: Vec<String> = PackagesRepository::list_active(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();

        assert_eq!(names, vec!["Small", "Large"]);
        assert_eq!(PackagesRepository::list_all(&db).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn currency_is_normalized() {
        let db = test_connection().await;
        let created = PackagesRepository::insert(&db, package("Small", 1, true))
            .await
            .unwrap();
        assert_eq!(created.currency, "usd");
        assert_eq!(created.total_coins(), 110);
    }
}
