//! 实体类型的快捷导入

pub use super::chapters::Entity as Chapters;
pub use super::coin_packages::Entity as CoinPackages;
pub use super::coin_transactions::Entity as CoinTransactions;
pub use super::manhwa::Entity as Manhwa;
pub use super::reading_history::Entity as ReadingHistory;
pub use super::subscriptions::Entity as Subscriptions;
pub use super::user_chapter_purchases::Entity as UserChapterPurchases;
pub use super::users::Entity as Users;
