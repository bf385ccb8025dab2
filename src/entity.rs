//! 数据实体
//!
//! SeaORM 实体定义，每张表一个，以及存放在文本列中的 JSON 类型。

pub mod prelude;

// === JSON 列类型 ===
pub mod chapter_pages;
pub mod genres;
pub mod transaction_metadata;

// === SeaORM 实体 ===
pub mod chapters;
pub mod coin_packages;
pub mod coin_transactions;
pub mod manhwa;
pub mod reading_history;
pub mod subscriptions;
pub mod user_chapter_purchases;
pub mod users;
