pub mod chapters_repository;
pub mod ledger_repository;
pub mod manhwa_repository;
pub mod packages_repository;
pub mod purchases_repository;
pub mod reading_history_repository;
pub mod subscriptions_repository;
pub mod users_repository;
