//! 金币账本服务
//!
//! 所有涉及金币变动或章节解锁的操作都在这里，每个操作在一个数据库事务中完成：
//! 余额更新、账本行与解锁记录要么一起提交，要么全部回滚。
//! 处理函数不直接写 `users.coins`、`coin_transactions` 或 `user_chapter_purchases`。
//!
//! 约束：
//! - 扣款为条件 UPDATE（`coins >= price`），并有 CHECK 约束兜底
//! - 解锁记录按 (user, chapter) 唯一，并发竞争失败的一方回滚扣款
//! - 支付入账以唯一的 `reference` 作为幂等键

use sea_orm::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::repository::{
    chapters_repository::ChaptersRepository,
    ledger_repository::{LedgerRepository, NewLedgerEntry},
    purchases_repository::PurchasesRepository,
    subscriptions_repository::SubscriptionsRepository,
    users_repository::UsersRepository,
};
use crate::entity::coin_transactions::TransactionKind;
use crate::entity::transaction_metadata::TransactionMetadata;
use crate::entity::user_chapter_purchases::EntitlementSource;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Chapter {0} not found")]
    ChapterNotFound(i32),

    #[error("User {user_id} does not own chapter {chapter_id}")]
    EntitlementNotFound { user_id: String, chapter_id: i32 },

    #[error("Insufficient coins: {required} required, {balance} available")]
    InsufficientCoins { required: i64, balance: i64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error(transparent)]
    Database(#[from] DbErr),
}

// ==================== Outcomes ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    /// 已扣款并解锁章节
    Purchased { balance: i64, transaction_id: i32 },
    /// 用户已拥有该章节，未扣款
    AlreadyOwned { balance: i64 },
    /// 免费章节，未扣款
    NotRequired { balance: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreditOutcome {
    Credited { balance: i64, transaction_id: i32 },
    /// 该凭证已入账
    Duplicate { balance: i64 },
}

impl CreditOutcome {
    pub fn balance(&self) -> i64 {
        match self {
            CreditOutcome::Credited { balance, .. } | CreditOutcome::Duplicate { balance } => {
                *balance
            }
        }
    }
}

/// 幂等入账请求，例如已完成的支付
#[derive(Debug, Clone)]
pub struct CreditRequest {
    pub user_id: String,
    pub amount: i64,
    pub kind: TransactionKind,
    pub reference: String,
    pub description: Option<String>,
    pub metadata: Option<TransactionMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    Free,
    Purchased,
    Subscription,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterAccess {
    pub chapter_id: i32,
    pub has_access: bool,
    pub reason: AccessReason,
    pub coin_price: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub user_id: String,
    pub balance: i64,
    pub ledger_total: i64,
    pub consistent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub balance: i64,
    pub transaction_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResult {
    pub balance: i64,
    pub coins_refunded: i64,
    pub transaction_id: Option<i32>,
}

pub struct CoinLedger;

impl CoinLedger {
    // ==================== Chapter unlock ====================

    /// 使用金币解锁付费章节
    pub async fn purchase_chapter(
        db: &DatabaseConnection,
        user_id: &str,
        chapter_id: i32,
    ) -> Result<PurchaseOutcome, LedgerError> {
        let txn = db.begin().await?;

        // 1. 账户与章节
        UsersRepository::ensure_exists(&txn, user_id).await?;
        let chapter = ChaptersRepository::find_by_id(&txn, chapter_id)
            .await?
            .ok_or(LedgerError::ChapterNotFound(chapter_id))?;

        if !chapter.requires_unlock() {
            let balance = current_balance(&txn, user_id).await?;
            txn.commit().await?;
            return Ok(PurchaseOutcome::NotRequired { balance });
        }

        // 2. 不重复扣款
        if PurchasesRepository::find(&txn, user_id, chapter_id)
            .await?
            .is_some()
        {
            let balance = current_balance(&txn, user_id).await?;
            txn.commit().await?;
            return Ok(PurchaseOutcome::AlreadyOwned { balance });
        }

        // 3. 条件扣款
        let price = chapter.coin_price;
        if !UsersRepository::debit(&txn, user_id, price).await? {
            let balance = current_balance(&txn, user_id).await?;
            log::info!(
                "章节 {} 购买被拒绝，用户 {}：余额 {} < 价格 {}",
                chapter_id,
                user_id,
                balance,
                price
            );
            return Err(LedgerError::InsufficientCoins {
                required: price,
                balance,
            });
        }
        let balance = current_balance(&txn, user_id).await?;

        // 4. 解锁记录；并发购买以先写入者为准
        if let Err(e) =
            PurchasesRepository::insert(&txn, user_id, chapter_id, price, EntitlementSource::Coins)
                .await
        {
            if is_unique_violation(&e) {
                txn.rollback().await?;
                let balance = current_balance(db, user_id).await?;
                return Ok(PurchaseOutcome::AlreadyOwned { balance });
            }
            return Err(e.into());
        }

        // 5. 账本行
        let entry = LedgerRepository::insert(
            &txn,
            NewLedgerEntry {
                user_id: user_id.to_string(),
                amount: -price,
                balance_after: balance,
                kind: TransactionKind::ChapterUnlock,
                description: Some(match &chapter.title {
                    Some(title) => format!("Unlocked chapter {}: {}", chapter.number, title),
                    None => format!("Unlocked chapter {}", chapter.number),
                }),
                reference: None,
                metadata: Some(TransactionMetadata {
                    chapter_id: Some(chapter.id),
                    manhwa_id: Some(chapter.manhwa_id),
                    ..Default::default()
                }),
            },
        )
        .await?;

        txn.commit().await?;

        log::info!(
            "用户 {} 解锁章节 {}，花费 {} 金币，余额 {}",
            user_id,
            chapter_id,
            price,
            balance
        );

        Ok(PurchaseOutcome::Purchased {
            balance,
            transaction_id: entry.id,
        })
    }

    // ==================== Credits ====================

    /// 按 `reference` 入账，同一凭证只入账一次
    pub async fn credit_coins(
        db: &DatabaseConnection,
        request: CreditRequest,
    ) -> Result<CreditOutcome, LedgerError> {
        if request.amount <= 0 {
            return Err(LedgerError::InvalidAmount(request.amount));
        }

        let txn = db.begin().await?;

        UsersRepository::ensure_exists(&txn, &request.user_id).await?;

        if LedgerRepository::find_by_reference(&txn, &request.reference)
            .await?
            .is_some()
        {
            let balance = current_balance(&txn, &request.user_id).await?;
            txn.commit().await?;
            log::info!("凭证 {} 已入账，跳过", request.reference);
            return Ok(CreditOutcome::Duplicate { balance });
        }

        ensure_headroom(&txn, &request.user_id, request.amount).await?;
        if !UsersRepository::credit(&txn, &request.user_id, request.amount).await? {
            return Err(LedgerError::UserNotFound(request.user_id));
        }
        let balance = current_balance(&txn, &request.user_id).await?;

        let inserted = LedgerRepository::insert(
            &txn,
            NewLedgerEntry {
                user_id: request.user_id.clone(),
                amount: request.amount,
                balance_after: balance,
                kind: request.kind,
                description: request.description,
                reference: Some(request.reference.clone()),
                metadata: request.metadata,
            },
        )
        .await;

        let entry = match inserted {
            Ok(entry) => entry,
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                let balance = current_balance(db, &request.user_id).await?;
                return Ok(CreditOutcome::Duplicate { balance });
            }
            Err(e) => return Err(e.into()),
        };

        txn.commit().await?;

        log::info!(
            "入账 {} 金币到用户 {}（凭证 {}），余额 {}",
            request.amount,
            request.user_id,
            request.reference,
            balance
        );

        Ok(CreditOutcome::Credited {
            balance,
            transaction_id: entry.id,
        })
    }

    // ==================== Admin operations ====================

    /// 有符号的手动调整，余额不会变为负数
    pub async fn adjust_balance(
        db: &DatabaseConnection,
        user_id: &str,
        delta: i64,
        reason: Option<String>,
        admin_id: &str,
    ) -> Result<AdjustmentResult, LedgerError> {
        // i64::MIN 没有对应的正数
        let magnitude = delta
            .checked_abs()
            .filter(|m| *m > 0)
            .ok_or(LedgerError::InvalidAmount(delta))?;

        let txn = db.begin().await?;

        if UsersRepository::find_by_id(&txn, user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id.to_string()));
        }

        let applied = if delta > 0 {
            ensure_headroom(&txn, user_id, magnitude).await?;
            UsersRepository::credit(&txn, user_id, magnitude).await?
        } else {
            UsersRepository::debit(&txn, user_id, magnitude).await?
        };
        if !applied {
            let balance = current_balance(&txn, user_id).await?;
            return Err(LedgerError::InsufficientCoins {
                required: magnitude,
                balance,
            });
        }
        let balance = current_balance(&txn, user_id).await?;

        let entry = LedgerRepository::insert(
            &txn,
            NewLedgerEntry {
                user_id: user_id.to_string(),
                amount: delta,
                balance_after: balance,
                kind: TransactionKind::AdminAdjustment,
                description: reason.or_else(|| Some("Manual balance adjustment".to_string())),
                reference: None,
                metadata: Some(TransactionMetadata {
                    admin_id: Some(admin_id.to_string()),
                    ..Default::default()
                }),
            },
        )
        .await?;

        txn.commit().await?;

        log::warn!(
            "管理员 {} 调整用户 {} 的余额 {}，余额 {}",
            admin_id,
            user_id,
            delta,
            balance
        );

        Ok(AdjustmentResult {
            balance,
            transaction_id: entry.id,
        })
    }

    /// 免费授予章节。用户已拥有时返回 false
    pub async fn grant_chapter(
        db: &DatabaseConnection,
        user_id: &str,
        chapter_id: i32,
    ) -> Result<bool, LedgerError> {
        let txn = db.begin().await?;

        if UsersRepository::find_by_id(&txn, user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id.to_string()));
        }
        if ChaptersRepository::find_by_id(&txn, chapter_id)
            .await?
            .is_none()
        {
            return Err(LedgerError::ChapterNotFound(chapter_id));
        }
        if PurchasesRepository::find(&txn, user_id, chapter_id)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        match PurchasesRepository::insert(&txn, user_id, chapter_id, 0, EntitlementSource::AdminGrant)
            .await
        {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        txn.commit().await?;
        Ok(true)
    }

    /// 撤销解锁并退还所花金币
    pub async fn refund_chapter(
        db: &DatabaseConnection,
        user_id: &str,
        chapter_id: i32,
        admin_id: &str,
    ) -> Result<RefundResult, LedgerError> {
        let txn = db.begin().await?;

        let entitlement = PurchasesRepository::find(&txn, user_id, chapter_id)
            .await?
            .ok_or_else(|| LedgerError::EntitlementNotFound {
                user_id: user_id.to_string(),
                chapter_id,
            })?;

        PurchasesRepository::delete(&txn, entitlement.id).await?;

        let coins = entitlement.coins_spent;
        let transaction_id = if coins > 0 {
            ensure_headroom(&txn, user_id, coins).await?;
            if !UsersRepository::credit(&txn, user_id, coins).await? {
                return Err(LedgerError::UserNotFound(user_id.to_string()));
            }
            let balance = current_balance(&txn, user_id).await?;

            let entry = LedgerRepository::insert(
                &txn,
                NewLedgerEntry {
                    user_id: user_id.to_string(),
                    amount: coins,
                    balance_after: balance,
                    kind: TransactionKind::Refund,
                    description: Some(format!("Refund for chapter {}", chapter_id)),
                    reference: None,
                    metadata: Some(TransactionMetadata {
                        chapter_id: Some(chapter_id),
                        admin_id: Some(admin_id.to_string()),
                        ..Default::default()
                    }),
                },
            )
            .await?;
            Some(entry.id)
        } else {
            None
        };

        let balance = current_balance(&txn, user_id).await?;
        txn.commit().await?;

        log::warn!(
            "管理员 {} 撤销章节 {}，用户 {}，退还 {} 金币",
            admin_id,
            chapter_id,
            user_id,
            coins
        );

        Ok(RefundResult {
            balance,
            coins_refunded: coins,
            transaction_id,
        })
    }

    // ==================== Reads ====================

    /// 用户能否阅读章节及原因
    pub async fn chapter_access(
        db: &DatabaseConnection,
        user_id: &str,
        chapter_id: i32,
    ) -> Result<ChapterAccess, LedgerError> {
        let chapter = ChaptersRepository::find_by_id(db, chapter_id)
            .await?
            .ok_or(LedgerError::ChapterNotFound(chapter_id))?;
        let balance = UsersRepository::balance(db, user_id).await?.unwrap_or(0);

        let reason = if !chapter.requires_unlock() {
            AccessReason::Free
        } else if PurchasesRepository::find(db, user_id, chapter_id)
            .await?
            .is_some()
        {
            AccessReason::Purchased
        } else if SubscriptionsRepository::has_active(db, user_id, chrono::Utc::now().timestamp())
            .await?
        {
            AccessReason::Subscription
        } else {
            AccessReason::Locked
        };

        Ok(ChapterAccess {
            chapter_id,
            has_access: reason != AccessReason::Locked,
            reason,
            coin_price: chapter.coin_price,
            balance,
        })
    }

    /// 对比余额与账本合计
    pub async fn audit_balance(
        db: &DatabaseConnection,
        user_id: &str,
    ) -> Result<BalanceAudit, LedgerError> {
        let balance = UsersRepository::balance(db, user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;
        let ledger_total = LedgerRepository::sum_by_user(db, user_id).await?;

        if balance != ledger_total {
            log::error!(
                "用户 {} 的余额 ({}) 与账本合计 ({}) 不一致",
                user_id,
                balance,
                ledger_total
            );
        }

        Ok(BalanceAudit {
            user_id: user_id.to_string(),
            balance,
            ledger_total,
            consistent: balance == ledger_total,
        })
    }
}

async fn current_balance<C>(db: &C, user_id: &str) -> Result<i64, LedgerError>
where
    C: ConnectionTrait,
{
    UsersRepository::balance(db, user_id)
        .await?
        .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))
}

/// 余额为 INTEGER 列，溢出时 SQLite 会静默存为 REAL
async fn ensure_headroom<C>(db: &C, user_id: &str, amount: i64) -> Result<(), LedgerError>
where
    C: ConnectionTrait,
{
    match UsersRepository::balance(db, user_id).await? {
        Some(balance) if balance.checked_add(amount).is_none() => {
            Err(LedgerError::InvalidAmount(amount))
        }
        _ => Ok(()),
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
