//! 账本行元数据
//!
//! 附加在 `coin_transactions` 行上的上下文。所有字段可选，
//! 只写入与该行类型相关的字段。

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, FromJsonQueryResult)]
#[serde(default)]
pub struct TransactionMetadata {
    /// 解锁或退款的章节
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<i32>,

    /// 章节所属作品
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manhwa_id: Option<i32>,

    /// 购买的金币套餐
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<i32>,

    /// 支付方收取的金额，以最小货币单位计
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_paid_cents: Option<i64>,

    /// 操作的管理员
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
}
