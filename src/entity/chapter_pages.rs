//! 章节页面列表
//!
//! 存放在 `chapters.pages`，只返回给有阅读权限的读者。

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// 组成章节的有序图片 URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ChapterPages(pub Vec<String>);

impl ChapterPages {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
