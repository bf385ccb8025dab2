//! 数据传输对象
//!
//! 管理端与读者端接口的请求体。

use crate::entity::chapter_pages::ChapterPages;
use crate::entity::genres::Genres;
use crate::entity::users::Role;
use serde::{Deserialize, Deserializer, Serialize};

/// 用于 `Option<Option<T>>` 字段的辅助函数
/// 区分「字段缺失」和「显式 null」
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 200;

/// `?limit=&offset=` 查询参数
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}

/// `GET /api/manhwa` 查询：标题搜索加分页
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl CatalogQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// ==================== Users ====================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateUserData {
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub username: Option<Option<String>>,
    pub role: Option<Role>,
}

/// 管理员余额调整，`delta` 有符号
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdjustBalanceData {
    pub delta: i64,
    pub reason: Option<String>,
}

// ==================== Catalog ====================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertManhwaData {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    pub genres: Option<Genres>,
}

impl InsertManhwaData {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        validate_slug(&self.slug)?;
        if let Some(status) = &self.status {
            validate_status(status)?;
        }
        Ok(())
    }
}

/// 部分更新，未提供的字段保持不变
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateManhwaData {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cover_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub author: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub genres: Option<Option<Genres>>,
}

impl UpdateManhwaData {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("title must not be empty".to_string());
            }
        }
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        if let Some(status) = &self.status {
            validate_status(status)?;
        }
        Ok(())
    }
}

pub const MANHWA_STATUSES: [&str; 3] = ["ongoing", "completed", "hiatus"];

fn validate_status(status: &str) -> Result<(), String> {
    if MANHWA_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(format!("unknown status: {status}"))
    }
}

fn validate_slug(slug: &str) -> Result<(), String> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(format!("invalid slug: {slug:?}"))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertChapterData {
    pub manhwa_id: i32,
    pub number: i32,
    pub title: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub coin_price: i64,
    pub pages: Option<ChapterPages>,
    pub published_at: Option<i64>,
}

impl InsertChapterData {
    pub fn validate(&self) -> Result<(), String> {
        if self.number < 0 {
            return Err("chapter number must not be negative".to_string());
        }
        if self.coin_price < 0 {
            return Err("coin price must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateChapterData {
    pub number: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    pub is_premium: Option<bool>,
    pub coin_price: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub pages: Option<Option<ChapterPages>>,
    #[serde(default, deserialize_with = "double_option")]
    pub published_at: Option<Option<i64>>,
}

impl UpdateChapterData {
    pub fn validate(&self) -> Result<(), String> {
        if self.number.is_some_and(|n| n < 0) {
            return Err("chapter number must not be negative".to_string());
        }
        if self.coin_price.is_some_and(|p| p < 0) {
            return Err("coin price must not be negative".to_string());
        }
        Ok(())
    }
}

// ==================== Coin packages ====================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertPackageData {
    pub name: String,
    pub coins: i64,
    #[serde(default)]
    pub bonus_coins: i64,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

impl InsertPackageData {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("package name must not be empty".to_string());
        }
        if self.coins <= 0 {
            return Err("package must grant at least one coin".to_string());
        }
        if self.bonus_coins < 0 || self.price_cents < 0 {
            return Err("bonus coins and price must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdatePackageData {
    pub name: Option<String>,
    pub coins: Option<i64>,
    pub bonus_coins: Option<i64>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

impl UpdatePackageData {
    pub fn validate(&self) -> Result<(), String> {
        if self.coins.is_some_and(|c| c <= 0) {
            return Err("package must grant at least one coin".to_string());
        }
        if self.bonus_coins.is_some_and(|c| c < 0) || self.price_cents.is_some_and(|p| p < 0) {
            return Err("bonus coins and price must not be negative".to_string());
        }
        Ok(())
    }
}

// ==================== Reading ====================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordProgressData {
    pub chapter_id: i32,
    pub progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        let absent: UpdateManhwaData = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.description, None);

        let null: UpdateManhwaData = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(null.description, Some(None));

        let set: UpdateManhwaData = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }

    #[test]
    fn pagination_is_clamped() {
        let page = Pagination {
            limit: Some(10_000),
            offset: None,
        };
        assert_eq!(page.limit(), MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 0);
        assert_eq!(Pagination::default().limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn slugs_are_lowercase_words() {
        assert!(validate_slug("solo-leveling-2").is_ok());
        assert!(validate_slug("Solo Leveling").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn packages_must_grant_coins() {
        let package = InsertPackageData {
            name: "Empty".to_string(),
            coins: 0,
            bonus_coins: 0,
            price_cents: 99,
            currency: None,
            is_active: None,
            sort_order: None,
        };
        assert!(package.validate().is_err());
    }
}
