use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// 作品类型标签，以 JSON 数组存放在 `manhwa.genres`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Genres(pub Vec<String>);
