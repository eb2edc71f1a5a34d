use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::uuid_aggregate_id!(ProductCategoryId);

/// Категория каталога, уникальная по slug
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: ProductCategoryId,
    pub slug: String,
    pub description: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
