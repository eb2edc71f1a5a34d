use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Unit;
use crate::domain::a102_product_category::ProductCategoryId;

crate::uuid_aggregate_id!(ProductId);

/// Товар глобального каталога (не привязан к поставщику)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit: Unit,
    #[serde(rename = "categoryId")]
    pub category_id: Option<ProductCategoryId>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
