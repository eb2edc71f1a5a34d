use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::a101_vendor::VendorId;
use crate::domain::a103_product::ProductId;

crate::uuid_aggregate_id!(VendorProductId);

/// Предложение поставщика по товару, уникально по паре (vendor, product)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProduct {
    pub id: VendorProductId,
    #[serde(rename = "vendorId")]
    pub vendor_id: VendorId,
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    /// Цена в минимальных единицах валюты
    #[serde(rename = "priceCents")]
    pub price_cents: i64,
    #[serde(rename = "inStock")]
    pub in_stock: bool,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "vendorSku")]
    pub vendor_sku: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
