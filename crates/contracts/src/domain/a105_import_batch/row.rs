use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::ImportBatchId;
use crate::domain::a103_product::{ProductId, Unit};
use crate::domain::a104_vendor_product::VendorProductId;

crate::uuid_aggregate_id!(ImportBatchRowId);

/// Сырые поля строки CSV: заголовок -> значение, без интерпретации
pub type RawRow = BTreeMap<String, String>;

/// Статус строки партии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    Pending,
    Valid,
    Error,
    Committed,
    Skipped,
}

impl RowStatus {
    pub const ALL: [RowStatus; 5] = [
        RowStatus::Pending,
        RowStatus::Valid,
        RowStatus::Error,
        RowStatus::Committed,
        RowStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Pending => "PENDING",
            RowStatus::Valid => "VALID",
            RowStatus::Error => "ERROR",
            RowStatus::Committed => "COMMITTED",
            RowStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RowStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown row status: {}", s))
    }
}

/// Каноническая форма строки после нормализации
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub name: String,
    pub category: Option<String>,
    pub unit: Unit,
    #[serde(rename = "priceCents")]
    pub price_cents: i64,
    #[serde(rename = "inStock")]
    pub in_stock: bool,
    #[serde(rename = "vendorSku")]
    pub vendor_sku: Option<String>,
}

/// Ошибка валидации конкретного поля
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub field: String,
    pub message: String,
}

impl RowError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Строка партии импорта
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatchRow {
    pub id: ImportBatchRowId,
    #[serde(rename = "batchId")]
    pub batch_id: ImportBatchId,
    /// Порядковый номер строки без учета заголовка и пустых строк (с нуля)
    #[serde(rename = "rowIndex")]
    pub row_index: i32,
    #[serde(rename = "rawData")]
    pub raw_data: RawRow,
    #[serde(rename = "normalizedData")]
    pub normalized_data: Option<NormalizedRow>,
    pub status: RowStatus,
    pub errors: Vec<RowError>,
    #[serde(rename = "productId")]
    pub product_id: Option<ProductId>,
    #[serde(rename = "vendorProductId")]
    pub vendor_product_id: Option<VendorProductId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_display() {
        let e = RowError::new("name", "name required");
        assert_eq!(e.to_string(), "name: name required");
    }
}
