use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ImportBatch, ImportBatchId, ImportBatchStatus};
use crate::domain::a103_product::ProductId;
use crate::domain::a104_vendor_product::VendorProductId;

/// Запрос на создание партии
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateImportBatchDto {
    /// Обязателен для администратора; поставщик всегда создает партию для себя
    pub vendor_id: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResponse {
    pub id: ImportBatchId,
    pub status: ImportBatchStatus,
    #[serde(rename = "rowCount")]
    pub row_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub id: ImportBatchId,
    pub status: ImportBatchStatus,
    #[serde(rename = "rowCount")]
    pub row_count: i32,
    #[serde(rename = "errorCount")]
    pub error_count: i32,
}

/// Режим фиксации партии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Все строки должны быть VALID
    All,
    /// Строки с ошибками помечаются SKIPPED, фиксируются только VALID
    ValidOnly,
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitMode::All => "all",
            CommitMode::ValidOnly => "valid_only",
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CommitMode::All),
            "valid_only" => Ok(CommitMode::ValidOnly),
            other => Err(format!(
                "Invalid commit mode '{}', expected 'all' or 'valid_only'",
                other
            )),
        }
    }
}

/// Результат фиксации одной строки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    #[serde(rename = "rowIndex")]
    pub row_index: i32,
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    #[serde(rename = "vendorProductId")]
    pub vendor_product_id: VendorProductId,
    /// true - товар создан, false - использован существующий
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSummary {
    pub id: ImportBatchId,
    pub status: ImportBatchStatus,
    #[serde(rename = "committedRows")]
    pub committed_rows: i32,
    #[serde(rename = "newProducts")]
    pub new_products: i32,
    #[serde(rename = "updatedProducts")]
    pub updated_products: i32,
}

impl CommitSummary {
    pub fn from_results(id: ImportBatchId, results: &[CommitResult]) -> Self {
        let new_products = results.iter().filter(|r| r.created).count() as i32;
        let committed_rows = results.len() as i32;
        Self {
            id,
            status: ImportBatchStatus::Committed,
            committed_rows,
            new_products,
            updated_products: committed_rows - new_products,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStatusCounts {
    pub pending: i32,
    pub valid: i32,
    pub error: i32,
    pub committed: i32,
    pub skipped: i32,
}

/// Карточка партии для дашборда
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatchDetail {
    #[serde(flatten)]
    pub batch: ImportBatch,
    #[serde(rename = "rowCounts")]
    pub row_counts: RowStatusCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_mode_parse() {
        assert_eq!("all".parse::<CommitMode>().unwrap(), CommitMode::All);
        assert_eq!(
            "valid_only".parse::<CommitMode>().unwrap(),
            CommitMode::ValidOnly
        );
        assert!("ALL".parse::<CommitMode>().is_err());
        assert!("".parse::<CommitMode>().is_err());
    }

    #[test]
    fn test_summary_counts_new_and_updated_products() {
        let id = ImportBatchId::new_v4();
        let product = ProductId::new_v4();
        let results = vec![
            CommitResult {
                row_index: 0,
                product_id: product,
                vendor_product_id: VendorProductId::new_v4(),
                created: true,
            },
            CommitResult {
                row_index: 1,
                product_id: product,
                vendor_product_id: VendorProductId::new_v4(),
                created: false,
            },
        ];
        let summary = CommitSummary::from_results(id, &results);
        assert_eq!(summary.committed_rows, 2);
        assert_eq!(summary.new_products, 1);
        assert_eq!(summary.updated_products, 1);
        assert_eq!(summary.status, ImportBatchStatus::Committed);
    }
}
