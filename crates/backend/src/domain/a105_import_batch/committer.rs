use async_trait::async_trait;
use contracts::domain::a101_vendor::VendorId;
use contracts::domain::a103_product::ProductId;
use contracts::domain::a104_vendor_product::VendorProductId;
use contracts::domain::a105_import_batch::{CommitResult, ImportBatchRow, NormalizedRow};
use sea_orm::{DatabaseTransaction, DbErr};

use super::error::{ImportError, ImportResult};
use super::repository;
use crate::domain::a102_product_category::repository as category_repository;
use crate::domain::a103_product::repository as product_repository;
use crate::domain::a104_vendor_product::repository::{self as vendor_product_repository, Offer};

/// Операции каталога, которые нужны фиксации партии.
/// Все вызовы выполняются внутри транзакции фиксации.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Найти товар по точному имени или создать его; `true` если создан
    async fn find_or_create_product(
        &self,
        txn: &DatabaseTransaction,
        row: &NormalizedRow,
    ) -> Result<(ProductId, bool), DbErr>;

    /// Создать или перезаписать предложение поставщика по (vendor, product)
    async fn upsert_vendor_product(
        &self,
        txn: &DatabaseTransaction,
        vendor_id: VendorId,
        product_id: ProductId,
        row: &NormalizedRow,
    ) -> Result<VendorProductId, DbErr>;
}

/// Каталог в той же SQLite базе
pub struct SeaOrmCatalog;

#[async_trait]
impl CatalogWriter for SeaOrmCatalog {
    async fn find_or_create_product(
        &self,
        txn: &DatabaseTransaction,
        row: &NormalizedRow,
    ) -> Result<(ProductId, bool), DbErr> {
        if let Some(existing) = product_repository::find_by_name(txn, &row.name).await? {
            return Ok((existing.id, false));
        }
        let category_id = match row.category.as_deref() {
            Some(label) => category_repository::find_or_create_by_label(txn, label).await?,
            None => None,
        };
        let id = product_repository::insert(txn, &row.name, row.unit, category_id).await?;
        Ok((id, true))
    }

    async fn upsert_vendor_product(
        &self,
        txn: &DatabaseTransaction,
        vendor_id: VendorId,
        product_id: ProductId,
        row: &NormalizedRow,
    ) -> Result<VendorProductId, DbErr> {
        let offer = Offer {
            price_cents: row.price_cents,
            in_stock: row.in_stock,
            vendor_sku: row.vendor_sku.clone(),
        };
        match vendor_product_repository::find_by_vendor_and_product(txn, vendor_id, product_id)
            .await?
        {
            Some(existing) => {
                vendor_product_repository::update_offer(txn, existing.id, &offer).await?;
                Ok(existing.id)
            }
            None => vendor_product_repository::insert(txn, vendor_id, product_id, &offer).await,
        }
    }
}

/// Записать VALID строки в каталог строго по порядку row_index.
/// Любая ошибка прерывает цикл; откат выполняет вызывающая транзакция.
pub async fn commit_rows(
    txn: &DatabaseTransaction,
    catalog: &dyn CatalogWriter,
    vendor_id: VendorId,
    rows: &[ImportBatchRow],
) -> ImportResult<Vec<CommitResult>> {
    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        let normalized = row.normalized_data.as_ref().ok_or_else(|| {
            ImportError::CommitFailed(format!("row {} has no normalized data", row.row_index))
        })?;

        let (product_id, created) = catalog
            .find_or_create_product(txn, normalized)
            .await
            .map_err(|e| row_failure(row.row_index, e))?;
        let vendor_product_id = catalog
            .upsert_vendor_product(txn, vendor_id, product_id, normalized)
            .await
            .map_err(|e| row_failure(row.row_index, e))?;
        repository::mark_row_committed(txn, row.id, product_id, vendor_product_id)
            .await
            .map_err(|e| row_failure(row.row_index, e))?;

        results.push(CommitResult {
            row_index: row.row_index,
            product_id,
            vendor_product_id,
            created,
        });
    }
    Ok(results)
}

fn row_failure(row_index: i32, e: DbErr) -> ImportError {
    ImportError::CommitFailed(format!("row {}: {}", row_index, e))
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Пропускает `allowed` upsert-ов, затем падает
    pub struct FailAfter {
        inner: SeaOrmCatalog,
        allowed: usize,
        calls: AtomicUsize,
    }

    impl FailAfter {
        pub fn new(allowed: usize) -> Self {
            Self {
                inner: SeaOrmCatalog,
                allowed,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogWriter for FailAfter {
        async fn find_or_create_product(
            &self,
            txn: &DatabaseTransaction,
            row: &NormalizedRow,
        ) -> Result<(ProductId, bool), DbErr> {
            self.inner.find_or_create_product(txn, row).await
        }

        async fn upsert_vendor_product(
            &self,
            txn: &DatabaseTransaction,
            vendor_id: VendorId,
            product_id: ProductId,
            row: &NormalizedRow,
        ) -> Result<VendorProductId, DbErr> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allowed {
                return Err(DbErr::Custom("injected catalog failure".to_string()));
            }
            self.inner
                .upsert_vendor_product(txn, vendor_id, product_id, row)
                .await
        }
    }
}
