use chrono::Utc;
use contracts::domain::a101_vendor::VendorId;
use contracts::domain::a105_import_batch::{
    CommitMode, CommitResult, CommitSummary, CreateImportBatchDto, ImportBatch, ImportBatchDetail,
    ImportBatchId, ImportBatchRow, ImportBatchStatus, ParseResponse, PipelineOperation,
    RowStatus, ValidateResponse,
};
use contracts::system::audit::{AuditEntry, AuditLogRecord};
use contracts::system::auth::{Actor, UserRole};
use once_cell::sync::OnceCell;
use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::committer::{self, CatalogWriter, SeaOrmCatalog};
use super::csv_parser;
use super::error::{ImportError, ImportResult};
use super::normalizer;
use super::repository::{self, BatchFilter, NewRow, RowQuery};
use super::validator;
use crate::domain::a101_vendor::repository as vendor_repository;
use crate::shared::audit::{self, repository as audit_repository, AuditSink};
use crate::shared::config::ImportConfig;

const ENTITY_TYPE: &str = "import_batch";

static SERVICE: OnceCell<ImportBatchService> = OnceCell::new();

/// Зарегистрировать сервис для HTTP-обработчиков
pub fn install(service: ImportBatchService) -> anyhow::Result<()> {
    SERVICE
        .set(service)
        .map_err(|_| anyhow::anyhow!("Import batch service is already installed"))
}

pub fn global() -> ImportResult<&'static ImportBatchService> {
    SERVICE.get().ok_or_else(|| {
        ImportError::Database(DbErr::Custom(
            "Import batch service has not been initialized".to_string(),
        ))
    })
}

/// Жизненный цикл партии импорта: DRAFT -> ... -> COMMITTED | FAILED
pub struct ImportBatchService {
    db: DatabaseConnection,
    audit: Arc<dyn AuditSink>,
    catalog: Arc<dyn CatalogWriter>,
    settings: ImportConfig,
}

impl ImportBatchService {
    pub fn new(db: DatabaseConnection, audit: Arc<dyn AuditSink>, settings: ImportConfig) -> Self {
        Self {
            db,
            audit,
            catalog: Arc::new(SeaOrmCatalog),
            settings,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogWriter>) -> Self {
        self.catalog = catalog;
        self
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub async fn create_batch(
        &self,
        actor: &Actor,
        dto: CreateImportBatchDto,
    ) -> ImportResult<ImportBatch> {
        let vendor_id = resolve_vendor(actor, dto.vendor_id.as_deref())?;
        if vendor_repository::get_by_id(&self.db, vendor_id.value())
            .await?
            .is_none()
        {
            return Err(ImportError::NotFound(format!(
                "Vendor {} not found",
                vendor_id.value()
            )));
        }

        let batch = ImportBatch::new_for_insert(vendor_id, actor.user_id.clone(), dto.filename);
        repository::insert_batch(&self.db, &batch).await?;
        tracing::info!(
            "Import batch {} created for vendor {} by {}",
            batch.id.value(),
            vendor_id.value(),
            actor.user_id
        );
        self.audit(
            actor,
            batch.id,
            "CREATED",
            json!({ "vendorId": vendor_id, "filename": batch.filename }),
        )
        .await;
        Ok(batch)
    }

    /// DRAFT -> PARSING -> PARSED | FAILED
    pub async fn parse(
        &self,
        actor: &Actor,
        id: ImportBatchId,
        csv_text: &str,
    ) -> ImportResult<ParseResponse> {
        let batch = self.load_authorized(actor, id).await?;
        self.acquire(actor, &batch, PipelineOperation::Parse).await?;
        let started = Instant::now();

        let parsed = match csv_parser::parse(csv_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Import batch {} parse failed: {}", id.value(), e);
                self.fail(actor, id, ImportBatchStatus::Parsing, &e.to_string())
                    .await;
                return Err(e.into());
            }
        };

        let rows: Vec<NewRow> = parsed
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, raw)| NewRow {
                row_index: index as i32,
                normalized_data: normalizer::normalize(&raw),
                raw_data: raw,
            })
            .collect();
        let row_count = rows.len() as i32;

        if let Err(e) = self.store_parsed(id, &parsed.columns, &rows).await {
            tracing::error!("Import batch {} failed to store rows: {}", id.value(), e);
            self.fail(actor, id, ImportBatchStatus::Parsing, &e.to_string())
                .await;
            return Err(e);
        }

        tracing::info!(
            "Import batch {} parsed: {} rows in {:?}",
            id.value(),
            row_count,
            started.elapsed()
        );
        self.audit(
            actor,
            id,
            PipelineOperation::Parse.success().as_str(),
            json!({ "rowCount": row_count, "columns": parsed.columns }),
        )
        .await;

        Ok(ParseResponse {
            id,
            status: PipelineOperation::Parse.success(),
            row_count,
        })
    }

    async fn store_parsed(
        &self,
        id: ImportBatchId,
        columns: &[String],
        rows: &[NewRow],
    ) -> ImportResult<()> {
        let txn = self.db.begin().await?;
        repository::claim_for_write(&txn, id, ImportBatchStatus::Parsing).await?;
        let removed = repository::delete_rows(&txn, id).await?;
        if removed > 0 {
            tracing::debug!("Import batch {}: removed {} previous rows", id.value(), removed);
        }
        repository::insert_rows(&txn, id, rows).await?;
        repository::complete_parse(&txn, id, columns, rows.len() as i32).await?;
        txn.commit().await?;
        Ok(())
    }

    /// PARSED -> VALIDATING -> VALIDATED | FAILED
    pub async fn validate(&self, actor: &Actor, id: ImportBatchId) -> ImportResult<ValidateResponse> {
        let batch = self.load_authorized(actor, id).await?;
        self.acquire(actor, &batch, PipelineOperation::Validate)
            .await?;
        let started = Instant::now();

        let (row_count, error_count) = match self.store_verdicts(id).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::error!("Import batch {} validation failed: {}", id.value(), e);
                self.fail(actor, id, ImportBatchStatus::Validating, &e.to_string())
                    .await;
                return Err(e);
            }
        };

        tracing::info!(
            "Import batch {} validated: {} rows, {} with errors in {:?}",
            id.value(),
            row_count,
            error_count,
            started.elapsed()
        );
        self.audit(
            actor,
            id,
            PipelineOperation::Validate.success().as_str(),
            json!({ "rowCount": row_count, "errorCount": error_count }),
        )
        .await;

        Ok(ValidateResponse {
            id,
            status: PipelineOperation::Validate.success(),
            row_count,
            error_count,
        })
    }

    async fn store_verdicts(&self, id: ImportBatchId) -> ImportResult<(i32, i32)> {
        let txn = self.db.begin().await?;
        repository::claim_for_write(&txn, id, ImportBatchStatus::Validating).await?;
        let rows = repository::list_rows_with_status(&txn, id, &[RowStatus::Pending]).await?;
        let mut error_count = 0;
        for row in &rows {
            let verdict = validator::validate_row(row.normalized_data.as_ref());
            if verdict.status == RowStatus::Error {
                error_count += 1;
            }
            repository::set_row_verdict(&txn, row.id, verdict.status, &verdict.errors).await?;
        }
        repository::complete_validate(&txn, id, error_count).await?;
        txn.commit().await?;
        Ok((rows.len() as i32, error_count))
    }

    /// VALIDATED -> COMMITTING -> COMMITTED | FAILED
    pub async fn commit_batch(
        &self,
        actor: &Actor,
        id: ImportBatchId,
        mode: CommitMode,
    ) -> ImportResult<CommitSummary> {
        let batch = self.load_authorized(actor, id).await?;
        if batch.status != ImportBatchStatus::Validated {
            return Err(wrong_state(&batch, ImportBatchStatus::Validated));
        }
        if mode == CommitMode::All && batch.error_count > 0 {
            return Err(ImportError::Conflict(format!(
                "Batch {} has {} rows with errors; commit with mode=valid_only to skip them",
                id.value(),
                batch.error_count
            )));
        }
        self.acquire(actor, &batch, PipelineOperation::Commit)
            .await?;
        let started = Instant::now();

        let timeout = self.settings.commit_timeout();
        let results = match tokio::time::timeout(
            timeout,
            self.run_commit(batch.vendor_id, id, mode),
        )
        .await
        {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                let message = e.to_string();
                tracing::error!("Import batch {} commit rolled back: {}", id.value(), message);
                self.fail(actor, id, ImportBatchStatus::Committing, &message)
                    .await;
                return Err(match e {
                    ImportError::CommitFailed(_) => e,
                    other => ImportError::CommitFailed(other.to_string()),
                });
            }
            Err(_) => {
                let message = format!("Commit timed out after {}s", timeout.as_secs());
                tracing::error!("Import batch {}: {}", id.value(), message);
                self.fail(actor, id, ImportBatchStatus::Committing, &message)
                    .await;
                return Err(ImportError::CommitFailed(message));
            }
        };

        let summary = CommitSummary::from_results(id, &results);
        tracing::info!(
            "Import batch {} committed ({}): {} rows, {} new products, {} updated in {:?}",
            id.value(),
            mode,
            summary.committed_rows,
            summary.new_products,
            summary.updated_products,
            started.elapsed()
        );
        self.audit(
            actor,
            id,
            PipelineOperation::Commit.success().as_str(),
            json!({
                "mode": mode,
                "committedRows": summary.committed_rows,
                "newProducts": summary.new_products,
                "updatedProducts": summary.updated_products,
            }),
        )
        .await;
        Ok(summary)
    }

    /// Пропуск ERROR строк, каталог, статусы строк и статус партии в одной
    /// транзакции. Незафиксированная транзакция откатывается при drop.
    async fn run_commit(
        &self,
        vendor_id: VendorId,
        id: ImportBatchId,
        mode: CommitMode,
    ) -> ImportResult<Vec<CommitResult>> {
        let txn = self.db.begin().await?;
        repository::claim_for_write(&txn, id, ImportBatchStatus::Committing).await?;
        if mode == CommitMode::ValidOnly {
            let skipped = repository::skip_error_rows(&txn, id).await?;
            tracing::info!("Import batch {}: {} error rows skipped", id.value(), skipped);
        }
        let rows = repository::list_rows_with_status(&txn, id, &[RowStatus::Valid]).await?;
        let results = committer::commit_rows(&txn, self.catalog.as_ref(), vendor_id, &rows).await?;
        repository::complete_commit(&txn, id, Utc::now()).await?;
        txn.commit().await?;
        Ok(results)
    }

    /// Снять блокировку, оставшуюся от упавшего обработчика (только ADMIN)
    pub async fn release_stale_lock(
        &self,
        actor: &Actor,
        id: ImportBatchId,
    ) -> ImportResult<ImportBatch> {
        if !actor.is_admin() {
            return Err(ImportError::Forbidden(
                "Only administrators may release batch locks".to_string(),
            ));
        }
        let batch = self.load(id).await?;
        let locked_at = batch.locked_at.ok_or_else(|| {
            ImportError::Conflict(format!("Batch {} is not locked", id.value()))
        })?;

        let age = Utc::now() - locked_at;
        let threshold = self.settings.stale_lock_after();
        if age < threshold {
            return Err(ImportError::Conflict(format!(
                "Lock on batch {} is {}s old; it can be released after {}s",
                id.value(),
                age.num_seconds(),
                threshold.num_seconds()
            )));
        }

        if !batch.status.is_processing() {
            return Err(ImportError::Conflict(format!(
                "Batch {} is {} and holds no operation lock",
                id.value(),
                batch.status
            )));
        }
        // PARSING и VALIDATING перезапускаются с нуля, незавершенный COMMITTING - нет
        let (target, message) = match batch.status {
            ImportBatchStatus::Parsing => (ImportBatchStatus::Draft, None),
            ImportBatchStatus::Validating => (ImportBatchStatus::Parsed, None),
            _ => (
                ImportBatchStatus::Failed,
                Some("Commit lock released by administrator; re-create the batch"),
            ),
        };

        let released =
            repository::release_lock(&self.db, id, batch.status, locked_at, target, message)
                .await?;
        if !released {
            return Err(ImportError::Conflict(format!(
                "Batch {} changed while releasing its lock",
                id.value()
            )));
        }

        tracing::warn!(
            "Import batch {}: stale lock of {:?} released by {} ({} -> {})",
            id.value(),
            batch.locked_by_user_id,
            actor.user_id,
            batch.status,
            target
        );
        self.audit(
            actor,
            id,
            "LOCK_RELEASED",
            json!({
                "from": batch.status,
                "to": target,
                "lockedAt": locked_at,
                "lockedByUserId": batch.locked_by_user_id,
            }),
        )
        .await;
        self.load(id).await
    }

    // ------------------------------------------------------------------
    // Read projections (never touch the lock)
    // ------------------------------------------------------------------

    pub async fn get_batch_detail(
        &self,
        actor: &Actor,
        id: ImportBatchId,
    ) -> ImportResult<ImportBatchDetail> {
        let batch = self.load_authorized(actor, id).await?;
        let row_counts = repository::count_rows_by_status(&self.db, id).await?;
        Ok(ImportBatchDetail { batch, row_counts })
    }

    pub async fn get_batch_rows(
        &self,
        actor: &Actor,
        id: ImportBatchId,
        query: &RowQuery,
    ) -> ImportResult<Vec<ImportBatchRow>> {
        self.load_authorized(actor, id).await?;
        Ok(repository::list_rows(&self.db, id, query).await?)
    }

    pub async fn list_batches(
        &self,
        actor: &Actor,
        mut filter: BatchFilter,
    ) -> ImportResult<Vec<ImportBatch>> {
        match actor.role {
            UserRole::Admin => {}
            UserRole::Vendor => filter.vendor_id = Some(actor_vendor(actor)?),
            _ => return Err(forbidden_role(actor)),
        }
        Ok(repository::list_batches(&self.db, &filter).await?)
    }

    /// CSV со строками ERROR/SKIPPED: исходные колонки, row_index и текст ошибок
    pub async fn get_error_rows_csv(&self, actor: &Actor, id: ImportBatchId) -> ImportResult<String> {
        let batch = self.load_authorized(actor, id).await?;
        let rows = repository::list_rows_with_status(
            &self.db,
            id,
            &[RowStatus::Error, RowStatus::Skipped],
        )
        .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header: Vec<&str> = batch.columns.iter().map(String::as_str).collect();
        header.extend(["row_index", "errors"]);
        writer.write_record(&header).map_err(export_error)?;

        for row in &rows {
            let mut record: Vec<String> = batch
                .columns
                .iter()
                .map(|c| row.raw_data.get(c).cloned().unwrap_or_default())
                .collect();
            record.push(row.row_index.to_string());
            record.push(
                row.errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            );
            writer.write_record(&record).map_err(export_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ImportError::Export(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ImportError::Export(e.to_string()))
    }

    pub async fn get_batch_history(
        &self,
        actor: &Actor,
        id: ImportBatchId,
    ) -> ImportResult<Vec<AuditLogRecord>> {
        self.load_authorized(actor, id).await?;
        Ok(audit_repository::list_for_entity(&self.db, ENTITY_TYPE, &id.value().to_string()).await?)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn load(&self, id: ImportBatchId) -> ImportResult<ImportBatch> {
        repository::get_batch(&self.db, id)
            .await?
            .ok_or_else(|| ImportError::NotFound(format!("Import batch {} not found", id.value())))
    }

    async fn load_authorized(&self, actor: &Actor, id: ImportBatchId) -> ImportResult<ImportBatch> {
        let batch = self.load(id).await?;
        authorize(actor, &batch)?;
        Ok(batch)
    }

    /// Единственный условный UPDATE; ноль затронутых строк означает конфликт
    async fn acquire(
        &self,
        actor: &Actor,
        batch: &ImportBatch,
        operation: PipelineOperation,
    ) -> ImportResult<()> {
        let expected = operation.source();
        if batch.status != expected {
            return Err(wrong_state(batch, expected));
        }
        let acquired = repository::try_acquire_lock(
            &self.db,
            batch.id,
            expected,
            operation.processing(),
            &actor.user_id,
            Utc::now(),
        )
        .await?;
        if !acquired {
            tracing::info!(
                "Import batch {}: {} rejected, batch is locked or no longer {}",
                batch.id.value(),
                operation.as_str(),
                expected
            );
            return Err(ImportError::Conflict(format!(
                "Batch {} is locked by another operation or is no longer {}",
                batch.id.value(),
                expected
            )));
        }
        tracing::info!(
            "Import batch {}: {} started by {}",
            batch.id.value(),
            operation.as_str(),
            actor.user_id
        );
        Ok(())
    }

    async fn fail(
        &self,
        actor: &Actor,
        id: ImportBatchId,
        processing: ImportBatchStatus,
        message: &str,
    ) {
        if let Err(e) = repository::mark_failed(&self.db, id, processing, message).await {
            tracing::error!(
                "Import batch {}: could not record failure from {}: {}",
                id.value(),
                processing,
                e
            );
        }
        self.audit(
            actor,
            id,
            ImportBatchStatus::Failed.as_str(),
            json!({ "from": processing, "message": message }),
        )
        .await;
    }

    async fn audit(&self, actor: &Actor, id: ImportBatchId, action: &str, diff: serde_json::Value) {
        let entry =
            AuditEntry::new(ENTITY_TYPE, id.value().to_string(), action, diff).by(&actor.user_id);
        audit::notify(self.audit.as_ref(), entry).await;
    }
}

/// ADMIN - любая партия, VENDOR - только партии своего поставщика
pub fn authorize(actor: &Actor, batch: &ImportBatch) -> ImportResult<()> {
    match actor.role {
        UserRole::Admin => Ok(()),
        UserRole::Vendor => {
            if actor_vendor(actor)? == batch.vendor_id {
                Ok(())
            } else {
                Err(ImportError::Forbidden(format!(
                    "Batch {} belongs to another vendor",
                    batch.id.value()
                )))
            }
        }
        _ => Err(forbidden_role(actor)),
    }
}

fn resolve_vendor(actor: &Actor, requested: Option<&str>) -> ImportResult<VendorId> {
    match actor.role {
        UserRole::Admin => {
            let raw = requested.ok_or_else(|| {
                ImportError::InvalidRequest("vendor_id is required".to_string())
            })?;
            parse_vendor_id(raw)
        }
        UserRole::Vendor => {
            let own = actor_vendor(actor)?;
            match requested {
                Some(raw) if parse_vendor_id(raw)? != own => Err(ImportError::Forbidden(
                    "Vendors may only create batches for themselves".to_string(),
                )),
                _ => Ok(own),
            }
        }
        _ => Err(forbidden_role(actor)),
    }
}

fn parse_vendor_id(raw: &str) -> ImportResult<VendorId> {
    Uuid::parse_str(raw.trim())
        .map(VendorId)
        .map_err(|_| ImportError::InvalidRequest(format!("Invalid vendor_id '{}'", raw)))
}

fn actor_vendor(actor: &Actor) -> ImportResult<VendorId> {
    actor
        .vendor_id
        .as_deref()
        .and_then(|v| Uuid::parse_str(v).ok())
        .map(VendorId)
        .ok_or_else(|| ImportError::Forbidden("Vendor account has no vendor assigned".to_string()))
}

fn forbidden_role(actor: &Actor) -> ImportError {
    ImportError::Forbidden(format!("Role {:?} may not manage import batches", actor.role))
}

fn wrong_state(batch: &ImportBatch, expected: ImportBatchStatus) -> ImportError {
    ImportError::Conflict(format!(
        "Batch {} is {}, expected {}",
        batch.id.value(),
        batch.status,
        expected
    ))
}

fn export_error(e: csv::Error) -> ImportError {
    ImportError::Export(e.to_string())
}
