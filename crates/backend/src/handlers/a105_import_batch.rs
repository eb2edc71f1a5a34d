use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use contracts::domain::a101_vendor::VendorId;
use contracts::domain::a105_import_batch::{
    CommitMode, CommitSummary, CreateImportBatchDto, ImportBatch, ImportBatchDetail,
    ImportBatchId, ImportBatchRow, ImportBatchStatus, ParseResponse, RowStatus,
    ValidateResponse,
};
use contracts::system::audit::AuditLogRecord;
use serde::Deserialize;

use crate::domain::a105_import_batch::error::{ImportError, ImportResult};
use crate::domain::a105_import_batch::repository::{BatchFilter, RowQuery};
use crate::domain::a105_import_batch::service;
use crate::system::auth::extractor::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub vendor_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    pub status: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CommitQuery {
    pub mode: Option<String>,
}

fn parse_batch_id(id: &str) -> ImportResult<ImportBatchId> {
    uuid::Uuid::parse_str(id)
        .map(ImportBatchId)
        .map_err(|_| ImportError::InvalidRequest(format!("Invalid batch id '{}'", id)))
}

/// POST /api/import-batches
pub async fn create(
    CurrentUser(actor): CurrentUser,
    Json(dto): Json<CreateImportBatchDto>,
) -> ImportResult<(StatusCode, Json<ImportBatch>)> {
    let batch = service::global()?.create_batch(&actor, dto).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// GET /api/import-batches?vendor_id=&status=
pub async fn list(
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListQuery>,
) -> ImportResult<Json<Vec<ImportBatch>>> {
    let vendor_id = query
        .vendor_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| {
            uuid::Uuid::parse_str(v)
                .map(VendorId)
                .map_err(|_| ImportError::InvalidRequest(format!("Invalid vendor_id '{}'", v)))
        })
        .transpose()?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ImportBatchStatus>().map_err(ImportError::InvalidRequest))
        .transpose()?;

    let batches = service::global()?
        .list_batches(&actor, BatchFilter { vendor_id, status })
        .await?;
    Ok(Json(batches))
}

/// GET /api/import-batches/:id
pub async fn get_detail(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ImportResult<Json<ImportBatchDetail>> {
    let id = parse_batch_id(&id)?;
    Ok(Json(service::global()?.get_batch_detail(&actor, id).await?))
}

/// GET /api/import-batches/:id/rows?status=&offset=&limit=
pub async fn get_rows(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<RowsQuery>,
) -> ImportResult<Json<Vec<ImportBatchRow>>> {
    let id = parse_batch_id(&id)?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<RowStatus>().map_err(ImportError::InvalidRequest))
        .transpose()?;
    let rows = service::global()?
        .get_batch_rows(
            &actor,
            id,
            &RowQuery {
                status,
                offset: query.offset,
                limit: query.limit,
            },
        )
        .await?;
    Ok(Json(rows))
}

/// POST /api/import-batches/:id/parse (тело - CSV текст)
pub async fn parse(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    body: String,
) -> ImportResult<Json<ParseResponse>> {
    let id = parse_batch_id(&id)?;
    Ok(Json(service::global()?.parse(&actor, id, &body).await?))
}

/// POST /api/import-batches/:id/validate
pub async fn validate(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ImportResult<Json<ValidateResponse>> {
    let id = parse_batch_id(&id)?;
    Ok(Json(service::global()?.validate(&actor, id).await?))
}

/// POST /api/import-batches/:id/commit?mode=all|valid_only
pub async fn commit(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<CommitQuery>,
) -> ImportResult<Json<CommitSummary>> {
    let id = parse_batch_id(&id)?;
    let mode = match query.mode.as_deref() {
        None => CommitMode::All,
        Some(raw) => raw.parse::<CommitMode>().map_err(ImportError::InvalidRequest)?,
    };
    Ok(Json(
        service::global()?.commit_batch(&actor, id, mode).await?,
    ))
}

/// GET /api/import-batches/:id/errors.csv
pub async fn errors_csv(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ImportResult<impl IntoResponse> {
    let id = parse_batch_id(&id)?;
    let csv = service::global()?.get_error_rows_csv(&actor, id).await?;
    let disposition = format!(
        "attachment; filename=\"import-batch-{}-errors.csv\"",
        id.value()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// GET /api/import-batches/:id/history
pub async fn history(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ImportResult<Json<Vec<AuditLogRecord>>> {
    let id = parse_batch_id(&id)?;
    Ok(Json(service::global()?.get_batch_history(&actor, id).await?))
}

/// POST /api/import-batches/:id/release-lock
pub async fn release_lock(
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ImportResult<Json<ImportBatch>> {
    let id = parse_batch_id(&id)?;
    Ok(Json(service::global()?.release_stale_lock(&actor, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_id() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_batch_id(&id.to_string()).unwrap().value(), id);
        let err = parse_batch_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
