use chrono::{DateTime, Utc};
use contracts::domain::a101_vendor::VendorId;
use contracts::domain::a103_product::ProductId;
use contracts::domain::a104_vendor_product::VendorProductId;
use contracts::domain::a105_import_batch::{
    ImportBatch, ImportBatchId, ImportBatchRow, ImportBatchRowId, ImportBatchStatus,
    NormalizedRow, RawRow, RowError, RowStatus, RowStatusCounts,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

// ============================================================================
// Entities
// ============================================================================

pub mod batch {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "a105_import_batch")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub vendor_id: String,
        pub created_by_user_id: String,
        pub filename: Option<String>,
        pub status: String,
        pub columns_json: String,
        pub row_count: i32,
        pub error_count: i32,
        pub parse_error: Option<String>,
        pub locked_at: Option<chrono::DateTime<chrono::Utc>>,
        pub locked_by_user_id: Option<String>,
        pub committed_at: Option<chrono::DateTime<chrono::Utc>>,
        pub created_at: chrono::DateTime<chrono::Utc>,
        pub updated_at: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod row {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "a105_import_batch_row")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub batch_id: String,
        pub row_index: i32,
        pub raw_data: String,
        pub normalized_data: Option<String>,
        pub status: String,
        pub errors_json: String,
        pub product_id: Option<String>,
        pub vendor_product_id: Option<String>,
        pub created_at: chrono::DateTime<chrono::Utc>,
        pub updated_at: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

fn parse_uuid(value: &str) -> Result<Uuid, DbErr> {
    Uuid::parse_str(value).map_err(|e| DbErr::Type(format!("Invalid UUID '{}': {}", value, e)))
}

fn from_json<T: serde::de::DeserializeOwned>(value: &str, column: &str) -> Result<T, DbErr> {
    serde_json::from_str(value).map_err(|e| DbErr::Json(format!("{}: {}", column, e)))
}

fn to_json<T: serde::Serialize>(value: &T, column: &str) -> Result<String, DbErr> {
    serde_json::to_string(value).map_err(|e| DbErr::Json(format!("{}: {}", column, e)))
}

impl TryFrom<batch::Model> for ImportBatch {
    type Error = DbErr;

    fn try_from(m: batch::Model) -> Result<Self, Self::Error> {
        Ok(ImportBatch {
            id: ImportBatchId(parse_uuid(&m.id)?),
            vendor_id: VendorId(parse_uuid(&m.vendor_id)?),
            created_by_user_id: m.created_by_user_id,
            filename: m.filename,
            status: m.status.parse().map_err(DbErr::Type)?,
            columns: from_json(&m.columns_json, "columns_json")?,
            row_count: m.row_count,
            error_count: m.error_count,
            parse_error: m.parse_error,
            locked_at: m.locked_at,
            locked_by_user_id: m.locked_by_user_id,
            committed_at: m.committed_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl TryFrom<row::Model> for ImportBatchRow {
    type Error = DbErr;

    fn try_from(m: row::Model) -> Result<Self, Self::Error> {
        let normalized_data = m
            .normalized_data
            .as_deref()
            .map(|s| from_json::<NormalizedRow>(s, "normalized_data"))
            .transpose()?;
        let product_id = m
            .product_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(ProductId);
        let vendor_product_id = m
            .vendor_product_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(VendorProductId);

        Ok(ImportBatchRow {
            id: ImportBatchRowId(parse_uuid(&m.id)?),
            batch_id: ImportBatchId(parse_uuid(&m.batch_id)?),
            row_index: m.row_index,
            raw_data: from_json(&m.raw_data, "raw_data")?,
            normalized_data,
            status: m.status.parse().map_err(DbErr::Type)?,
            errors: from_json(&m.errors_json, "errors_json")?,
            product_id,
            vendor_product_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

fn expect_one(affected: u64) -> Result<(), DbErr> {
    if affected == 1 {
        Ok(())
    } else {
        Err(DbErr::RecordNotUpdated)
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Фильтр списка партий
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub vendor_id: Option<VendorId>,
    pub status: Option<ImportBatchStatus>,
}

pub async fn insert_batch<C: ConnectionTrait>(db: &C, b: &ImportBatch) -> Result<(), DbErr> {
    let active = batch::ActiveModel {
        id: Set(b.id.value().to_string()),
        vendor_id: Set(b.vendor_id.value().to_string()),
        created_by_user_id: Set(b.created_by_user_id.clone()),
        filename: Set(b.filename.clone()),
        status: Set(b.status.as_str().to_string()),
        columns_json: Set(to_json(&b.columns, "columns_json")?),
        row_count: Set(b.row_count),
        error_count: Set(b.error_count),
        parse_error: Set(b.parse_error.clone()),
        locked_at: Set(b.locked_at),
        locked_by_user_id: Set(b.locked_by_user_id.clone()),
        committed_at: Set(b.committed_at),
        created_at: Set(b.created_at),
        updated_at: Set(b.updated_at),
    };
    batch::Entity::insert(active).exec(db).await?;
    Ok(())
}

pub async fn get_batch<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
) -> Result<Option<ImportBatch>, DbErr> {
    batch::Entity::find_by_id(id.value().to_string())
        .one(db)
        .await?
        .map(ImportBatch::try_from)
        .transpose()
}

/// Список партий, новые сверху
pub async fn list_batches<C: ConnectionTrait>(
    db: &C,
    filter: &BatchFilter,
) -> Result<Vec<ImportBatch>, DbErr> {
    let mut query = batch::Entity::find();
    if let Some(vendor_id) = filter.vendor_id {
        query = query.filter(batch::Column::VendorId.eq(vendor_id.value().to_string()));
    }
    if let Some(status) = filter.status {
        query = query.filter(batch::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_desc(batch::Column::CreatedAt)
        .order_by_desc(batch::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(ImportBatch::try_from)
        .collect()
}

/// Атомарный захват партии: один условный UPDATE.
/// `true` только если партия была в `expected` и не заблокирована.
pub async fn try_acquire_lock<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
    expected: ImportBatchStatus,
    processing: ImportBatchStatus,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = batch::Entity::update_many()
        .col_expr(batch::Column::Status, Expr::value(processing.as_str()))
        .col_expr(batch::Column::LockedAt, Expr::value(Some(now)))
        .col_expr(
            batch::Column::LockedByUserId,
            Expr::value(Some(user_id.to_string())),
        )
        .col_expr(batch::Column::UpdatedAt, Expr::value(now))
        .filter(batch::Column::Id.eq(id.value().to_string()))
        .filter(batch::Column::Status.eq(expected.as_str()))
        .filter(batch::Column::LockedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Должен быть первым оператором транзакции конвейера: блокировка записи
/// SQLite берется до первого чтения, иначе апгрейд чтения в запись под
/// конкурирующим соединением сразу дает SQLITE_BUSY.
pub async fn claim_for_write<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
    processing: ImportBatchStatus,
) -> Result<(), DbErr> {
    let result = batch::Entity::update_many()
        .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch::Column::Id.eq(id.value().to_string()))
        .filter(batch::Column::Status.eq(processing.as_str()))
        .filter(batch::Column::LockedAt.is_not_null())
        .exec(db)
        .await?;
    expect_one(result.rows_affected)
}

/// PARSING -> PARSED: заголовок, число строк, сброс ошибок и блокировки
pub async fn complete_parse<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
    columns: &[String],
    row_count: i32,
) -> Result<(), DbErr> {
    let result = batch::Entity::update_many()
        .col_expr(
            batch::Column::Status,
            Expr::value(ImportBatchStatus::Parsed.as_str()),
        )
        .col_expr(
            batch::Column::ColumnsJson,
            Expr::value(to_json(&columns, "columns_json")?),
        )
        .col_expr(batch::Column::RowCount, Expr::value(row_count))
        .col_expr(batch::Column::ErrorCount, Expr::value(0))
        .col_expr(batch::Column::ParseError, Expr::value(Option::<String>::None))
        .col_expr(
            batch::Column::LockedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(
            batch::Column::LockedByUserId,
            Expr::value(Option::<String>::None),
        )
        .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch::Column::Id.eq(id.value().to_string()))
        .filter(batch::Column::Status.eq(ImportBatchStatus::Parsing.as_str()))
        .exec(db)
        .await?;
    expect_one(result.rows_affected)
}

/// VALIDATING -> VALIDATED с пересчитанным числом ошибок
pub async fn complete_validate<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
    error_count: i32,
) -> Result<(), DbErr> {
    let result = batch::Entity::update_many()
        .col_expr(
            batch::Column::Status,
            Expr::value(ImportBatchStatus::Validated.as_str()),
        )
        .col_expr(batch::Column::ErrorCount, Expr::value(error_count))
        .col_expr(
            batch::Column::LockedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(
            batch::Column::LockedByUserId,
            Expr::value(Option::<String>::None),
        )
        .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch::Column::Id.eq(id.value().to_string()))
        .filter(batch::Column::Status.eq(ImportBatchStatus::Validating.as_str()))
        .exec(db)
        .await?;
    expect_one(result.rows_affected)
}

/// COMMITTING -> COMMITTED
pub async fn complete_commit<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
    committed_at: DateTime<Utc>,
) -> Result<(), DbErr> {
    let result = batch::Entity::update_many()
        .col_expr(
            batch::Column::Status,
            Expr::value(ImportBatchStatus::Committed.as_str()),
        )
        .col_expr(batch::Column::CommittedAt, Expr::value(Some(committed_at)))
        .col_expr(
            batch::Column::LockedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(
            batch::Column::LockedByUserId,
            Expr::value(Option::<String>::None),
        )
        .col_expr(batch::Column::UpdatedAt, Expr::value(committed_at))
        .filter(batch::Column::Id.eq(id.value().to_string()))
        .filter(batch::Column::Status.eq(ImportBatchStatus::Committing.as_str()))
        .exec(db)
        .await?;
    expect_one(result.rows_affected)
}

/// Перевести партию из `processing` в FAILED с диагностикой и снять блокировку
pub async fn mark_failed<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
    processing: ImportBatchStatus,
    message: &str,
) -> Result<(), DbErr> {
    let result = batch::Entity::update_many()
        .col_expr(
            batch::Column::Status,
            Expr::value(ImportBatchStatus::Failed.as_str()),
        )
        .col_expr(batch::Column::ParseError, Expr::value(Some(message.to_string())))
        .col_expr(
            batch::Column::LockedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(
            batch::Column::LockedByUserId,
            Expr::value(Option::<String>::None),
        )
        .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch::Column::Id.eq(id.value().to_string()))
        .filter(batch::Column::Status.eq(processing.as_str()))
        .exec(db)
        .await?;
    expect_one(result.rows_affected)
}

/// Снять зависшую блокировку. Срабатывает только если партия все еще в
/// `observed_status` с тем же `locked_at`, что видел оператор.
pub async fn release_lock<C: ConnectionTrait>(
    db: &C,
    id: ImportBatchId,
    observed_status: ImportBatchStatus,
    observed_locked_at: DateTime<Utc>,
    target: ImportBatchStatus,
    message: Option<&str>,
) -> Result<bool, DbErr> {
    let mut update = batch::Entity::update_many()
        .col_expr(batch::Column::Status, Expr::value(target.as_str()))
        .col_expr(
            batch::Column::LockedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(
            batch::Column::LockedByUserId,
            Expr::value(Option::<String>::None),
        )
        .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()));
    if let Some(message) = message {
        update = update.col_expr(
            batch::Column::ParseError,
            Expr::value(Some(message.to_string())),
        );
    }
    let result = update
        .filter(batch::Column::Id.eq(id.value().to_string()))
        .filter(batch::Column::Status.eq(observed_status.as_str()))
        .filter(batch::Column::LockedAt.eq(observed_locked_at))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

// ============================================================================
// Rows
// ============================================================================

/// Строка, подготовленная парсером к вставке
#[derive(Debug, Clone)]
pub struct NewRow {
    pub row_index: i32,
    pub raw_data: RawRow,
    pub normalized_data: NormalizedRow,
}

/// Фильтр и пагинация строк партии
#[derive(Debug, Clone, Default)]
pub struct RowQuery {
    pub status: Option<RowStatus>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// SQLite ограничивает число параметров в одном запросе
const INSERT_CHUNK: usize = 200;

pub async fn delete_rows<C: ConnectionTrait>(db: &C, batch_id: ImportBatchId) -> Result<u64, DbErr> {
    let result = row::Entity::delete_many()
        .filter(row::Column::BatchId.eq(batch_id.value().to_string()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Вставить строки партии со статусом PENDING
pub async fn insert_rows<C: ConnectionTrait>(
    db: &C,
    batch_id: ImportBatchId,
    rows: &[NewRow],
) -> Result<(), DbErr> {
    let now = Utc::now();
    let batch_id = batch_id.value().to_string();
    for chunk in rows.chunks(INSERT_CHUNK) {
        let models = chunk
            .iter()
            .map(|r| {
                Ok(row::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    batch_id: Set(batch_id.clone()),
                    row_index: Set(r.row_index),
                    raw_data: Set(to_json(&r.raw_data, "raw_data")?),
                    normalized_data: Set(Some(to_json(&r.normalized_data, "normalized_data")?)),
                    status: Set(RowStatus::Pending.as_str().to_string()),
                    errors_json: Set("[]".to_string()),
                    product_id: Set(None),
                    vendor_product_id: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                })
            })
            .collect::<Result<Vec<_>, DbErr>>()?;
        row::Entity::insert_many(models).exec(db).await?;
    }
    Ok(())
}

/// Строки партии в порядке row_index
pub async fn list_rows<C: ConnectionTrait>(
    db: &C,
    batch_id: ImportBatchId,
    query: &RowQuery,
) -> Result<Vec<ImportBatchRow>, DbErr> {
    let mut select =
        row::Entity::find().filter(row::Column::BatchId.eq(batch_id.value().to_string()));
    if let Some(status) = query.status {
        select = select.filter(row::Column::Status.eq(status.as_str()));
    }
    // SQLite не допускает OFFSET без LIMIT
    let limit = query.limit.or(query.offset.map(|_| i64::MAX as u64));
    select
        .order_by_asc(row::Column::RowIndex)
        .offset(query.offset)
        .limit(limit)
        .all(db)
        .await?
        .into_iter()
        .map(ImportBatchRow::try_from)
        .collect()
}

pub async fn list_rows_with_status<C: ConnectionTrait>(
    db: &C,
    batch_id: ImportBatchId,
    statuses: &[RowStatus],
) -> Result<Vec<ImportBatchRow>, DbErr> {
    row::Entity::find()
        .filter(row::Column::BatchId.eq(batch_id.value().to_string()))
        .filter(row::Column::Status.is_in(statuses.iter().map(|s| s.as_str())))
        .order_by_asc(row::Column::RowIndex)
        .all(db)
        .await?
        .into_iter()
        .map(ImportBatchRow::try_from)
        .collect()
}

/// Итог валидации строки: PENDING -> VALID | ERROR
pub async fn set_row_verdict<C: ConnectionTrait>(
    db: &C,
    row_id: ImportBatchRowId,
    status: RowStatus,
    errors: &[RowError],
) -> Result<(), DbErr> {
    let result = row::Entity::update_many()
        .col_expr(row::Column::Status, Expr::value(status.as_str()))
        .col_expr(
            row::Column::ErrorsJson,
            Expr::value(to_json(&errors, "errors_json")?),
        )
        .col_expr(row::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(row::Column::Id.eq(row_id.value().to_string()))
        .filter(row::Column::Status.eq(RowStatus::Pending.as_str()))
        .exec(db)
        .await?;
    expect_one(result.rows_affected)
}

/// ERROR -> SKIPPED для всех строк партии
pub async fn skip_error_rows<C: ConnectionTrait>(
    db: &C,
    batch_id: ImportBatchId,
) -> Result<u64, DbErr> {
    let result = row::Entity::update_many()
        .col_expr(row::Column::Status, Expr::value(RowStatus::Skipped.as_str()))
        .col_expr(row::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(row::Column::BatchId.eq(batch_id.value().to_string()))
        .filter(row::Column::Status.eq(RowStatus::Error.as_str()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// VALID -> COMMITTED со ссылками на записи каталога
pub async fn mark_row_committed<C: ConnectionTrait>(
    db: &C,
    row_id: ImportBatchRowId,
    product_id: ProductId,
    vendor_product_id: VendorProductId,
) -> Result<(), DbErr> {
    let result = row::Entity::update_many()
        .col_expr(
            row::Column::Status,
            Expr::value(RowStatus::Committed.as_str()),
        )
        .col_expr(
            row::Column::ProductId,
            Expr::value(Some(product_id.value().to_string())),
        )
        .col_expr(
            row::Column::VendorProductId,
            Expr::value(Some(vendor_product_id.value().to_string())),
        )
        .col_expr(row::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(row::Column::Id.eq(row_id.value().to_string()))
        .filter(row::Column::Status.eq(RowStatus::Valid.as_str()))
        .exec(db)
        .await?;
    expect_one(result.rows_affected)
}

pub async fn count_rows_by_status<C: ConnectionTrait>(
    db: &C,
    batch_id: ImportBatchId,
) -> Result<RowStatusCounts, DbErr> {
    let grouped: Vec<(String, i64)> = row::Entity::find()
        .select_only()
        .column(row::Column::Status)
        .column_as(row::Column::Id.count(), "cnt")
        .filter(row::Column::BatchId.eq(batch_id.value().to_string()))
        .group_by(row::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let mut counts = RowStatusCounts::default();
    for (status, cnt) in grouped {
        let cnt = cnt as i32;
        match status.parse::<RowStatus>().map_err(DbErr::Type)? {
            RowStatus::Pending => counts.pending = cnt,
            RowStatus::Valid => counts.valid = cnt,
            RowStatus::Error => counts.error = cnt,
            RowStatus::Committed => counts.committed = cnt,
            RowStatus::Skipped => counts.skipped = cnt,
        }
    }
    Ok(counts)
}
