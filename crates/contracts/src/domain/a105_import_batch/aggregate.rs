use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::a101_vendor::VendorId;

crate::uuid_aggregate_id!(ImportBatchId);

// ============================================================================
// Status / state machine
// ============================================================================

/// Статус партии импорта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportBatchStatus {
    Draft,
    Parsing,
    Parsed,
    Validating,
    Validated,
    Committing,
    Committed,
    Failed,
}

impl ImportBatchStatus {
    pub const ALL: [ImportBatchStatus; 8] = [
        ImportBatchStatus::Draft,
        ImportBatchStatus::Parsing,
        ImportBatchStatus::Parsed,
        ImportBatchStatus::Validating,
        ImportBatchStatus::Validated,
        ImportBatchStatus::Committing,
        ImportBatchStatus::Committed,
        ImportBatchStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportBatchStatus::Draft => "DRAFT",
            ImportBatchStatus::Parsing => "PARSING",
            ImportBatchStatus::Parsed => "PARSED",
            ImportBatchStatus::Validating => "VALIDATING",
            ImportBatchStatus::Validated => "VALIDATED",
            ImportBatchStatus::Committing => "COMMITTING",
            ImportBatchStatus::Committed => "COMMITTED",
            ImportBatchStatus::Failed => "FAILED",
        }
    }

    /// Промежуточный статус, который держит блокировку партии
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            ImportBatchStatus::Parsing
                | ImportBatchStatus::Validating
                | ImportBatchStatus::Committing
        )
    }
}

impl fmt::Display for ImportBatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportBatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImportBatchStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown import batch status: {}", s))
    }
}

/// Операция конвейера, переводящая партию через промежуточный статус
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOperation {
    Parse,
    Validate,
    Commit,
}

impl PipelineOperation {
    /// Статус, в котором партия должна находиться перед операцией
    pub fn source(&self) -> ImportBatchStatus {
        match self {
            PipelineOperation::Parse => ImportBatchStatus::Draft,
            PipelineOperation::Validate => ImportBatchStatus::Parsed,
            PipelineOperation::Commit => ImportBatchStatus::Validated,
        }
    }

    /// Статус на время выполнения (под блокировкой)
    pub fn processing(&self) -> ImportBatchStatus {
        match self {
            PipelineOperation::Parse => ImportBatchStatus::Parsing,
            PipelineOperation::Validate => ImportBatchStatus::Validating,
            PipelineOperation::Commit => ImportBatchStatus::Committing,
        }
    }

    pub fn success(&self) -> ImportBatchStatus {
        match self {
            PipelineOperation::Parse => ImportBatchStatus::Parsed,
            PipelineOperation::Validate => ImportBatchStatus::Validated,
            PipelineOperation::Commit => ImportBatchStatus::Committed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineOperation::Parse => "parse",
            PipelineOperation::Validate => "validate",
            PipelineOperation::Commit => "commit",
        }
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Партия импорта: одна попытка загрузки CSV одного поставщика
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: ImportBatchId,
    #[serde(rename = "vendorId")]
    pub vendor_id: VendorId,
    #[serde(rename = "createdByUserId")]
    pub created_by_user_id: String,
    pub filename: Option<String>,
    pub status: ImportBatchStatus,
    /// Заголовок CSV в исходном порядке (для экспорта ошибок)
    pub columns: Vec<String>,
    #[serde(rename = "rowCount")]
    pub row_count: i32,
    #[serde(rename = "errorCount")]
    pub error_count: i32,
    #[serde(rename = "parseError")]
    pub parse_error: Option<String>,
    #[serde(rename = "lockedAt")]
    pub locked_at: Option<DateTime<Utc>>,
    #[serde(rename = "lockedByUserId")]
    pub locked_by_user_id: Option<String>,
    #[serde(rename = "committedAt")]
    pub committed_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl ImportBatch {
    pub fn new_for_insert(
        vendor_id: VendorId,
        created_by_user_id: String,
        filename: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ImportBatchId::new_v4(),
            vendor_id,
            created_by_user_id,
            filename,
            status: ImportBatchStatus::Draft,
            columns: Vec::new(),
            row_count: 0,
            error_count: 0,
            parse_error: None,
            locked_at: None,
            locked_by_user_id: None,
            committed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked_at.is_some()
    }
}
