pub mod aggregate;
pub mod dto;
pub mod row;

pub use aggregate::{ImportBatch, ImportBatchId, ImportBatchStatus, PipelineOperation};
pub use dto::{
    CommitMode, CommitResult, CommitSummary, CreateImportBatchDto, ImportBatchDetail,
    ParseResponse, RowStatusCounts, ValidateResponse,
};
pub use row::{ImportBatchRow, ImportBatchRowId, NormalizedRow, RawRow, RowError, RowStatus};
