use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

/// Ошибка разбора CSV; текст сохраняется в `parse_error` партии
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsvParseError {
    #[error("CSV file is empty")]
    Empty,

    #[error("CSV header is missing or blank")]
    MissingHeader,

    #[error("CSV header has a blank column name at position {0}")]
    BlankColumn(usize),

    #[error("CSV header has duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("CSV file has a header but no data rows")]
    NoDataRows,

    #[error("Malformed CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

/// Ошибки конвейера импорта
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Parse(#[from] CsvParseError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Export(String),
}

impl ImportError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ImportError::NotFound(_) => StatusCode::NOT_FOUND,
            ImportError::Forbidden(_) => StatusCode::FORBIDDEN,
            ImportError::Conflict(_) => StatusCode::CONFLICT,
            ImportError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ImportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ImportError::CommitFailed(_)
            | ImportError::Database(_)
            | ImportError::Serialization(_)
            | ImportError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Import request failed: {}", self);
        } else {
            tracing::debug!("Import request rejected ({}): {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ImportError::Parse(CsvParseError::Empty).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ImportError::Conflict("locked".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ImportError::CommitFailed("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ImportError::Database(DbErr::Custom("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_error_message_is_passed_through() {
        let err = ImportError::from(CsvParseError::DuplicateColumn("name".into()));
        assert_eq!(err.to_string(), "CSV header has duplicate column 'name'");
    }
}
