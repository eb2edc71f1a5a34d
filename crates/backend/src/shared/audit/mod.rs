//! Журнал аудита: best-effort уведомления о переходах состояний.
//!
//! Ошибка записи аудита никогда не должна ломать вызывающую операцию,
//! поэтому [`notify`] только логирует сбой.

pub mod repository;

use async_trait::async_trait;
use contracts::system::audit::AuditEntry;
use sea_orm::DatabaseConnection;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> anyhow::Result<()>;
}

/// Аудит в таблицу sys_audit_log
pub struct DbAuditSink {
    db: DatabaseConnection,
}

impl DbAuditSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn record(&self, entry: AuditEntry) -> anyhow::Result<()> {
        repository::insert(&self.db, &entry).await
    }
}

/// Отправить запись в аудит, проглотив ошибку
pub async fn notify(sink: &dyn AuditSink, entry: AuditEntry) {
    let entity_id = entry.entity_id.clone();
    let action = entry.action.clone();
    if let Err(e) = sink.record(entry).await {
        tracing::warn!(
            "Audit write failed for {} ({}): {}",
            entity_id,
            action,
            e
        );
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Collects entries in memory
    #[derive(Default)]
    pub struct RecordingAuditSink {
        pub entries: Mutex<Vec<AuditEntry>>,
    }

    impl RecordingAuditSink {
        pub fn actions(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.action.clone())
                .collect()
        }
    }

    #[async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn record(&self, entry: AuditEntry) -> anyhow::Result<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    /// Always fails
    pub struct BrokenAuditSink;

    #[async_trait]
    impl AuditSink for BrokenAuditSink {
        async fn record(&self, _entry: AuditEntry) -> anyhow::Result<()> {
            anyhow::bail!("audit storage is unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    #[tokio::test]
    async fn test_notify_swallows_sink_errors() {
        notify(
            &BrokenAuditSink,
            AuditEntry::new("import_batch", "b1", "FAILED", serde_json::json!({})),
        )
        .await;
    }

    #[tokio::test]
    async fn test_db_sink_persists_entries() {
        let db = connect_in_memory().await;
        let sink = DbAuditSink::new(db.clone());
        notify(
            &sink,
            AuditEntry::new(
                "import_batch",
                "b1",
                "PARSED",
                serde_json::json!({"rowCount": 2}),
            )
            .by("u1"),
        )
        .await;

        let records = repository::list_for_entity(&db, "import_batch", "b1")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "PARSED");
        assert_eq!(records[0].actor_user_id.as_deref(), Some("u1"));
        assert!(records[0].diff.contains("rowCount"));
    }
}
