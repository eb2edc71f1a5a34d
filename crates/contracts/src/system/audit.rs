use serde::{Deserialize, Serialize};

/// Запись аудита о переходе состояния сущности
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub actor_user_id: Option<String>,
    /// Произвольный JSON с изменениями
    pub diff: serde_json::Value,
}

impl AuditEntry {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        action: impl Into<String>,
        diff: serde_json::Value,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            action: action.into(),
            actor_user_id: None,
            diff,
        }
    }

    pub fn by(mut self, user_id: impl Into<String>) -> Self {
        self.actor_user_id = Some(user_id.into());
        self
    }
}

/// Строка журнала аудита, как она хранится
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogRecord {
    pub id: i64,
    pub timestamp: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub actor_user_id: Option<String>,
    pub diff: String,
}
