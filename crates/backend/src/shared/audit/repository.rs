use chrono::Utc;
use contracts::system::audit::{AuditEntry, AuditLogRecord};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sys_audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub timestamp: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub actor_user_id: Option<String>,
    pub diff: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AuditLogRecord {
    fn from(m: Model) -> Self {
        AuditLogRecord {
            id: m.id,
            timestamp: m.timestamp,
            entity_type: m.entity_type,
            entity_id: m.entity_id,
            action: m.action,
            actor_user_id: m.actor_user_id,
            diff: m.diff,
        }
    }
}

/// Добавить запись аудита
pub async fn insert<C: ConnectionTrait>(db: &C, entry: &AuditEntry) -> anyhow::Result<()> {
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();

    let active = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        timestamp: Set(now),
        entity_type: Set(entry.entity_type.clone()),
        entity_id: Set(entry.entity_id.clone()),
        action: Set(entry.action.clone()),
        actor_user_id: Set(entry.actor_user_id.clone()),
        diff: Set(entry.diff.to_string()),
    };

    active.insert(db).await?;
    Ok(())
}

/// История сущности (старые записи сверху)
pub async fn list_for_entity<C: ConnectionTrait>(
    db: &C,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<AuditLogRecord>, DbErr> {
    let records = Entity::find()
        .filter(Column::EntityType.eq(entity_type))
        .filter(Column::EntityId.eq(entity_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(records)
}
