use contracts::domain::a101_vendor::{Vendor, VendorId};
use sea_orm::entity::prelude::*;
use sea_orm::EntityTrait;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a101_vendor")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Vendor {
    fn from(m: Model) -> Self {
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::nil());
        Vendor {
            id: VendorId(uuid),
            code: m.code,
            description: m.description,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

pub async fn get_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Vendor>, DbErr> {
    let result = Entity::find_by_id(id.to_string()).one(db).await?;
    Ok(result.map(Into::into))
}

/// Поставщиков ведет каталог; вставка нужна только для тестовых данных
#[cfg(test)]
pub async fn insert<C: ConnectionTrait>(db: &C, vendor: &Vendor) -> Result<Uuid, DbErr> {
    use sea_orm::Set;
    let uuid = vendor.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(vendor.code.clone()),
        description: Set(vendor.description.clone()),
        is_active: Set(vendor.is_active),
        created_at: Set(vendor.created_at),
    };
    active.insert(db).await?;
    Ok(uuid)
}
