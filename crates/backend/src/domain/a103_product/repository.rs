use chrono::Utc;
use contracts::domain::a102_product_category::ProductCategoryId;
use contracts::domain::a103_product::{Product, ProductId, Unit};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a103_product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub unit: String,
    pub category_id: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Product {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&m.id).map_err(|e| DbErr::Type(e.to_string()))?;
        let unit = m.unit.parse::<Unit>().map_err(DbErr::Type)?;
        let category_id = m
            .category_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| DbErr::Type(e.to_string()))?
            .map(ProductCategoryId);
        Ok(Product {
            id: ProductId(id),
            name: m.name,
            unit,
            category_id,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// Поиск по точному (trimmed) совпадению имени в глобальном каталоге.
/// При дублях берется самый ранний товар.
pub async fn find_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<Product>, DbErr> {
    Entity::find()
        .filter(Column::Name.eq(name.trim()))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .one(db)
        .await?
        .map(Product::try_from)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    name: &str,
    unit: Unit,
    category_id: Option<ProductCategoryId>,
) -> Result<ProductId, DbErr> {
    let id = ProductId::new_v4();
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(id.value().to_string()),
        name: Set(name.trim().to_string()),
        unit: Set(unit.as_str().to_string()),
        category_id: Set(category_id.map(|c| c.value().to_string())),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    active.insert(db).await?;
    Ok(id)
}

#[cfg(test)]
pub async fn count_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<u64, DbErr> {
    use sea_orm::PaginatorTrait;
    Entity::find()
        .filter(Column::Name.eq(name.trim()))
        .count(db)
        .await
}
