use chrono::Utc;
use contracts::domain::a102_product_category::{ProductCategory, ProductCategoryId};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::shared::slug::slugify;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a102_product_category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub slug: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ProductCategory {
    fn from(m: Model) -> Self {
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::nil());
        ProductCategory {
            id: ProductCategoryId(uuid),
            slug: m.slug,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

pub async fn find_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<Option<ProductCategory>, DbErr> {
    let result = Entity::find()
        .filter(Column::Slug.eq(slug))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

/// Найти категорию по slug метки или создать новую.
/// Метка, из которой получается пустой slug, категорию не дает.
pub async fn find_or_create_by_label<C: ConnectionTrait>(
    db: &C,
    label: &str,
) -> Result<Option<ProductCategoryId>, DbErr> {
    let slug = slugify(label);
    if slug.is_empty() {
        return Ok(None);
    }

    if let Some(existing) = find_by_slug(db, &slug).await? {
        return Ok(Some(existing.id));
    }

    let id = ProductCategoryId::new_v4();
    let active = ActiveModel {
        id: Set(id.value().to_string()),
        slug: Set(slug.clone()),
        description: Set(label.trim().to_string()),
        created_at: Set(Utc::now()),
    };
    active.insert(db).await?;
    tracing::debug!("Created product category '{}'", slug);
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    #[tokio::test]
    async fn test_labels_with_same_slug_share_category() {
        let db = connect_in_memory().await;
        let a = find_or_create_by_label(&db, "Frutos Secos").await.unwrap();
        let b = find_or_create_by_label(&db, "  frutos   SECOS ").await.unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);

        let stored = find_by_slug(&db, "frutos-secos").await.unwrap().unwrap();
        assert_eq!(stored.description, "Frutos Secos");
    }

    #[tokio::test]
    async fn test_blank_label_gives_no_category() {
        let db = connect_in_memory().await;
        assert_eq!(find_or_create_by_label(&db, " -- ").await.unwrap(), None);
    }
}
