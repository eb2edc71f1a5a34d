use chrono::Utc;
use contracts::domain::a101_vendor::VendorId;
use contracts::domain::a103_product::ProductId;
use contracts::domain::a104_vendor_product::{VendorProduct, VendorProductId};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a104_vendor_product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub vendor_id: String,
    pub product_id: String,
    pub price_cents: i64,
    pub in_stock: bool,
    pub is_active: bool,
    pub vendor_sku: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn parse_uuid(value: &str) -> Result<Uuid, DbErr> {
    Uuid::parse_str(value).map_err(|e| DbErr::Type(format!("Invalid UUID '{}': {}", value, e)))
}

impl TryFrom<Model> for VendorProduct {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(VendorProduct {
            id: VendorProductId(parse_uuid(&m.id)?),
            vendor_id: VendorId(parse_uuid(&m.vendor_id)?),
            product_id: ProductId(parse_uuid(&m.product_id)?),
            price_cents: m.price_cents,
            in_stock: m.in_stock,
            is_active: m.is_active,
            vendor_sku: m.vendor_sku,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// Предложение поставщика (цена/наличие/SKU) для upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub price_cents: i64,
    pub in_stock: bool,
    pub vendor_sku: Option<String>,
}

pub async fn find_by_vendor_and_product<C: ConnectionTrait>(
    db: &C,
    vendor_id: VendorId,
    product_id: ProductId,
) -> Result<Option<VendorProduct>, DbErr> {
    Entity::find()
        .filter(Column::VendorId.eq(vendor_id.value().to_string()))
        .filter(Column::ProductId.eq(product_id.value().to_string()))
        .one(db)
        .await?
        .map(VendorProduct::try_from)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    vendor_id: VendorId,
    product_id: ProductId,
    offer: &Offer,
) -> Result<VendorProductId, DbErr> {
    let id = VendorProductId::new_v4();
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(id.value().to_string()),
        vendor_id: Set(vendor_id.value().to_string()),
        product_id: Set(product_id.value().to_string()),
        price_cents: Set(offer.price_cents),
        in_stock: Set(offer.in_stock),
        is_active: Set(true),
        vendor_sku: Set(offer.vendor_sku.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    active.insert(db).await?;
    Ok(id)
}

/// Перезаписать предложение и реактивировать связь
pub async fn update_offer<C: ConnectionTrait>(
    db: &C,
    id: VendorProductId,
    offer: &Offer,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        id: Set(id.value().to_string()),
        price_cents: Set(offer.price_cents),
        in_stock: Set(offer.in_stock),
        is_active: Set(true),
        vendor_sku: Set(offer.vendor_sku.clone()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

#[cfg(test)]
pub async fn list_by_vendor<C: ConnectionTrait>(
    db: &C,
    vendor_id: VendorId,
) -> Result<Vec<VendorProduct>, DbErr> {
    use sea_orm::QueryOrder;
    Entity::find()
        .filter(Column::VendorId.eq(vendor_id.value().to_string()))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(VendorProduct::try_from)
        .collect()
}
