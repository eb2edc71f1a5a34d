use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::uuid_aggregate_id!(VendorId);

/// Поставщик маркетплейса (владелец партий импорта)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub code: String,
    pub description: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Vendor {
    pub fn new_for_insert(code: String, description: String) -> Self {
        Self {
            id: VendorId::new_v4(),
            code,
            description,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
