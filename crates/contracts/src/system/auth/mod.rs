use serde::{Deserialize, Serialize};

/// Роль пользователя платформы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Vendor,
    Client,
    Agent,
    Driver,
}

/// JWT claims issued by the platform auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // user_id
    pub username: String,
    pub role: UserRole,
    #[serde(default)]
    pub vendor_id: Option<String>, // only for VENDOR
    pub exp: usize, // expiration timestamp
    pub iat: usize, // issued at
}

/// Текущий пользователь в терминах конвейера импорта
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: UserRole,
    pub vendor_id: Option<String>,
}

impl From<&TokenClaims> for Actor {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            role: claims.role,
            vendor_id: claims.vendor_id.clone(),
        }
    }
}

impl Actor {
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: UserRole::Admin,
            vendor_id: None,
        }
    }

    pub fn vendor(user_id: impl Into<String>, vendor_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: UserRole::Vendor,
            vendor_id: Some(vendor_id.into()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
