use anyhow::{Context, Result};
use contracts::system::auth::{TokenClaims, UserRole};
use jsonwebtoken::{decode, DecodingKey, Validation};

/// Validate JWT token and extract claims
pub fn validate_token(token: &str, secret: &str) -> Result<TokenClaims> {
    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT token")?;

    let claims = token_data.claims;
    if claims.role == UserRole::Vendor && claims.vendor_id.is_none() {
        anyhow::bail!("Vendor token without vendor_id");
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn encode_token(claims: &TokenClaims, secret: &str) -> Result<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .context("Failed to encode JWT token")
    }

    fn claims(role: UserRole, vendor_id: Option<&str>, lifetime_secs: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: "user-1".into(),
            username: "vendor".into(),
            role,
            vendor_id: vendor_id.map(str::to_string),
            exp: (now + lifetime_secs) as usize,
            iat: now as usize,
        }
    }

    #[test]
    fn test_valid_token_roundtrip() {
        let token = encode_token(&claims(UserRole::Vendor, Some("v-1"), 3600), "secret").unwrap();
        let decoded = validate_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.role, UserRole::Vendor);
        assert_eq!(decoded.vendor_id.as_deref(), Some("v-1"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = encode_token(&claims(UserRole::Admin, None, 3600), "secret").unwrap();
        assert!(validate_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = encode_token(&claims(UserRole::Admin, None, -3600), "secret").unwrap();
        assert!(validate_token(&token, "secret").is_err());
    }

    #[test]
    fn test_vendor_token_requires_vendor_id() {
        let token = encode_token(&claims(UserRole::Vendor, None, 3600), "secret").unwrap();
        assert!(validate_token(&token, "secret").is_err());
    }
}
