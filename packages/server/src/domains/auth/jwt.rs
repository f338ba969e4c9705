use anyhow::Result;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,      // Subject (username)
    pub username: String, // Login name
    pub tenant: String,   // Namespace the user's contracts live in
    pub exp: i64,         // Expiration timestamp
    pub iat: i64,         // Issued at timestamp
    pub iss: String,      // Issuer
    pub jti: String,      // JWT ID (unique token identifier)
}

/// JWT Service - creates and verifies JWT tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expire_hours: i64,
}

impl JwtService {
    /// Create new JWT service with secret, issuer and token lifetime
    pub fn new(secret: &str, issuer: String, expire_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            expire_hours,
        }
    }

    /// Create a token for a user. Returns the token and its expiry.
    pub fn create_token(&self, username: &str, tenant: &str) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let exp = now + chrono::Duration::hours(self.expire_hours);

        let claims = Claims {
            sub: username.to_string(),
            username: username.to_string(),
            tenant: tenant.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, exp))
    }

    /// Verify and decode a JWT token
    ///
    /// Returns claims if token is valid and not expired
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string(), 24);

        let (token, _) = service.create_token("alice", "acme").unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.tenant, "acme");
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string(), 24);
        assert!(service.verify_token("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "test_issuer".to_string(), 24);
        let service2 = JwtService::new("secret2", "test_issuer".to_string(), 24);

        let (token, _) = service1.create_token("alice", "acme").unwrap();

        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let service1 = JwtService::new("secret", "issuer-a".to_string(), 24);
        let service2 = JwtService::new("secret", "issuer-b".to_string(), 24);

        let (token, _) = service1.create_token("alice", "acme").unwrap();

        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_expiry_follows_configured_hours() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string(), 2);

        let (token, expires_at) = service.create_token("alice", "acme").unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.exp, expires_at.timestamp());
        let expires_in = claims.exp - Utc::now().timestamp();
        assert!(expires_in > 3600);
        assert!(expires_in <= 2 * 3600);
    }
}
