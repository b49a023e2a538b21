//! JWT issuance and verification
//!
//! Tokens are signed with a symmetric HS256 secret and carry the email
//! and user id claims plus expiry. Tokens are opaque to clients.

use anyhow::Result;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Symmetric signing secret
    pub secret: String,
    /// Token lifetime in minutes (default: 180)
    pub token_ttl_minutes: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: symmetric signing secret (required)
    /// - `JWT_TOKEN_TTL_MINUTES`: token lifetime in minutes (default: 180)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let token_ttl_minutes = std::env::var("JWT_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "180".to_string())
            .parse()
            .unwrap_or(180);

        Ok(JwtConfig {
            secret,
            token_ttl_minutes,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account email; the session middleware re-resolves the user from
    /// this on every request.
    pub email: String,
    /// User ID at issuance time
    pub user_id: i32,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_minutes: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            token_ttl_minutes: config.token_ttl_minutes,
        }
    }

    /// Issue a token for an authenticated user
    pub fn issue(&self, email: &str, user_id: i32) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            email: email.to_string(),
            user_id,
            iat: now,
            exp: now + self.token_ttl_minutes * 60,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Decode a token and return its claims; fails on bad signature,
    /// malformed structure, or expiry.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {e}"))?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: secret.to_string(),
            token_ttl_minutes: 180,
        })
    }

    #[test]
    fn issue_then_decode_returns_original_claims() {
        let jwt = service("claveSecreta");
        let token = jwt.issue("alice@example.com", 7).unwrap();

        let claims = jwt.decode(&token).unwrap();
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.user_id, 7);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service("claveSecreta");
        let now = unix_now().unwrap();
        let claims = Claims {
            email: "alice@example.com".to_string(),
            user_id: 7,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"claveSecreta"),
        )
        .unwrap();

        assert!(jwt.decode(&token).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let ours = service("claveSecreta");
        let theirs = service("otraClave");
        let token = theirs.issue("alice@example.com", 7).unwrap();

        assert!(ours.decode(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let jwt = service("claveSecreta");
        assert!(jwt.decode("definitely.not.a-jwt").is_err());
    }
}
