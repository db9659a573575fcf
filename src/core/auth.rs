use anyhow::{Result, bail};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Settings;

/// Hash a password with a fresh random salt. Stored as `salt$digest`, both
/// hex-encoded.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::random();
    let salt_hex = hex::encode(salt);
    let digest = salted_digest(&salt_hex, password);
    format!("{salt_hex}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => salted_digest(salt, password) == digest,
        None => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Issues and verifies signed access tokens carrying the username as the
/// subject claim.
#[derive(Clone)]
pub struct Authenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    expire_minutes: i64,
}

impl Authenticator {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret_key.as_bytes()),
            algorithm: parse_algorithm(&settings.token_algorithm)?,
            expire_minutes: settings.access_token_expire_minutes,
        })
    }

    pub fn issue_token(&self, username: &str) -> Result<String> {
        let exp = (Utc::now() + chrono::Duration::minutes(self.expire_minutes)).timestamp();
        let claims = Claims {
            sub: username.to_string(),
            exp,
        };
        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    /// Returns the subject username of a valid, unexpired token.
    pub fn verify_token(&self, token: &str) -> Result<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(self.algorithm))?;
        Ok(data.claims.sub)
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => bail!("Unsupported token algorithm: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings(expire_minutes: i64) -> Settings {
        Settings {
            secret_key: "test-secret".to_string(),
            token_algorithm: "HS256".to_string(),
            access_token_expire_minutes: expire_minutes,
            database_path: ":memory:".to_string(),
            default_model: "gpt-3.5-turbo".to_string(),
            openai_api_key: String::new(),
            cors_origins: vec!["*".to_string()],
            bind_addr: "127.0.0.1:0".to_string(),
            seed_db: false,
        }
    }

    #[test]
    fn password_roundtrip() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        assert_ne!(hash_password("admin"), hash_password("admin"));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "no-dollar-separator"));
    }

    #[test]
    fn token_roundtrip_returns_subject() {
        let auth = Authenticator::new(&test_settings(60)).unwrap();
        let token = auth.issue_token("admin").unwrap();
        assert_eq!(auth.verify_token(&token).unwrap(), "admin");
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = Authenticator::new(&test_settings(-10)).unwrap();
        let token = auth.issue_token("admin").unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = Authenticator::new(&Settings {
            secret_key: "other-secret".to_string(),
            ..test_settings(60)
        })
        .unwrap();
        let verifier = Authenticator::new(&test_settings(60)).unwrap();
        let token = issuer.issue_token("admin").unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let auth = Authenticator::new(&test_settings(60)).unwrap();
        let mut token = auth.issue_token("admin").unwrap();
        token.pop();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn non_hmac_algorithm_is_rejected() {
        let settings = Settings {
            token_algorithm: "RS256".to_string(),
            ..test_settings(60)
        };
        assert!(Authenticator::new(&settings).is_err());
    }
}
