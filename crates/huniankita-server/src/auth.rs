//! Bearer-token authentication.
//!
//! Login issues an HS256 JWT carrying the user id and role; the [`AuthUser`]
//! extractor validates it on every protected route.  Credentials are stored
//! as Argon2id PHC strings.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use huniankita_shared::constants::TOKEN_LIFETIME_DAYS;
use huniankita_shared::Role;
use huniankita_store::User;

use crate::api::AppState;
use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// JWT signing/verification keys derived from the configured secret.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Build keys from config, generating a random per-boot secret when none
    /// is set.  Tokens then die with the process; fine for development.
    pub fn from_config(jwt_secret: Option<&str>) -> Self {
        match jwt_secret {
            Some(secret) => Self::new(secret),
            None => {
                tracing::warn!(
                    "JWT_SECRET not configured; using a random per-boot secret \
                     (sessions will not survive restarts)"
                );
                let secret: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(48)
                    .map(char::from)
                    .collect();
                Self::new(&secret)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Role at issue time.  Gate operations re-read the live role anyway.
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a bearer token for a freshly authenticated user.
pub fn issue_token(keys: &AuthKeys, user: &User) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
    };

    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
}

fn decode_token(keys: &AuthKeys, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Unauthorized("Token expired".into())
            }
            _ => ApiError::Unauthorized("Invalid token".into()),
        })
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// The authenticated caller, extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Owners manage their own records; admins manage everything.
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.role == Role::Admin || self.id == owner_id
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role != Role::Admin {
            return Err(ApiError::Forbidden("Admin role required".into()));
        }
        Ok(())
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".into()))?;

        let claims = decode_token(&state.auth_keys, token)?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid token subject".into()))?;

        Ok(AuthUser {
            id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Budi".to_string(),
            email: "budi@example.com".to_string(),
            password_hash: String::new(),
            whatsapp: None,
            role: Role::Mitra,
            token_balance: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let keys = AuthKeys::new("test-secret");
        let user = sample_user();

        let token = issue_token(&keys, &user).unwrap();
        let claims = decode_token(&keys, &token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::Mitra);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let keys = AuthKeys::new("secret-a");
        let other = AuthKeys::new("secret-b");
        let token = issue_token(&keys, &sample_user()).unwrap();

        assert!(decode_token(&other, &token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let keys = AuthKeys::new("test-secret");
        assert!(decode_token(&keys, "not.a.jwt").is_err());
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah", &hash));
        assert!(!verify_password("rahasia123", "not-a-phc-string"));
    }
}
