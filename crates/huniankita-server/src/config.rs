//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use huniankita_shared::constants::{APP_NAME, MAX_IMAGE_SIZE};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database file.
    /// Env: `DB_PATH`
    /// Default: platform data directory (see `Database::new`).
    pub db_path: Option<PathBuf>,

    /// Filesystem path where listing photos are stored.
    /// Env: `IMAGE_STORAGE_PATH`
    /// Default: `./images`
    pub image_storage_path: PathBuf,

    /// Maximum listing photo size in bytes.
    /// Env: `MAX_IMAGE_SIZE`
    /// Default: 10 MiB.
    pub max_image_size: usize,

    /// HMAC secret for signing bearer tokens.
    /// Env: `JWT_SECRET`
    /// Default: none (a random per-boot secret is generated, with a warning;
    /// sessions do not survive restarts without a configured secret).
    pub jwt_secret: Option<String>,

    // -- Instance settings --

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"HunianKita"`
    pub instance_name: String,

    /// Whether new accounts can register freely.
    /// Env: `REGISTRATION_OPEN` (true/false)
    /// Default: `true`
    pub registration_open: bool,

    /// Bootstrap admin credentials, applied once when no admin exists.
    /// Env: `ADMIN_EMAIL` / `ADMIN_PASSWORD`
    /// Default: unset (no bootstrap admin is created).
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            db_path: None,
            image_storage_path: PathBuf::from("./images"),
            max_image_size: MAX_IMAGE_SIZE,
            jwt_secret: None,
            instance_name: APP_NAME.to_string(),
            registration_open: true,
            admin_email: None,
            admin_password: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("IMAGE_STORAGE_PATH") {
            config.image_storage_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("MAX_IMAGE_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_image_size = n;
            } else {
                tracing::warn!(value = %val, "Invalid MAX_IMAGE_SIZE, using default");
            }
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                config.jwt_secret = Some(secret);
            }
        }

        // -- Instance settings --

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(val) = std::env::var("REGISTRATION_OPEN") {
            config.registration_open = val != "false" && val != "0";
        }

        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            if !email.is_empty() {
                config.admin_email = Some(email);
            }
        }

        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            if !password.is_empty() {
                config.admin_password = Some(password);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_image_size, MAX_IMAGE_SIZE);
        assert!(config.registration_open);
        assert!(config.jwt_secret.is_none());
    }
}
