//! # huniankita-server
//!
//! REST backend for the HunianKita rental marketplace.
//!
//! This binary provides:
//! - **Listing catalog** (kost / guest house / villa) with filtering,
//!   sorting, and pagination
//! - **Token ledger gate** in front of paid mitra actions (listing upload,
//!   boost), with an append-only transaction log
//! - **JWT auth** for guests, mitra partners, and admins
//! - **Admin API** for token top-ups, cost tuning, user management, and
//!   site content
//! - **Disk-backed photo storage** with format validation
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod auth;
mod config;
mod error;
mod gate;
mod image_store;
mod rate_limit;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use huniankita_shared::Role;
use huniankita_store::{Database, User};

use crate::api::AppState;
use crate::auth::AuthKeys;
use crate::config::ServerConfig;
use crate::gate::TokenGate;
use crate::image_store::ImageStore;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,huniankita_server=debug")),
        )
        .init();

    info!("Starting HunianKita server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        registration_open = config.registration_open,
        bootstrap_admin = config.admin_email.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (runs migrations on open)
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    // Bootstrap admin, applied once while no admin account exists
    seed_admin(&db, &config)?;

    let db = Arc::new(Mutex::new(db));

    // Token gate over the same database handle
    let gate = TokenGate::new(db.clone());

    // Image store (creates directory if missing)
    let images = Arc::new(
        ImageStore::new(config.image_storage_path.clone(), config.max_image_size)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    );

    // JWT keys (random per-boot secret when none is configured)
    let auth_keys = Arc::new(AuthKeys::from_config(config.jwt_secret.as_deref()));

    // Rate limiter: 10 req/s sustained, burst of 30
    let rate_limiter = RateLimiter::default();

    let state = AppState {
        db: db.clone(),
        gate,
        images,
        rate_limiter: rate_limiter.clone(),
        auth_keys,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.purge_stale(600.0).await;
        }
    });

    // Periodic boost expiry sweep (every 10 minutes)
    let sweep_db = db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            let swept = {
                let db = sweep_db.lock().await;
                db.expire_boosts(Utc::now())
            };
            match swept {
                Ok(0) => {}
                Ok(n) => info!(swept = n, "expired boost flags cleared"),
                Err(e) => tracing::error!(error = %e, "boost expiry sweep failed"),
            }
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;

    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

/// Create the bootstrap admin account when configured and none exists yet.
fn seed_admin(db: &Database, config: &ServerConfig) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if db.has_admin()? {
        return Ok(());
    }

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        name: "Administrator".to_string(),
        email: email.trim().to_lowercase(),
        password_hash: auth::hash_password(password).map_err(|e| anyhow::anyhow!("{e}"))?,
        whatsapp: None,
        role: Role::Admin,
        token_balance: 0,
        created_at: now,
        updated_at: now,
    };
    db.create_user(&admin)?;

    info!(email = %admin.email, "bootstrap admin created");
    Ok(())
}
