//! Registration, login, and the current-user endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use huniankita_shared::Role;
use huniankita_store::{StoreError, User};

use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::error::ApiError;

use super::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    whatsapp: Option<String>,
    /// `guest` (default) or `mitra`.  Admin accounts are never created here.
    role: Option<Role>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(serde::Serialize)]
struct AuthResponse {
    token: String,
    user: User,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if !state.config.registration_open {
        return Err(ApiError::Forbidden("Registration is closed".into()));
    }

    let role = req.role.unwrap_or(Role::Guest);
    if role == Role::Admin {
        return Err(ApiError::Forbidden(
            "Admin accounts cannot be self-registered".into(),
        ));
    }

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email,
        password_hash: hash_password(&req.password)?,
        whatsapp: req.whatsapp,
        role,
        token_balance: 0,
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().await;
        db.create_user(&user).map_err(|e| match e {
            StoreError::AlreadyExists => {
                ApiError::Conflict("Email is already registered".into())
            }
            other => other.into(),
        })?;
    }

    info!(user = %user.id, role = %user.role, "account registered");

    let token = issue_token(&state.auth_keys, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let user = {
        let db = state.db.lock().await;
        db.get_user_by_email(&email).map_err(|e| match e {
            // One message for both failure modes.
            StoreError::NotFound => ApiError::Unauthorized("Invalid email or password".into()),
            other => other.into(),
        })?
    };

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    info!(user = %user.id, "login");

    let token = issue_token(&state.auth_keys, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

async fn me(auth: AuthUser, State(state): State<AppState>) -> Result<Json<User>, ApiError> {
    let db = state.db.lock().await;
    let user = db.get_user(auth.id)?;
    Ok(Json(user))
}
