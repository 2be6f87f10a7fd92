//! Admin dashboard endpoints: token top-ups, cost settings, user management,
//! and landing-page curation.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use huniankita_shared::ActionKind;
use huniankita_store::{TokenCosts, User};

use crate::auth::AuthUser;
use crate::error::ApiError;

use super::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/add-tokens", post(add_tokens))
        .route(
            "/api/admin/token-settings",
            get(get_token_settings).put(put_token_settings),
        )
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id", delete(delete_user))
        .route("/api/admin/properties/:id/feature", post(set_featured))
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AddTokensRequest {
    user_id: Uuid,
    tokens: i64,
}

#[derive(Serialize)]
struct AddTokensResponse {
    user_id: Uuid,
    token_balance: i64,
}

async fn add_tokens(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AddTokensRequest>,
) -> Result<Json<AddTokensResponse>, ApiError> {
    // The gate re-reads the caller's role from storage.
    let token_balance = state.gate.grant(auth.id, req.user_id, req.tokens).await?;

    Ok(Json(AddTokensResponse {
        user_id: req.user_id,
        token_balance,
    }))
}

#[derive(Deserialize)]
struct TokenSettingsRequest {
    upload: Option<i64>,
    boost: Option<i64>,
}

async fn get_token_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TokenCosts>, ApiError> {
    auth.require_admin()?;
    let db = state.db.lock().await;
    Ok(Json(db.token_costs()?))
}

async fn put_token_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TokenSettingsRequest>,
) -> Result<Json<TokenCosts>, ApiError> {
    if let Some(cost) = req.upload {
        state.gate.set_cost(auth.id, ActionKind::Upload, cost).await?;
    }
    if let Some(cost) = req.boost {
        state.gate.set_cost(auth.id, ActionKind::Boost, cost).await?;
    }

    let db = state.db.lock().await;
    Ok(Json(db.token_costs()?))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ListUsersQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);

    let db = state.db.lock().await;
    Ok(Json(db.list_users(per_page, (page - 1) * per_page)?))
}

async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require_admin()?;

    if user_id == auth.id {
        return Err(ApiError::BadRequest(
            "Admins cannot delete their own account".into(),
        ));
    }

    // Collect this user's image files before the cascade removes the rows.
    let images = {
        let db = state.db.lock().await;
        db.get_user(user_id)?;
        let images = db.list_images_for_owner(user_id)?;
        db.delete_user(user_id)?;
        images
    };

    for image in &images {
        if let Err(e) = state.images.delete_image(image.id).await {
            warn!(image = %image.id, error = %e, "failed to remove image file");
        }
    }

    info!(user = %user_id, by = %auth.id, "account deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Curation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FeatureRequest {
    featured: bool,
}

async fn set_featured(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
    Json(req): Json<FeatureRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require_admin()?;

    let db = state.db.lock().await;
    db.set_property_featured(property_id, req.featured)?;

    Ok(Json(serde_json::json!({ "featured": req.featured })))
}
