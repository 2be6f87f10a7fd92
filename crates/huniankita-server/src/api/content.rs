//! Site content: publicly readable copy (footer, landing page, pricing),
//! writable from the admin dashboard.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use huniankita_store::SiteContent;

use crate::auth::AuthUser;
use crate::error::ApiError;

use super::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/content", get(list_content))
        .route("/api/content/:key", get(get_content))
        .route("/api/admin/content/:key", put(put_content))
}

async fn list_content(State(state): State<AppState>) -> Result<Json<Vec<SiteContent>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_content()?))
}

async fn get_content(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SiteContent>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.get_content(&key)?))
}

#[derive(Deserialize)]
struct PutContentRequest {
    value: String,
}

async fn put_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<PutContentRequest>,
) -> Result<Json<SiteContent>, ApiError> {
    auth.require_admin()?;

    let db = state.db.lock().await;
    let entry = db.set_content(&key, &req.value)?;

    info!(key = %key, by = %auth.id, "site content updated");
    Ok(Json(entry))
}
