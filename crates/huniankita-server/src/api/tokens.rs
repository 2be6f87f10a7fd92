//! Token balance, ledger history, and the public package menu.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use huniankita_shared::constants::TOKEN_PACKAGES;
use huniankita_store::{TokenCosts, TokenTransaction};

use crate::auth::AuthUser;
use crate::error::ApiError;

use super::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/:id/tokens", get(balance))
        .route("/api/users/:id/token-history", get(history))
        .route("/api/token-packages", get(packages))
}

#[derive(Serialize)]
struct BalanceResponse {
    user_id: Uuid,
    token_balance: i64,
}

/// Balances are private: you see your own, admins see everyone's.
fn check_access(auth: &AuthUser, user_id: Uuid) -> Result<(), ApiError> {
    if !auth.can_manage(user_id) {
        return Err(ApiError::Forbidden("Not your balance".into()));
    }
    Ok(())
}

async fn balance(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, ApiError> {
    check_access(&auth, user_id)?;

    let db = state.db.lock().await;
    Ok(Json(BalanceResponse {
        user_id,
        token_balance: db.token_balance(user_id)?,
    }))
}

#[derive(Deserialize)]
struct HistoryQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TokenTransaction>>, ApiError> {
    check_access(&auth, user_id)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let db = state.db.lock().await;
    // 404 for unknown users rather than an empty history.
    db.token_balance(user_id)?;
    let entries = db.list_token_transactions(user_id, per_page, (page - 1) * per_page)?;
    Ok(Json(entries))
}

#[derive(Serialize)]
struct PackagesResponse {
    packages: Vec<i64>,
    costs: TokenCosts,
}

/// Public pricing data: the top-up menu and what each action costs today.
async fn packages(State(state): State<AppState>) -> Result<Json<PackagesResponse>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(PackagesResponse {
        packages: TOKEN_PACKAGES.to_vec(),
        costs: db.token_costs()?,
    }))
}
