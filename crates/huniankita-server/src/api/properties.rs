//! Listing catalog endpoints: browse, detail, gated create/boost, edit,
//! delete, and listing photos.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use huniankita_shared::constants::{BOOST_WINDOW_DAYS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use huniankita_shared::{ActionKind, Decision, PriceUnit, PropertyStatus, PropertyType};
use huniankita_store::{Property, PropertyFilter, PropertyImage, PropertySort};

use crate::auth::AuthUser;
use crate::error::ApiError;

use super::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/properties", get(list).post(create))
        .route("/api/my/properties", get(list_mine))
        .route("/api/properties/:id", get(detail).put(update).delete(remove))
        .route("/api/properties/:id/boost", post(boost))
        .route(
            "/api/properties/:id/images",
            get(list_images).post(upload_image),
        )
        .route("/api/images/:id", get(serve_image).delete(delete_image))
}

// ---------------------------------------------------------------------------
// Browse
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ListQuery {
    kind: Option<String>,
    city: Option<String>,
    q: Option<String>,
    status: Option<String>,
    sort: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Serialize)]
struct ListResponse {
    items: Vec<Property>,
    total: u64,
    page: u32,
    per_page: u32,
}

fn parse_filter(query: &ListQuery) -> Result<PropertyFilter, ApiError> {
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<PropertyType>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let status = query
        .status
        .as_deref()
        .map(str::parse::<PropertyStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let sort = match query.sort.as_deref() {
        None | Some("newest") => PropertySort::Newest,
        Some("price_asc") => PropertySort::PriceAsc,
        Some("price_desc") => PropertySort::PriceDesc,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("Unknown sort: {other}")));
        }
    };

    Ok(PropertyFilter {
        kind,
        city: query.city.clone().filter(|c| !c.is_empty()),
        query: query.q.clone().filter(|q| !q.is_empty()),
        status,
        owner_id: None,
        sort,
    })
}

fn page_window(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(per_page);
    (page, per_page, offset)
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let filter = parse_filter(&query)?;
    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let db = state.db.lock().await;
    let items = db.list_properties(&filter, per_page, offset)?;
    let total = db.count_properties(&filter)?;

    Ok(Json(ListResponse {
        items,
        total,
        page,
        per_page,
    }))
}

/// The mitra dashboard view: the caller's own listings, whatever status.
async fn list_mine(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let mut filter = parse_filter(&query)?;
    filter.owner_id = Some(auth.id);
    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let db = state.db.lock().await;
    let items = db.list_properties(&filter, per_page, offset)?;
    let total = db.count_properties(&filter)?;

    Ok(Json(ListResponse {
        items,
        total,
        page,
        per_page,
    }))
}

async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Property>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.get_property(id)?))
}

// ---------------------------------------------------------------------------
// Gated create
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreatePropertyRequest {
    title: String,
    description: Option<String>,
    kind: PropertyType,
    city: String,
    address: Option<String>,
    price: i64,
    price_unit: PriceUnit,
    facilities: Option<Vec<String>>,
}

#[derive(Serialize)]
struct PaidActionResponse {
    property: Property,
    /// Balance after the settle, for the client's optimistic display.
    token_balance: i64,
}

async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<PaidActionResponse>), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".into()));
    }
    if req.city.trim().is_empty() {
        return Err(ApiError::BadRequest("City must not be empty".into()));
    }
    if req.price <= 0 {
        return Err(ApiError::BadRequest("Price must be positive".into()));
    }

    let cost = match state.gate.authorize(auth.id, ActionKind::Upload).await? {
        Decision::Approved { cost } => cost,
        Decision::Denied { shortfall, .. } => {
            return Err(ApiError::InsufficientTokens { shortfall });
        }
    };

    let now = Utc::now();
    let property = Property {
        id: Uuid::new_v4(),
        owner_id: auth.id,
        title: req.title.trim().to_string(),
        description: req.description,
        kind: req.kind,
        city: req.city.trim().to_string(),
        address: req.address,
        price: req.price,
        price_unit: req.price_unit,
        status: PropertyStatus::Available,
        facilities: req.facilities.unwrap_or_default(),
        is_boosted: false,
        boost_expires_at: None,
        is_featured: false,
        created_at: now,
        updated_at: now,
    };

    // Listing insert + conditional debit + ledger append commit together;
    // a balance that moved since authorize rolls the whole thing back.
    let token_balance = {
        let mut db = state.db.lock().await;
        db.create_property_paid(&property, cost)?
    };

    Ok((
        StatusCode::CREATED,
        Json(PaidActionResponse {
            property,
            token_balance,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Edit / delete
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct UpdatePropertyRequest {
    title: Option<String>,
    description: Option<String>,
    kind: Option<PropertyType>,
    city: Option<String>,
    address: Option<String>,
    price: Option<i64>,
    price_unit: Option<PriceUnit>,
    status: Option<PropertyStatus>,
    facilities: Option<Vec<String>>,
}

async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePropertyRequest>,
) -> Result<Json<Property>, ApiError> {
    let db = state.db.lock().await;
    let mut property = db.get_property(id)?;

    if !auth.can_manage(property.owner_id) {
        return Err(ApiError::Forbidden("Not your listing".into()));
    }

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(ApiError::BadRequest("Title must not be empty".into()));
        }
        property.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        property.description = Some(description);
    }
    if let Some(kind) = req.kind {
        property.kind = kind;
    }
    if let Some(city) = req.city {
        property.city = city;
    }
    if let Some(address) = req.address {
        property.address = Some(address);
    }
    if let Some(price) = req.price {
        if price <= 0 {
            return Err(ApiError::BadRequest("Price must be positive".into()));
        }
        property.price = price;
    }
    if let Some(price_unit) = req.price_unit {
        property.price_unit = price_unit;
    }
    if let Some(status) = req.status {
        property.status = status;
    }
    if let Some(facilities) = req.facilities {
        property.facilities = facilities;
    }

    db.update_property(&property)?;
    Ok(Json(db.get_property(id)?))
}

async fn remove(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let images = {
        let db = state.db.lock().await;
        let property = db.get_property(id)?;

        if !auth.can_manage(property.owner_id) {
            return Err(ApiError::Forbidden("Not your listing".into()));
        }

        // Grab the image rows before the cascade wipes them.
        let images = db.list_property_images(id)?;
        db.delete_property(id)?;
        images
    };

    for image in &images {
        if let Err(e) = state.images.delete_image(image.id).await {
            warn!(image = %image.id, error = %e, "failed to remove image file");
        }
    }

    info!(property = %id, by = %auth.id, "listing deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Gated boost
// ---------------------------------------------------------------------------

async fn boost(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaidActionResponse>, ApiError> {
    {
        let db = state.db.lock().await;
        let property = db.get_property(id)?;
        if property.owner_id != auth.id {
            return Err(ApiError::Forbidden("Not your listing".into()));
        }
    }

    let cost = match state.gate.authorize(auth.id, ActionKind::Boost).await? {
        Decision::Approved { cost } => cost,
        Decision::Denied { shortfall, .. } => {
            return Err(ApiError::InsufficientTokens { shortfall });
        }
    };

    let token_balance = state.gate.settle(auth.id, ActionKind::Boost, cost).await?;

    let until = Utc::now() + Duration::days(BOOST_WINDOW_DAYS);
    let flagged = {
        let db = state.db.lock().await;
        db.set_property_boost(id, until)
    };

    if let Err(e) = flagged {
        // The debit went through but the flag did not; give the tokens back.
        warn!(property = %id, error = %e, "boost flag failed after settle, refunding");
        let mut db = state.db.lock().await;
        db.credit_tokens(auth.id, cost, "boost_refund")?;
        return Err(e.into());
    }

    info!(property = %id, user = %auth.id, until = %until, "listing boosted");

    let db = state.db.lock().await;
    Ok(Json(PaidActionResponse {
        property: db.get_property(id)?,
        token_balance,
    }))
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

async fn upload_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PropertyImage>), ApiError> {
    {
        let db = state.db.lock().await;
        let property = db.get_property(property_id)?;
        if !auth.can_manage(property.owner_id) {
            return Err(ApiError::Forbidden("Not your listing".into()));
        }
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("photo").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;

            let image_id = Uuid::new_v4();
            state.images.store_image(image_id, &data).await?;

            let record = PropertyImage {
                id: image_id,
                property_id,
                file_name,
                file_size: data.len() as i64,
                created_at: Utc::now(),
            };

            let inserted = {
                let db = state.db.lock().await;
                db.create_property_image(&record)
            };
            if let Err(e) = inserted {
                // Don't leave an orphan file behind a failed metadata row.
                let _ = state.images.delete_image(image_id).await;
                return Err(e.into());
            }

            info!(image = %image_id, property = %property_id, size = data.len(), "photo uploaded");
            return Ok((StatusCode::CREATED, Json(record)));
        }
    }

    Err(ApiError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

async fn list_images(
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
) -> Result<Json<Vec<PropertyImage>>, ApiError> {
    let db = state.db.lock().await;
    // 404 for unknown listings rather than an empty list.
    db.get_property(property_id)?;
    Ok(Json(db.list_property_images(property_id)?))
}

async fn serve_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (data, mime) = state.images.get_image(id).await?;
    Ok(([(header::CONTENT_TYPE, mime)], data))
}

async fn delete_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    {
        let db = state.db.lock().await;
        let record = db.get_property_image(id)?;
        let property = db.get_property(record.property_id)?;
        if !auth.can_manage(property.owner_id) {
            return Err(ApiError::Forbidden("Not your listing".into()));
        }
        db.delete_property_image(id)?;
    }

    state.images.delete_image(id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
