use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::auth;
use crate::error::AppError;
use crate::models::{
    CreateInquiryRequest, CreateListingRequest, Inquiry, Listing, ListingChanges, LoginRequest,
    UpdateListingRequest,
};
use crate::search::{filter_listings, ListingFilter, SearchParams};
use crate::type_counts::{count_by_category, CategoryCount, PRIORITY_CATEGORIES};
use crate::AppState;

/// Runs blocking store work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

pub async fn search_listings(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let filter = ListingFilter::try_from(params)?;
    let store = state.store.clone();
    let listings = blocking(move || Ok(store.all_listings()?)).await?;

    let matched = filter_listings(listings, &filter);
    log::info!("Listing search matched {} listings", matched.len());
    Ok(Json(matched))
}

pub async fn type_counts(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryCount>>, AppError> {
    let store = state.store.clone();
    let listings = blocking(move || Ok(store.all_listings()?)).await?;
    Ok(Json(count_by_category(&listings, &PRIORITY_CATEGORIES)))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Listing>, AppError> {
    let store = state.store.clone();
    let listing = blocking(move || Ok(store.find_listing(id)?)).await?;
    Ok(Json(listing))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Json(req): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    req.validate()?;
    let store = state.store.clone();
    let allocator = state.allocator.clone();

    let listing = blocking(move || {
        let number = allocator.resolve(req.property_number.as_deref(), store.as_ref());
        let now = Utc::now().naive_utc();
        let new_listing = req.into_new_listing(Some(number.value), number.sequence, now);
        Ok(store.insert_listing(new_listing)?)
    })
    .await?;

    log::info!(
        "Created listing {} ({})",
        listing.id,
        listing.property_number.as_deref().unwrap_or("-")
    );
    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn update_listing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Json<Listing>, AppError> {
    req.validate()?;
    let changes = ListingChanges::from(req);
    let store = state.store.clone();
    let listing = blocking(move || Ok(store.update_listing(id, changes)?)).await?;
    log::info!("Updated listing {}", id);
    Ok(Json(listing))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let store = state.store.clone();
    blocking(move || Ok(store.delete_listing(id)?)).await?;
    log::info!("Deleted listing {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_inquiry(
    State(state): State<AppState>,
    Json(req): Json<CreateInquiryRequest>,
) -> Result<(StatusCode, Json<Inquiry>), AppError> {
    req.validate()?;
    let store = state.store.clone();
    let inquiry = blocking(move || {
        if let Some(listing_id) = req.listing_id {
            store.find_listing(listing_id)?;
        }
        Ok(store.insert_inquiry(req.into_new_inquiry(Utc::now().naive_utc()))?)
    })
    .await?;
    log::info!("Recorded inquiry {} for listing {:?}", inquiry.id, inquiry.listing_id);
    Ok((StatusCode::CREATED, Json(inquiry)))
}

pub async fn list_inquiries(
    State(state): State<AppState>,
) -> Result<Json<Vec<Inquiry>>, AppError> {
    let store = state.store.clone();
    let inquiries = blocking(move || Ok(store.all_inquiries()?)).await?;
    Ok(Json(inquiries))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.username != state.config.admin_username || req.password != state.config.admin_password {
        log::warn!("Failed login attempt for {}", req.username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }
    let token = auth::create_token(&req.username, &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Failed to issue token: {}", e)))?;
    Ok(Json(json!({ "token": token })))
}
