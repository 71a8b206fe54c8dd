//! Listing backend for the property marketplace.
//!
//! Serves listing search, per-category counts and admin CRUD over Postgres,
//! and hands out `MDP-NNNN` property numbers to new listings.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod numbering;
pub mod schema;
pub mod search;
pub mod store;
pub mod type_counts;

use crate::config::AppConfig;
use crate::numbering::IdentifierAllocator;
use crate::store::ListingStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ListingStore>,
    pub allocator: Arc<IdentifierAllocator>,
}

impl AppState {
    /// One allocator per process; every request shares it through this state.
    pub fn new(config: AppConfig, store: Arc<dyn ListingStore>) -> Self {
        let allocator = IdentifierAllocator::new(
            config.property_number_prefix.clone(),
            config.property_number_width,
        );
        Self {
            config: Arc::new(config),
            store,
            allocator: Arc::new(allocator),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/listings", post(handlers::create_listing))
        .route(
            "/api/admin/listings/:id",
            put(handlers::update_listing).delete(handlers::delete_listing),
        )
        .route("/api/admin/inquiries", get(handlers::list_inquiries))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::authenticate));

    Router::new()
        .route("/", get(|| async { "Hello, Real Estate Marketplace!" }))
        .route("/api/login", post(handlers::login))
        .route("/api/listings", get(handlers::search_listings))
        .route("/api/listings/type-counts", get(handlers::type_counts))
        .route("/api/listings/:id", get(handlers::get_listing))
        .route("/api/inquiries", post(handlers::create_inquiry))
        .merge(admin_routes)
        .with_state(state)
}
