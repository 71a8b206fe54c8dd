//! Persistence seam for listings and inquiries.
//!
//! [`ListingStore`] is what the numbering, search and HTTP layers talk to.
//! [`pg::PgStore`] backs it with Postgres through diesel; [`memory::InMemoryStore`]
//! keeps everything in a `Vec` and is what the tests run against.
//!
//! All methods are blocking. Async callers go through `spawn_blocking`.

use thiserror::Error;

use crate::models::{Inquiry, Listing, ListingChanges, NewInquiry, NewListing};

pub mod memory;
pub mod pg;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Listing {0} not found")]
    NotFound(i32),

    #[error("Property number {0} is already taken")]
    Duplicate(String),

    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),
}

/// A persisted property number together with its stored sequence value.
///
/// `sequence` is `None` for rows written before the sequence column existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedListing {
    pub property_number: String,
    pub sequence: Option<i64>,
}

pub trait ListingStore: Send + Sync {
    /// Numbers starting with `prefix` (case-sensitive), descending by raw string value.
    fn numbered_with_prefix(&self, prefix: &str) -> Result<Vec<NumberedListing>, StoreError>;

    /// Every listing, oldest insert first.
    fn all_listings(&self) -> Result<Vec<Listing>, StoreError>;

    fn find_listing(&self, id: i32) -> Result<Listing, StoreError>;

    fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError>;

    fn update_listing(&self, id: i32, changes: ListingChanges) -> Result<Listing, StoreError>;

    fn delete_listing(&self, id: i32) -> Result<(), StoreError>;

    fn insert_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError>;

    /// Every inquiry, newest first.
    fn all_inquiries(&self) -> Result<Vec<Inquiry>, StoreError>;
}
