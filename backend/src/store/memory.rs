use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{ListingStore, NumberedListing, StoreError};
use crate::models::{Inquiry, Listing, ListingChanges, NewInquiry, NewListing};

#[derive(Default)]
struct MemoryState {
    listings: Vec<Listing>,
    inquiries: Vec<Inquiry>,
    next_listing_id: i32,
    next_inquiry_id: i32,
}

/// Process-local store with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".into()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store poisoned".into()))
    }
}

impl ListingStore for InMemoryStore {
    fn numbered_with_prefix(&self, prefix: &str) -> Result<Vec<NumberedListing>, StoreError> {
        let state = self.state()?;
        let mut numbered: Vec<NumberedListing> = state
            .listings
            .iter()
            .filter_map(|l| {
                l.property_number
                    .as_ref()
                    .filter(|n| n.starts_with(prefix))
                    .map(|n| NumberedListing {
                        property_number: n.clone(),
                        sequence: l.property_sequence,
                    })
            })
            .collect();
        numbered.sort_by(|a, b| b.property_number.cmp(&a.property_number));
        Ok(numbered)
    }

    fn all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(self.state()?.listings.clone())
    }

    fn find_listing(&self, id: i32) -> Result<Listing, StoreError> {
        self.state()?
            .listings
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let mut state = self.state()?;
        if let Some(number) = &listing.property_number {
            if state
                .listings
                .iter()
                .any(|l| l.property_number.as_ref() == Some(number))
            {
                return Err(StoreError::Duplicate(number.clone()));
            }
        }

        state.next_listing_id += 1;
        let stored = Listing {
            id: state.next_listing_id,
            property_number: listing.property_number,
            property_sequence: listing.property_sequence,
            title: listing.title,
            description: listing.description,
            transaction_type: listing.transaction_type,
            category: listing.category,
            price: listing.price,
            area: listing.area,
            beds: listing.beds,
            baths: listing.baths,
            location: listing.location,
            address: listing.address,
            featured: listing.featured,
            status: listing.status,
            created_at: listing.created_at,
            updated_at: listing.updated_at,
        };
        state.listings.push(stored.clone());
        Ok(stored)
    }

    fn update_listing(&self, id: i32, changes: ListingChanges) -> Result<Listing, StoreError> {
        let mut state = self.state()?;
        let listing = state
            .listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(title) = changes.title {
            listing.title = title;
        }
        if let Some(description) = changes.description {
            listing.description = Some(description);
        }
        if let Some(transaction_type) = changes.transaction_type {
            listing.transaction_type = transaction_type;
        }
        if let Some(category) = changes.category {
            listing.category = category;
        }
        if let Some(price) = changes.price {
            listing.price = price;
        }
        if let Some(area) = changes.area {
            listing.area = Some(area);
        }
        if let Some(beds) = changes.beds {
            listing.beds = beds;
        }
        if let Some(baths) = changes.baths {
            listing.baths = baths;
        }
        if let Some(location) = changes.location {
            listing.location = location;
        }
        if let Some(address) = changes.address {
            listing.address = Some(address);
        }
        if let Some(featured) = changes.featured {
            listing.featured = featured;
        }
        if let Some(status) = changes.status {
            listing.status = status;
        }
        listing.updated_at = chrono::Utc::now().naive_utc();

        Ok(listing.clone())
    }

    fn delete_listing(&self, id: i32) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let before = state.listings.len();
        state.listings.retain(|l| l.id != id);
        if state.listings.len() == before {
            return Err(StoreError::NotFound(id));
        }
        for inquiry in state.inquiries.iter_mut() {
            if inquiry.listing_id == Some(id) {
                inquiry.listing_id = None;
            }
        }
        Ok(())
    }

    fn insert_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        let mut state = self.state()?;
        state.next_inquiry_id += 1;
        let stored = Inquiry {
            id: state.next_inquiry_id,
            listing_id: inquiry.listing_id,
            name: inquiry.name,
            email: inquiry.email,
            phone: inquiry.phone,
            message: inquiry.message,
            created_at: inquiry.created_at,
        };
        state.inquiries.push(stored.clone());
        Ok(stored)
    }

    fn all_inquiries(&self) -> Result<Vec<Inquiry>, StoreError> {
        let mut inquiries = self.state()?.inquiries.clone();
        inquiries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(inquiries)
    }
}
