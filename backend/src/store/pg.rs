use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::{ListingStore, NumberedListing, StoreError};
use crate::db::DbPool;
use crate::models::{Inquiry, Listing, ListingChanges, NewInquiry, NewListing};
use crate::schema::{inquiries, listings};

type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PgPooled, StoreError> {
        self.pool.get().map_err(|e| {
            log::error!("Failed to check out database connection: {}", e);
            StoreError::Unavailable(e.to_string())
        })
    }
}

/// Escapes LIKE wildcards so the prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn map_insert_error(err: DieselError, property_number: Option<&str>) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Duplicate(property_number.unwrap_or_default().to_string())
        }
        other => StoreError::Query(other),
    }
}

impl ListingStore for PgStore {
    fn numbered_with_prefix(&self, prefix: &str) -> Result<Vec<NumberedListing>, StoreError> {
        let mut conn = self.conn()?;
        let rows = listings::table
            .filter(listings::property_number.like(like_prefix(prefix)))
            .order(listings::property_number.desc())
            .select((listings::property_number, listings::property_sequence))
            .load::<(Option<String>, Option<i64>)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .filter_map(|(number, sequence)| {
                number.map(|property_number| NumberedListing {
                    property_number,
                    sequence,
                })
            })
            .collect())
    }

    fn all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        let mut conn = self.conn()?;
        Ok(listings::table
            .order(listings::id.asc())
            .select(Listing::as_select())
            .load(&mut conn)?)
    }

    fn find_listing(&self, id: i32) -> Result<Listing, StoreError> {
        let mut conn = self.conn()?;
        listings::table
            .find(id)
            .select(Listing::as_select())
            .first(&mut conn)
            .map_err(|e| match e {
                DieselError::NotFound => StoreError::NotFound(id),
                other => StoreError::Query(other),
            })
    }

    fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let mut conn = self.conn()?;
        diesel::insert_into(listings::table)
            .values(&listing)
            .returning(Listing::as_returning())
            .get_result(&mut conn)
            .map_err(|e| map_insert_error(e, listing.property_number.as_deref()))
    }

    fn update_listing(&self, id: i32, changes: ListingChanges) -> Result<Listing, StoreError> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();
        diesel::update(listings::table.find(id))
            .set((&changes, listings::updated_at.eq(now)))
            .returning(Listing::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match e {
                DieselError::NotFound => StoreError::NotFound(id),
                other => StoreError::Query(other),
            })
    }

    fn delete_listing(&self, id: i32) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(listings::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn insert_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(inquiries::table)
            .values(&inquiry)
            .returning(Inquiry::as_returning())
            .get_result(&mut conn)?)
    }

    fn all_inquiries(&self) -> Result<Vec<Inquiry>, StoreError> {
        let mut conn = self.conn()?;
        Ok(inquiries::table
            .order((inquiries::created_at.desc(), inquiries::id.desc()))
            .select(Inquiry::as_select())
            .load(&mut conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("MDP-"), "MDP-%");
        assert_eq!(like_prefix("A_B%"), "A\\_B\\%%");
    }
}
