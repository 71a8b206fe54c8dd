//! Listing search: conjunctive filters over the whole collection, newest first.

use serde::Deserialize;
use thiserror::Error;

use crate::models::{is_truthy_str, Listing, ParseTransactionTypeError, TransactionType};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("{field} must be a number, got `{value}`")]
    InvalidNumber { field: &'static str, value: String },

    #[error(transparent)]
    InvalidTransactionType(#[from] ParseTransactionTypeError),
}

/// Raw query string parameters. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub transaction_type: Option<String>,
    #[serde(alias = "propertyType")]
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_beds: Option<String>,
    pub min_baths: Option<String>,
    pub featured: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListingFilter {
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_beds: Option<i32>,
    pub min_baths: Option<i32>,
    pub featured: Option<bool>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn number<T: std::str::FromStr>(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<T>, FilterError> {
    present(value)
        .map(|v| {
            v.parse()
                .map_err(|_| FilterError::InvalidNumber { field, value: v })
        })
        .transpose()
}

/// Like [`number`], but `NaN` and the infinities are rejected too.
fn price(field: &'static str, value: Option<String>) -> Result<Option<f64>, FilterError> {
    present(value)
        .map(|v| match v.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(FilterError::InvalidNumber { field, value: v }),
        })
        .transpose()
}

impl TryFrom<SearchParams> for ListingFilter {
    type Error = FilterError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        Ok(ListingFilter {
            transaction_type: present(params.transaction_type)
                .map(|v| v.parse::<TransactionType>())
                .transpose()?,
            category: present(params.category),
            location: present(params.location),
            min_price: price("minPrice", params.min_price)?,
            max_price: price("maxPrice", params.max_price)?,
            min_beds: number("minBeds", params.min_beds)?,
            min_baths: number("minBaths", params.min_baths)?,
            featured: present(params.featured).map(|v| is_truthy_str(&v)),
        })
    }
}

impl ListingFilter {
    /// True when `listing` passes every filter that is set.
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(tt) = self.transaction_type {
            if listing.transaction_type != tt {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &listing.category != category {
                return false;
            }
        }
        if let Some(term) = &self.location {
            let term = term.to_lowercase();
            let in_location = listing.location.to_lowercase().contains(&term);
            let in_address = listing
                .address
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&term));
            if !in_location && !in_address {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }
        if self.min_beds.is_some_and(|min| listing.beds < min) {
            return false;
        }
        if self.min_baths.is_some_and(|min| listing.baths < min) {
            return false;
        }
        if let Some(featured) = self.featured {
            if listing.featured != featured {
                return false;
            }
        }
        true
    }
}

/// Keeps the listings passing `filter`, sorted by `created_at` descending.
/// Equal timestamps keep their input order.
pub fn filter_listings(listings: Vec<Listing>, filter: &ListingFilter) -> Vec<Listing> {
    let mut matched: Vec<Listing> = listings.into_iter().filter(|l| filter.matches(l)).collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matched
}
