use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::Listing;

/// Categories shown first, in this order, whenever they have listings.
pub const PRIORITY_CATEGORIES: [&str; 4] = ["House", "Apartment", "Villa", "Commercial"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Listing counts per category: `priority` entries first in their given
/// order, then every other category in ordinal (byte-wise) order.
/// Priority categories without listings are left out.
pub fn count_by_category(listings: &[Listing], priority: &[&str]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for listing in listings {
        *counts.entry(listing.category.as_str()).or_insert(0) += 1;
    }

    let mut ordered = Vec::with_capacity(counts.len());
    for category in priority {
        if let Some(&count) = counts.get(category) {
            ordered.push(CategoryCount {
                category: category.to_string(),
                count,
            });
        }
    }
    ordered.extend(
        counts
            .into_iter()
            .filter(|(category, _)| !priority.contains(category))
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            }),
    );
    ordered
}
