//! Property number allocation (`MDP-0042` style identifiers).
//!
//! The next number is one past the larger of two values: the highest sequence
//! already persisted under the prefix, and the highest number this process has
//! handed out. The second value covers requests that allocated but have not
//! committed their row yet, so two in-flight creations never get the same
//! number. Across several processes there is no such guarantee.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use thiserror::Error;

use crate::store::{ListingStore, StoreError};

/// Requested property number that asks for automatic allocation.
pub const AUTO_SENTINEL: &str = "auto";

#[derive(Debug, Error)]
#[error("allocation source unavailable: {0}")]
pub struct AllocationSourceUnavailable(#[from] pub StoreError);

/// Numeric suffix of `number` under `prefix`, allowing one uppercase classification
/// letter before the digits (`MDP-B0123`). `None` when the number does not fit,
/// including digit runs above `i64::MAX`, which the sequence column cannot hold.
pub fn parse_sequence(prefix: &str, number: &str) -> Option<u64> {
    let rest = number.strip_prefix(prefix)?;
    let digits = match rest.chars().next() {
        Some(c) if c.is_ascii_uppercase() => &rest[1..],
        _ => rest,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sequence = digits.parse::<i64>().ok()?;
    u64::try_from(sequence).ok()
}

/// Missing input is handled by the caller; this covers blank and `auto` values.
fn is_auto_request(requested: &str) -> bool {
    let trimmed = requested.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO_SENTINEL)
}

/// Highest sequence persisted under `prefix`, or 0 when there is none.
///
/// Rows carrying a stored sequence are trusted as-is; older rows are parsed
/// from their display number. Rows that do not parse are skipped.
pub fn scan_max_sequence(
    store: &dyn ListingStore,
    prefix: &str,
) -> Result<u64, AllocationSourceUnavailable> {
    let numbered = store.numbered_with_prefix(prefix)?;
    let max = numbered
        .iter()
        .filter_map(|n| {
            n.sequence
                .and_then(|s| u64::try_from(s).ok())
                .or_else(|| parse_sequence(prefix, &n.property_number))
        })
        .max()
        .unwrap_or(0);
    Ok(max)
}

/// A resolved property number and the sequence value to store beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNumber {
    pub value: String,
    pub sequence: Option<i64>,
}

#[derive(Debug)]
pub struct IdentifierAllocator {
    prefix: String,
    width: usize,
    high_water: AtomicU64,
}

impl IdentifierAllocator {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            high_water: AtomicU64::new(0),
        }
    }

    /// Zero-padded to the configured width; longer numbers are never truncated.
    pub fn format(&self, sequence: u64) -> String {
        format!("{}{:0width$}", self.prefix, sequence, width = self.width)
    }

    /// Uses `requested` verbatim unless it is missing, blank or the auto sentinel.
    pub fn resolve(&self, requested: Option<&str>, store: &dyn ListingStore) -> PropertyNumber {
        match requested {
            Some(value) if !is_auto_request(value) => {
                PropertyNumber {
                    value: value.to_string(),
                    sequence: parse_sequence(&self.prefix, value)
                        .and_then(|s| i64::try_from(s).ok()),
                }
            }
            _ => self.allocate(store),
        }
    }

    /// Never fails: when the store cannot be scanned the number falls back to
    /// the last six digits of the current epoch milliseconds.
    pub fn allocate(&self, store: &dyn ListingStore) -> PropertyNumber {
        let persisted = match scan_max_sequence(store, &self.prefix) {
            Ok(persisted) => persisted,
            Err(e) => {
                log::warn!("{}; using timestamp property number", e);
                return self.fallback();
            }
        };
        let Some(next) = self.bump(persisted) else {
            log::warn!("Sequence exhausted past {}; using timestamp property number", persisted);
            return self.fallback();
        };
        log::debug!("Allocated sequence {} (persisted max {})", next, persisted);
        PropertyNumber {
            value: self.format(next),
            sequence: i64::try_from(next).ok(),
        }
    }

    /// Raises the high-water mark past `persisted` in one atomic step and
    /// returns the new value. `None` once the sequence cannot grow within
    /// `i64`; the mark is left as it was.
    fn bump(&self, persisted: u64) -> Option<u64> {
        let ceiling = i64::MAX as u64;
        let next_after = |hw: u64| hw.max(persisted).checked_add(1).filter(|n| *n <= ceiling);
        self.high_water
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, next_after)
            .ok()
            .and_then(next_after)
    }

    fn fallback(&self) -> PropertyNumber {
        let suffix = Utc::now().timestamp_millis().rem_euclid(1_000_000);
        PropertyNumber {
            value: format!("{}{:06}", self.prefix, suffix),
            sequence: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::store::memory::tests::new_listing;
    use crate::store::memory::InMemoryStore;

    fn store_with(numbers: &[&str]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for number in numbers {
            store.insert_listing(new_listing(Some(*number))).unwrap();
        }
        store
    }

    #[test]
    fn parses_plain_lettered_and_padded_numbers() {
        assert_eq!(parse_sequence("MDP-", "MDP-0042"), Some(42));
        assert_eq!(parse_sequence("MDP-", "MDP-5"), Some(5));
        assert_eq!(parse_sequence("MDP-", "MDP-B0123"), Some(123));
        assert_eq!(parse_sequence("MDP-", "MDP-R017"), Some(17));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(parse_sequence("MDP-", "MDP-"), None);
        assert_eq!(parse_sequence("MDP-", "MDP-B"), None);
        assert_eq!(parse_sequence("MDP-", "MDP-12a"), None);
        assert_eq!(parse_sequence("MDP-", "MDP-AB12"), None);
        assert_eq!(parse_sequence("MDP-", "XYZ-0001"), None);
        assert_eq!(parse_sequence("MDP-", "MDP-99999999999999999999999"), None);
        assert_eq!(parse_sequence("MDP-", "MDP-18446744073709551615"), None);
        assert_eq!(parse_sequence("MDP-", "MDP-9223372036854775808"), None);
        assert_eq!(
            parse_sequence("MDP-", "MDP-9223372036854775807"),
            Some(i64::MAX as u64)
        );
    }

    #[test]
    fn scan_compares_numerically_not_lexically() {
        let store = store_with(&["MDP-9", "MDP-10"]);
        assert_eq!(scan_max_sequence(&store, "MDP-").unwrap(), 10);

        let store = store_with(&["MDP-0005", "MDP-12", "MDP-B0007"]);
        assert_eq!(scan_max_sequence(&store, "MDP-").unwrap(), 12);
    }

    #[test]
    fn scan_skips_malformed_rows() {
        let store = store_with(&["MDP-draft", "MDP-0003", "MDP-x9"]);
        assert_eq!(scan_max_sequence(&store, "MDP-").unwrap(), 3);
    }

    #[test]
    fn scan_of_empty_store_is_zero() {
        assert_eq!(scan_max_sequence(&InMemoryStore::new(), "MDP-").unwrap(), 0);
    }

    #[test]
    fn scan_prefers_stored_sequence() {
        let store = InMemoryStore::new();
        let mut listing = new_listing(Some("MDP-0001"));
        listing.property_sequence = Some(250);
        store.insert_listing(listing).unwrap();
        assert_eq!(scan_max_sequence(&store, "MDP-").unwrap(), 250);
    }

    #[test]
    fn scan_failure_is_allocation_source_unavailable() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(scan_max_sequence(&store, "MDP-").is_err());
    }

    #[test]
    fn pads_without_truncating() {
        let store = store_with(&["MDP-0099"]);
        let allocator = IdentifierAllocator::new("MDP-", 4);
        assert_eq!(allocator.allocate(&store).value, "MDP-0100");

        let store = store_with(&["MDP-9999"]);
        let allocator = IdentifierAllocator::new("MDP-", 4);
        let number = allocator.allocate(&store);
        assert_eq!(number.value, "MDP-10000");
        assert_eq!(number.sequence, Some(10000));
    }

    #[test]
    fn first_allocation_on_empty_store_is_one() {
        let allocator = IdentifierAllocator::new("MDP-", 4);
        assert_eq!(allocator.allocate(&InMemoryStore::new()).value, "MDP-0001");
    }

    #[test]
    fn allocations_are_strictly_increasing_without_persisting() {
        let store = store_with(&["MDP-0007"]);
        let allocator = IdentifierAllocator::new("MDP-", 4);
        let sequences: Vec<i64> = (0..5)
            .map(|_| allocator.allocate(&store).sequence.unwrap())
            .collect();
        assert_eq!(sequences, vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn unpersisted_allocations_never_collide() {
        let store = InMemoryStore::new();
        let allocator = IdentifierAllocator::new("MDP-", 4);
        let first = allocator.allocate(&store);
        let second = allocator.allocate(&store);
        assert_ne!(first.value, second.value);
    }

    #[test]
    fn concurrent_allocations_are_unique() {
        let store = Arc::new(store_with(&["MDP-0040"]));
        let allocator = Arc::new(IdentifierAllocator::new("MDP-", 4));

        let numbers: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let allocator = Arc::clone(&allocator);
                    scope.spawn(move || {
                        (0..50)
                            .map(|_| allocator.allocate(store.as_ref()).value)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<&String> = numbers.iter().collect();
        assert_eq!(unique.len(), 400);
        assert!(!unique.contains(&"MDP-0040".to_string()));
    }

    #[test]
    fn follows_numbers_written_by_others() {
        let store = InMemoryStore::new();
        let allocator = IdentifierAllocator::new("MDP-", 4);
        assert_eq!(allocator.allocate(&store).value, "MDP-0001");

        store.insert_listing(new_listing(Some("MDP-0500"))).unwrap();
        assert_eq!(allocator.allocate(&store).value, "MDP-0501");
    }

    #[test]
    fn deleted_numbers_are_not_reused() {
        let store = InMemoryStore::new();
        let allocator = IdentifierAllocator::new("MDP-", 4);

        let number = allocator.allocate(&store);
        let mut listing = new_listing(Some(number.value.as_str()));
        listing.property_sequence = number.sequence;
        let stored = store.insert_listing(listing).unwrap();
        store.delete_listing(stored.id).unwrap();

        assert_eq!(allocator.allocate(&store).value, "MDP-0002");
    }

    #[test]
    fn falls_back_to_timestamp_when_store_is_down() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let allocator = IdentifierAllocator::new("MDP-", 4);

        let number = allocator.allocate(&store);
        let suffix = number.value.strip_prefix("MDP-").unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(number.sequence, None);
    }

    #[test]
    fn explicit_numbers_bypass_allocation() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let allocator = IdentifierAllocator::new("MDP-", 4);

        let number = allocator.resolve(Some("MDP-B0077"), &store);
        assert_eq!(number.value, "MDP-B0077");
        assert_eq!(number.sequence, Some(77));

        let custom = allocator.resolve(Some("LEGACY-1"), &store);
        assert_eq!(custom.value, "LEGACY-1");
        assert_eq!(custom.sequence, None);
    }

    #[test]
    fn sentinel_and_blank_requests_allocate() {
        let store = InMemoryStore::new();
        let allocator = IdentifierAllocator::new("MDP-", 4);
        assert_eq!(allocator.resolve(Some("AUTO"), &store).value, "MDP-0001");
        assert_eq!(allocator.resolve(Some("  "), &store).value, "MDP-0002");
        assert_eq!(allocator.resolve(None, &store).value, "MDP-0003");
    }

    #[test]
    fn oversized_explicit_numbers_do_not_break_allocation() {
        let store = InMemoryStore::new();
        let allocator = IdentifierAllocator::new("MDP-", 4);

        let huge = allocator.resolve(Some("MDP-18446744073709551615"), &store);
        assert_eq!(huge.value, "MDP-18446744073709551615");
        assert_eq!(huge.sequence, None);
        let mut listing = new_listing(Some(huge.value.as_str()));
        listing.property_sequence = huge.sequence;
        store.insert_listing(listing).unwrap();

        assert_eq!(scan_max_sequence(&store, "MDP-").unwrap(), 0);
        assert_eq!(allocator.allocate(&store).value, "MDP-0001");
    }

    #[test]
    fn exhausted_sequence_falls_back_to_timestamp() {
        let store = InMemoryStore::new();
        let mut listing = new_listing(Some("MDP-9223372036854775807"));
        listing.property_sequence = Some(i64::MAX);
        store.insert_listing(listing).unwrap();
        let allocator = IdentifierAllocator::new("MDP-", 4);

        let number = allocator.allocate(&store);
        assert_eq!(number.sequence, None);
        assert_eq!(number.value.len(), "MDP-".len() + 6);
        assert_eq!(allocator.allocate(&store).sequence, None);
    }

    #[test]
    fn explicit_numbers_are_stored_untrimmed() {
        let store = InMemoryStore::new();
        let allocator = IdentifierAllocator::new("MDP-", 4);

        let number = allocator.resolve(Some(" LEGACY-7 "), &store);
        assert_eq!(number.value, " LEGACY-7 ");
        assert_eq!(number.sequence, None);
        assert_eq!(allocator.resolve(Some(" auto "), &store).value, "MDP-0001");
    }
}
