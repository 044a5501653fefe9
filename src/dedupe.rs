//! Duplicate removal over raw tracker lists.

use std::collections::HashSet;

use log::{debug, info};

use crate::models::{DedupStats, Endpoint};
use crate::normalize::Normalizer;

/// First-seen-unique endpoints of an input list.
#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    /// Unique endpoints in first-occurrence order
    pub endpoints: Vec<Endpoint>,
    pub stats: DedupStats,
}

impl Deduplicated {
    /// Raw strings of the unique endpoints, in first-occurrence order.
    pub fn unique(&self) -> Vec<&str> {
        self.endpoints.iter().map(Endpoint::raw).collect()
    }
}

/// Reduces `raw_list` to its first-seen-unique entries.
///
/// Equality uses the normalized key while the output keeps the raw strings.
/// Entries that are not usable tracker references are dropped: they count
/// towards `total` but never towards `unique`.
pub fn dedupe<S: AsRef<str>>(normalizer: &Normalizer, raw_list: &[S]) -> Deduplicated {
    let mut seen = HashSet::new();
    let mut endpoints = Vec::new();
    let mut malformed = 0usize;

    for raw in raw_list {
        let raw = raw.as_ref();
        let Some(endpoint) = normalizer.admit(raw) else {
            debug!("Dropping malformed tracker entry: {raw:?}");
            malformed += 1;
            continue;
        };
        if seen.insert(endpoint.key().to_string()) {
            endpoints.push(endpoint);
        }
    }

    let total = raw_list.len();
    let unique = endpoints.len();
    if malformed > 0 {
        debug!("Dropped {malformed} malformed tracker entries during deduplication");
    }
    info!("Removed duplicates: {total} -> {unique}");

    Deduplicated {
        endpoints,
        stats: DedupStats {
            total,
            unique,
            duplicates: total - unique,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let normalizer = Normalizer::new();
        let result = dedupe::<&str>(&normalizer, &[]);
        assert!(result.endpoints.is_empty());
        assert_eq!(result.stats, DedupStats::default());
    }

    #[test]
    fn test_preserves_first_occurrence_order() {
        let normalizer = Normalizer::new();
        let a = "udp://a.example:80/announce";
        let b = "http://b.example/announce";
        let c = "https://c.example/announce";
        let input = [a, b, a, c, b];

        let result = dedupe(&normalizer, &input);
        assert_eq!(result.unique(), vec![a, b, c]);
        assert_eq!(
            result.stats,
            DedupStats {
                total: 5,
                unique: 3,
                duplicates: 2
            }
        );
    }

    #[test]
    fn test_keeps_raw_form_of_first_occurrence() {
        let normalizer = Normalizer::new();
        let input = [
            "UDP://Tracker.Example:80/announce?tr=x",
            "udp://tracker.example:80/announce",
        ];
        let result = dedupe(&normalizer, &input);
        assert_eq!(result.unique(), vec!["UDP://Tracker.Example:80/announce?tr=x"]);
        assert_eq!(result.stats.duplicates, 1);
    }

    #[test]
    fn test_malformed_entries_counted_but_dropped() {
        let normalizer = Normalizer::new();
        let input = [
            "udp://a.example:80/announce",
            "",
            "not a tracker",
            "ftp://files.example/announce",
        ];
        let result = dedupe(&normalizer, &input);
        assert_eq!(result.unique(), vec!["udp://a.example:80/announce"]);
        assert_eq!(
            result.stats,
            DedupStats {
                total: 4,
                unique: 1,
                duplicates: 3
            }
        );
    }

    #[test]
    fn test_magnets_dedupe_by_info_hash() {
        let normalizer = Normalizer::new();
        let input = [
            "magnet:?xt=urn:btih:ABCDEF0123456789ABCDEF0123456789ABCDEF01&dn=one",
            "magnet:?xt=urn:btih:abcdef0123456789abcdef0123456789abcdef01&dn=two",
        ];
        let result = dedupe(&normalizer, &input);
        assert_eq!(result.stats.unique, 1);
        assert_eq!(result.unique(), vec![input[0]]);
    }
}
