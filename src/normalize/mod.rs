//! Tracker URL normalization.
//!
//! Turns raw tracker references into a canonical key used for duplicate
//! detection and reliability lookups:
//! 1. lowercase and trim
//! 2. drop decoration query parameters (`tr`, `ws`, `as`) and dangling `?`/`&`
//! 3. collapse magnet links to `magnet:btih:<hash>`
//!
//! Results are memoized in a bounded LRU cache owned by the [`Normalizer`].

use std::num::NonZeroUsize;
use std::sync::{LazyLock, Mutex, PoisonError};

use lru::LruCache;
use regex::Regex;

use crate::config::{IGNORED_QUERY_PARAMS, MAX_URL_LENGTH, NORMALIZE_CACHE_CAPACITY};
use crate::models::{Endpoint, ProtocolKind};


/// Prefix of a canonical magnet key.
pub const MAGNET_KEY_PREFIX: &str = "magnet:btih:";

static MAGNET_INFO_HASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]xt=urn:btih:([0-9a-f]{40}|[a-z2-7]{32})").expect("magnet info-hash pattern")
});

/// Canonicalizes tracker references, with a bounded memo cache.
pub struct Normalizer {
    cache: Mutex<LruCache<String, String>>,
}

impl Normalizer {
    /// Creates a normalizer with the default cache capacity.
    pub fn new() -> Self {
        Self::with_capacity(NORMALIZE_CACHE_CAPACITY)
    }

    /// Creates a normalizer whose cache holds at most `capacity` entries.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the normalized key for `raw`, consulting the cache first.
    pub fn normalize(&self, raw: &str) -> String {
        if let Some(hit) = self.lock_cache().get(raw) {
            return hit.clone();
        }
        let key = normalize_uncached(raw);
        self.lock_cache().put(raw.to_string(), key.clone());
        key
    }

    /// Builds an [`Endpoint`] for `raw` with its normalized key.
    pub fn endpoint(&self, raw: &str) -> Endpoint {
        Endpoint::new(raw, self.normalize(raw))
    }

    /// Builds an [`Endpoint`] if `raw` is a usable tracker reference.
    ///
    /// Accepts what [`sanitize`] accepts plus magnet links carrying an info-hash.
    pub fn admit(&self, raw: &str) -> Option<Endpoint> {
        if sanitize(raw).is_some() {
            return Some(self.endpoint(raw));
        }
        if ProtocolKind::from_raw(raw) == ProtocolKind::Magnet {
            let endpoint = self.endpoint(raw);
            if endpoint.key().starts_with(MAGNET_KEY_PREFIX) {
                return Some(endpoint);
            }
        }
        None
    }

    /// Number of memoized entries.
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// Drops every memoized entry.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, String>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the normalized key without touching any cache.
///
/// Deterministic and idempotent: `normalize_uncached(&normalize_uncached(x)) == normalize_uncached(x)`.
pub fn normalize_uncached(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let cleaned = strip_ignored_params(&lowered);

    if cleaned.starts_with("magnet:") {
        if let Some(caps) = MAGNET_INFO_HASH.captures(&cleaned) {
            return format!("{MAGNET_KEY_PREFIX}{}", &caps[1]);
        }
    }

    cleaned
}

/// Returns `raw` unchanged if it is an http, https or udp URL with a host.
///
/// Never fails; anything unusable yields `None`.
pub fn sanitize(raw: &str) -> Option<String> {
    if raw.len() > MAX_URL_LENGTH {
        return None;
    }
    let parsed = url::Url::parse(raw).ok()?;
    match parsed.scheme() {
        "http" | "https" | "udp" => {}
        _ => return None,
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Some(raw.to_string()),
        _ => None,
    }
}

fn strip_ignored_params(url: &str) -> String {
    let stripped = match url.split_once('?') {
        Some((base, query)) => {
            let kept: Vec<&str> = query
                .split('&')
                .filter(|pair| !pair.is_empty() && !is_ignored_param(pair))
                .collect();
            if kept.is_empty() {
                base.to_string()
            } else {
                format!("{base}?{}", kept.join("&"))
            }
        }
        None => url.to_string(),
    };
    stripped
        .trim_end_matches(|c: char| c == '?' || c == '&' || c.is_whitespace())
        .to_string()
}

fn is_ignored_param(pair: &str) -> bool {
    match pair.split_once('=') {
        Some((key, _)) => IGNORED_QUERY_PARAMS.contains(&key),
        None => false,
    }
}
