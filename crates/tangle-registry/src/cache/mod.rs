//! Manifest caching with TTL support
//!
//! Manifests are framework independent, so one entry answers lookups for
//! every target framework. Entries are keyed by the feed they came from as
//! well as the identity: repositories sharing one `Arc<MetadataCache>` never
//! answer for a package another feed served.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tangle_core::types::PackageIdentity;

use crate::nuspec::PackageManifest;

/// Default time-to-live for cached manifests
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// A manifest and the instant it stops being served
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub manifest: PackageManifest,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(manifest: PackageManifest, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            manifest,
            // a TTL too large to represent never expires in practice
            expires_at: now.checked_add(ttl).unwrap_or(now + DEFAULT_TTL * 24 * 365),
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Feed base address and package identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub identity: PackageIdentity,
}

impl CacheKey {
    pub fn new(source: &str, identity: &PackageIdentity) -> Self {
        Self {
            source: source.to_string(),
            identity: identity.clone(),
        }
    }
}

/// In-memory manifest cache keyed by feed and package identity
#[derive(Debug)]
pub struct MetadataCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    /// Cache whose entries live for `ttl`
    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh manifest `source` served for `identity`; an expired entry is
    /// evicted
    pub fn get(&self, source: &str, identity: &PackageIdentity) -> Option<PackageManifest> {
        let key = CacheKey::new(source, identity);
        let manifest = match self.entries.get(&key) {
            Some(entry) if entry.is_fresh() => Some(entry.manifest.clone()),
            Some(entry) => {
                drop(entry);
                self.entries.remove_if(&key, |_, entry| !entry.is_fresh());
                None
            },
            None => None,
        };

        let counter = if manifest.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        manifest
    }

    pub fn insert(&self, source: &str, identity: &PackageIdentity, manifest: PackageManifest) {
        self.entries
            .insert(CacheKey::new(source, identity), CacheEntry::new(manifest, self.ttl));
    }

    pub fn contains_fresh(&self, source: &str, identity: &PackageIdentity) -> bool {
        self.entries
            .get(&CacheKey::new(source, identity))
            .is_some_and(|entry| entry.is_fresh())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries, returning how many went
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh());
        before - self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
