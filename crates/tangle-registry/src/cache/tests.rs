//! Unit tests for the manifest cache

use super::*;
use crate::nuspec::parse_manifest;

const FEED: &str = "https://api.nuget.org/v3-flatcontainer";

fn identity(id: &str, version: &str) -> PackageIdentity {
    PackageIdentity::parse(id, version).unwrap()
}

fn manifest(id: &str, version: &str) -> PackageManifest {
    let xml = format!(
        "<package><metadata><id>{}</id><version>{}</version></metadata></package>",
        id, version
    );
    parse_manifest(&xml).unwrap()
}

fn expire() {
    std::thread::sleep(Duration::from_millis(2));
}

#[test]
fn test_insert_and_get() {
    let cache = MetadataCache::new();
    cache.insert(FEED, &identity("Serilog", "2.10.0"), manifest("Serilog", "2.10.0"));

    // identities compare case-insensitively and by normalized version
    let retrieved = cache.get(FEED, &identity("serilog", "2.10")).unwrap();
    assert_eq!(retrieved.id.as_str(), "Serilog");
    assert!(cache.get(FEED, &identity("Serilog", "2.11.0")).is_none());

    assert_eq!(
        cache.stats(),
        CacheStats {
            entries: 1,
            hits: 1,
            misses: 1,
        }
    );
}

#[test]
fn test_entries_are_per_feed() {
    let cache = MetadataCache::new();
    let key = identity("Internal.Tools", "1.0.0");
    cache.insert("https://packages.example.com/v3", &key, manifest("Internal.Tools", "1.0.0"));

    assert!(cache.get("https://packages.example.com/v3", &key).is_some());
    assert!(cache.get(FEED, &key).is_none());
    assert!(!cache.contains_fresh(FEED, &key));
}

#[test]
fn test_contains_fresh() {
    let cache = MetadataCache::new();
    let key = identity("Polly", "7.2.4");

    assert!(!cache.contains_fresh(FEED, &key));
    cache.insert(FEED, &key, manifest("Polly", "7.2.4"));
    assert!(cache.contains_fresh(FEED, &key));
    assert_eq!(cache.ttl(), DEFAULT_TTL);
}

#[test]
fn test_expired_entry_is_evicted_on_get() {
    let cache = MetadataCache::with_default_ttl(Duration::from_millis(1));
    let key = identity("Polly", "7.2.4");
    cache.insert(FEED, &key, manifest("Polly", "7.2.4"));
    expire();

    assert!(!cache.contains_fresh(FEED, &key));
    assert!(cache.get(FEED, &key).is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_purge_expired() {
    let short = MetadataCache::with_default_ttl(Duration::from_millis(1));
    short.insert(FEED, &identity("A", "1.0.0"), manifest("A", "1.0.0"));
    short.insert(FEED, &identity("B", "1.0.0"), manifest("B", "1.0.0"));
    expire();
    assert_eq!(short.purge_expired(), 2);
    assert_eq!(short.len(), 0);

    let long = MetadataCache::new();
    long.insert(FEED, &identity("A", "1.0.0"), manifest("A", "1.0.0"));
    assert_eq!(long.purge_expired(), 0);
    assert_eq!(long.len(), 1);
}

#[test]
fn test_huge_ttl_does_not_overflow() {
    let entry = CacheEntry::new(manifest("A", "1.0.0"), Duration::MAX);
    assert!(entry.is_fresh());
}
