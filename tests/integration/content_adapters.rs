//! Exercises content resolution, cache-key priority, unknown schemes left
//! unresolved, and the content-resolution cache staying referentially
//! transparent within one process lifetime.

use codex_core::{Config, ContentRef, Node, NodeRegistry, Phase};
use sha2::Digest;

async fn in_memory_registry() -> NodeRegistry {
    let (registry, _watcher) = NodeRegistry::initialize(Config::testing()).await.unwrap();
    registry
}

#[tokio::test]
async fn file_scheme_resolves_bytes_and_hashes() {
    let registry = in_memory_registry().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("greeting.txt");
    tokio::fs::write(&path, b"hello\n").await.unwrap();

    let mut node = Node::new("n1", "t", Phase::Gas);
    node.content = Some(ContentRef::external("text/plain", format!("file://{}", path.display())));
    registry.upsert_node(node).await.unwrap();

    let found = registry.try_get_node("n1").unwrap();
    let content = found.content.unwrap();
    assert_eq!(content.inline_bytes.as_deref(), Some(&b"hello\n"[..]));

    let mut hasher = sha2::Sha256::new();
    hasher.update(b"hello\n");
    assert_eq!(content.cache_key, Some(hex::encode(hasher.finalize())));
}

#[tokio::test]
async fn unknown_scheme_is_left_unresolved_without_error() {
    let registry = in_memory_registry().await;
    let mut node = Node::new("n2", "t", Phase::Gas);
    node.content = Some(ContentRef::external("application/x-custom", "ftp://example.com/thing"));
    registry.upsert_node(node).await.unwrap();

    let found = registry.try_get_node("n2").unwrap();
    let content = found.content.unwrap();
    assert!(content.inline_bytes.is_none());
    assert!(content.inline_json.is_none());
    // cacheKey still falls back to the URI bytes, the lowest-priority input.
    let mut hasher = sha2::Sha256::new();
    hasher.update(b"ftp://example.com/thing");
    assert_eq!(content.cache_key, Some(hex::encode(hasher.finalize())));
}

#[tokio::test]
async fn missing_file_admits_node_with_cache_key_unset() {
    let registry = in_memory_registry().await;
    let mut node = Node::new("n3", "t", Phase::Gas);
    node.content = Some(ContentRef::external("text/plain", "file:///does/not/exist"));
    registry.upsert_node(node).await.unwrap();

    let found = registry.try_get_node("n3").unwrap();
    let content = found.content.unwrap();
    assert!(content.inline_bytes.is_none());
    assert!(content.cache_key.is_none());
    assert_eq!(content.external_uri.as_deref(), Some("file:///does/not/exist"));
}

#[tokio::test]
async fn external_uri_is_retained_for_provenance_after_resolution() {
    let registry = in_memory_registry().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    tokio::fs::write(&path, b"payload").await.unwrap();
    let uri = format!("file://{}", path.display());

    let mut node = Node::new("n4", "t", Phase::Gas);
    node.content = Some(ContentRef::external("text/plain", uri.clone()));
    registry.upsert_node(node).await.unwrap();

    let found = registry.try_get_node("n4").unwrap();
    let content = found.content.unwrap();
    assert_eq!(content.external_uri.as_deref(), Some(uri.as_str()));
    assert!(content.inline_bytes.is_some());
}

#[tokio::test]
async fn adapter_cache_hits_on_second_resolution_of_same_uri() {
    let registry = in_memory_registry().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cached.txt");
    tokio::fs::write(&path, b"cached-bytes").await.unwrap();
    let uri = format!("file://{}", path.display());

    let mut first = Node::new("n5", "t", Phase::Gas);
    first.content = Some(ContentRef::external("text/plain", uri.clone()));
    registry.upsert_node(first).await.unwrap();

    let mut second = Node::new("n6", "t", Phase::Gas);
    second.content = Some(ContentRef::external("text/plain", uri.clone()));
    registry.upsert_node(second).await.unwrap();

    let metrics = registry.metrics();
    assert_eq!(metrics.adapter_cache_misses.load(std::sync::atomic::Ordering::Relaxed), 1);
    assert_eq!(metrics.adapter_cache_hits.load(std::sync::atomic::Ordering::Relaxed), 1);
}
