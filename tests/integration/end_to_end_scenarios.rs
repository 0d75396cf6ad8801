//! Drives end-to-end phase-persistence scenarios against a real
//! `NodeRegistry` backed by a temp-dir SQLite durable tier, restarting the
//! registry in-process (drop and reconstruct against the same path) to
//! exercise restart survival of Ice and clearance of Water/Gas.

use codex_core::backends::{EdgeFilter, NodeFilter, SqliteBackend, StorageBackend};
use codex_core::{Config, Edge, Node, NodeRegistry, Phase};

fn config_at(path: &std::path::Path) -> Config {
    Config {
        ice_connection_string: path.to_string_lossy().into_owned(),
        ..Config::default()
    }
}

async fn restart(path: &std::path::Path) -> NodeRegistry {
    let (registry, _watcher) = NodeRegistry::initialize(config_at(path)).await.unwrap();
    registry
}

#[tokio::test]
async fn scenario_1_ice_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ice.db3");

    let registry = restart(&db_path).await;
    let mut node = Node::new("A", "t", Phase::Ice);
    node.title = Some("A".to_string());
    registry.upsert_node(node).await.unwrap();
    registry.wait_quiescent().await;
    registry.shutdown().await;

    let registry = restart(&db_path).await;
    let found = registry.try_get_node("A").expect("A survives restart");
    assert_eq!(found.state, Phase::Ice);
    assert_eq!(found.title.as_deref(), Some("A"));
}

#[tokio::test]
async fn scenario_2_water_is_wiped_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ice.db3");

    let registry = restart(&db_path).await;
    registry
        .upsert_node(Node::new("B", "t", Phase::Water))
        .await
        .unwrap();
    registry.wait_quiescent().await;
    registry.shutdown().await;

    let registry = restart(&db_path).await;
    assert!(registry.try_get_node("B").is_none());
}

#[tokio::test]
async fn scenario_3_gas_never_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ice.db3");

    let registry = restart(&db_path).await;
    registry
        .upsert_node(Node::new("C", "t", Phase::Gas))
        .await
        .unwrap();
    registry.wait_quiescent().await;

    let ice = SqliteBackend::open(db_path.to_str().unwrap()).unwrap();
    assert!(ice.get_node("C").await.unwrap().is_none());
    registry.shutdown().await;

    let registry = restart(&db_path).await;
    assert!(registry.try_get_node("C").is_none());
}

#[tokio::test]
async fn scenario_4_ice_to_water_migrates_storage() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ice.db3");

    let registry = restart(&db_path).await;
    registry
        .upsert_node(Node::new("D", "t", Phase::Ice))
        .await
        .unwrap();
    registry.wait_quiescent().await;
    registry
        .upsert_node(Node::new("D", "t", Phase::Water))
        .await
        .unwrap();
    registry.wait_quiescent().await;

    let ice = SqliteBackend::open(db_path.to_str().unwrap()).unwrap();
    assert!(ice.get_node("D").await.unwrap().is_none(), "D must have migrated out of Ice");

    let node = registry.try_get_node("D").unwrap();
    assert_eq!(node.state, Phase::Water);
}

#[tokio::test]
async fn scenario_5_edge_follows_most_fluid_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ice.db3");

    let registry = restart(&db_path).await;
    registry.upsert_node(Node::new("X", "t", Phase::Ice)).await.unwrap();
    registry.upsert_node(Node::new("Y", "t", Phase::Ice)).await.unwrap();
    registry.upsert_edge(Edge::new("X", "relates", "Y")).await.unwrap();
    registry.wait_quiescent().await;

    let ice = SqliteBackend::open(db_path.to_str().unwrap()).unwrap();
    let edges = ice.scan_edges(&EdgeFilter::default()).await.unwrap();
    assert_eq!(edges.len(), 1, "edge is durable while both endpoints are Ice");

    registry.upsert_node(Node::new("Y", "t", Phase::Water)).await.unwrap();
    registry.wait_quiescent().await;

    let ice = SqliteBackend::open(db_path.to_str().unwrap()).unwrap();
    let edges = ice.scan_edges(&EdgeFilter::default()).await.unwrap();
    assert!(edges.is_empty(), "edge must leave Ice once an endpoint is Water");
    let edge = registry.get_edge("X", "Y", Some("relates")).expect("edge still in memory");
    assert_eq!(edge.derived_state, Phase::Water);

    registry.upsert_node(Node::new("Y", "t", Phase::Gas)).await.unwrap();
    registry.wait_quiescent().await;

    let ice = SqliteBackend::open(db_path.to_str().unwrap()).unwrap();
    assert!(ice.scan_edges(&EdgeFilter::default()).await.unwrap().is_empty());
    let edge = registry
        .get_edge("X", "Y", Some("relates"))
        .expect("edge still reachable in memory before restart");
    assert_eq!(edge.derived_state, Phase::Gas);

    registry.shutdown().await;
    let registry = restart(&db_path).await;
    assert!(
        registry.get_edge("X", "Y", Some("relates")).is_none(),
        "edge absent after restart once its Gas endpoint is gone"
    );
}

#[tokio::test]
async fn scenario_6_content_adapter_resolves_and_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ice.db3");
    let fixture_path = dir.path().join("hello.txt");
    tokio::fs::write(&fixture_path, b"hello\n").await.unwrap();

    let registry = restart(&db_path).await;
    let mut node = Node::new("E", "t", Phase::Gas);
    node.content = Some(codex_core::ContentRef::external(
        "text/plain",
        format!("file://{}", fixture_path.display()),
    ));
    registry.upsert_node(node).await.unwrap();

    let found = registry.try_get_node("E").unwrap();
    let content = found.content.expect("content resolved synchronously on upsert");
    assert_eq!(content.inline_bytes.as_deref(), Some(&b"hello\n"[..]));

    let mut hasher = sha2::Sha256::new();
    use sha2::Digest;
    hasher.update(b"hello\n");
    let expected = hex::encode(hasher.finalize());
    assert_eq!(content.cache_key, Some(expected));
    assert_eq!(
        content.external_uri.as_deref(),
        Some(format!("file://{}", fixture_path.display())).as_deref()
    );
}
