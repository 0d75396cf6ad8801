//! Exercises the registry invariants that don't need a process restart:
//! node/edge uniqueness under repeated upserts, derived edge phase,
//! per-key write ordering, type-meta-node invariance, and idempotence of
//! repeated upserts.

use codex_core::{Config, Edge, Node, NodeRegistry, Phase, META_TYPE_TYPE_ID};

async fn in_memory_registry() -> NodeRegistry {
    let (registry, _watcher) = NodeRegistry::initialize(Config::testing()).await.unwrap();
    registry
}

#[tokio::test]
async fn uniqueness_holds_under_repeated_upserts() {
    let registry = in_memory_registry().await;
    for i in 0..5 {
        let mut node = Node::new("dup", "t", Phase::Gas);
        node.title = Some(format!("version {i}"));
        registry.upsert_node(node).await.unwrap();
    }
    let matches: Vec<_> = registry.all_nodes().into_iter().filter(|n| n.id == "dup").collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].title.as_deref(), Some("version 4"));

    for _ in 0..3 {
        registry.upsert_edge(Edge::new("dup", "self", "dup")).await.unwrap();
    }
    let edges: Vec<_> = registry.all_edges();
    assert_eq!(edges.len(), 1);
}

#[tokio::test]
async fn upserting_same_node_twice_is_observationally_idempotent() {
    let registry = in_memory_registry().await;
    let node = Node::new("once", "t", Phase::Water);
    registry.upsert_node(node.clone()).await.unwrap();
    let after_one = registry.try_get_node("once").unwrap();
    registry.upsert_node(node).await.unwrap();
    let after_two = registry.try_get_node("once").unwrap();
    assert_eq!(after_one, after_two);
}

#[tokio::test]
async fn edge_phase_matches_max_of_endpoints() {
    let registry = in_memory_registry().await;
    registry.upsert_node(Node::new("p", "t", Phase::Ice)).await.unwrap();
    registry.upsert_node(Node::new("q", "t", Phase::Water)).await.unwrap();
    registry.upsert_edge(Edge::new("p", "relates", "q")).await.unwrap();

    let edge = registry.get_edge("p", "q", Some("relates")).unwrap();
    assert_eq!(edge.derived_state, Phase::Water);

    registry.upsert_node(Node::new("q", "t", Phase::Gas)).await.unwrap();
    let edge = registry.get_edge("p", "q", Some("relates")).unwrap();
    assert_eq!(edge.derived_state, Phase::Gas);
}

#[tokio::test]
async fn missing_endpoint_collapses_edge_to_gas() {
    let registry = in_memory_registry().await;
    registry.upsert_node(Node::new("only-from", "t", Phase::Ice)).await.unwrap();
    registry
        .upsert_edge(Edge::new("only-from", "relates", "absent"))
        .await
        .unwrap();
    let edge = registry.get_edge("only-from", "absent", Some("relates")).unwrap();
    assert_eq!(edge.derived_state, Phase::Gas);
}

#[tokio::test]
async fn get_edge_with_no_role_finds_first_incident_edge() {
    let registry = in_memory_registry().await;
    registry.upsert_node(Node::new("p", "t", Phase::Gas)).await.unwrap();
    registry.upsert_node(Node::new("q", "t", Phase::Gas)).await.unwrap();
    registry.upsert_edge(Edge::new("p", "relates", "q")).await.unwrap();

    let edge = registry.get_edge("p", "q", None).unwrap();
    assert_eq!(edge.role, "relates");
    assert!(registry.get_edge("p", "nobody", None).is_none());
    assert!(registry.get_edge("nobody", "q", None).is_none());
}

#[tokio::test]
async fn per_key_ordering_last_write_dominates() {
    let registry = in_memory_registry().await;
    for i in 0..20 {
        let mut node = Node::new("k", "t", Phase::Ice);
        node.meta.insert("seq".into(), serde_json::json!(i));
        registry.upsert_node(node).await.unwrap();
    }
    registry.wait_quiescent().await;
    let node = registry.try_get_node("k").unwrap();
    assert_eq!(node.meta.get("seq"), Some(&serde_json::json!(19)));
}

#[tokio::test]
async fn type_invariance_seeds_meta_node_for_new_type_at_runtime() {
    let registry = in_memory_registry().await;
    assert!(registry.try_get_node("codex.widget").is_none());

    registry
        .upsert_node(Node::new("w1", "codex.widget", Phase::Gas))
        .await
        .unwrap();

    let meta = registry
        .try_get_node("codex.widget")
        .expect("meta-node seeded for a newly observed typeId");
    assert_eq!(meta.type_id, META_TYPE_TYPE_ID);

    // A second node of the same type must not re-seed or duplicate it.
    registry
        .upsert_node(Node::new("w2", "codex.widget", Phase::Gas))
        .await
        .unwrap();
    let matches: Vec<_> = registry
        .all_nodes()
        .into_iter()
        .filter(|n| n.id == "codex.widget")
        .collect();
    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn delete_node_cascades_to_incident_edges() {
    let registry = in_memory_registry().await;
    registry.upsert_node(Node::new("a", "t", Phase::Gas)).await.unwrap();
    registry.upsert_node(Node::new("b", "t", Phase::Gas)).await.unwrap();
    registry.upsert_edge(Edge::new("a", "relates", "b")).await.unwrap();
    assert!(registry.get_edge("a", "b", Some("relates")).is_some());

    registry.delete_node("a").await.unwrap();
    assert!(registry.try_get_node("a").is_none());
    assert!(registry.get_edge("a", "b", Some("relates")).is_none());
    assert!(registry.edges_from("b").is_empty());
}

#[tokio::test]
async fn identity_lookup_is_case_insensitive_but_preserves_display_case() {
    let registry = in_memory_registry().await;
    registry
        .upsert_node(Node::new("MixedCase", "t", Phase::Gas))
        .await
        .unwrap();
    let node = registry.try_get_node("mixedcase").unwrap();
    assert_eq!(node.id, "MixedCase");

    registry
        .upsert_edge(Edge::new("MixedCase", "Knows", "MixedCase"))
        .await
        .unwrap();
    assert!(registry.get_edge("mixedcase", "MIXEDCASE", Some("knows")).is_some());
}

#[tokio::test]
async fn health_check_reports_healthy_for_a_quiescent_registry() {
    let registry = in_memory_registry().await;
    registry.upsert_node(Node::new("a", "t", Phase::Ice)).await.unwrap();
    registry.wait_quiescent().await;

    let health = registry.health_check().await;
    assert!(health.is_healthy());
    assert_eq!(health.checks.len(), 5);
}

#[tokio::test]
async fn invalid_input_is_rejected_synchronously() {
    let registry = in_memory_registry().await;
    let err = registry
        .upsert_node(Node::new("", "t", Phase::Gas))
        .await
        .unwrap_err();
    assert!(matches!(err, codex_core::CodexError::InvalidInput(_)));

    let err = registry
        .upsert_edge(Edge::new("", "relates", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, codex_core::CodexError::InvalidInput(_)));
}
