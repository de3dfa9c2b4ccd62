//! Ingestion integration tests: builder → embedding stage → dual-store coordinator

mod common;

use std::sync::Arc;

use common::{KeywordEmbedder, coordinator, memory_stores, squirrel_page};
use wikigraph_core::Error;
use wikigraph_core::domain::graph::{GraphStore, Node, NodeKind, Relationship, RelationshipKind};
use wikigraph_core::domain::ingest::EmbeddingStage;
use wikigraph_core::domain::provider::EmbeddingProvider;
use wikigraph_core::domain::retrieval::ParentResolver;
use wikigraph_core::domain::vector::{Modality, VectorStore};

fn embedding_stage() -> EmbeddingStage {
    EmbeddingStage::new(Arc::new(KeywordEmbedder)).with_concurrency(2)
}

#[tokio::test]
async fn test_page_batch_round_trip() {
    let (graph, vectors) = memory_stores().await;
    let (mut nodes, ids) = squirrel_page();

    let report = embedding_stage().run(&mut nodes).await;
    assert!(report.failed.is_empty());
    // two chunks and the summary; the image has no image embedder
    assert_eq!(report.embedded, 3);

    let outcome = coordinator(&graph, &vectors).persist(&nodes).await;
    assert!(outcome.is_complete(), "unexpected failures: {:?}", outcome);
    assert_eq!(outcome.mapping.len(), nodes.len());
    assert_eq!(outcome.indexed, 3);

    for (logical_id, _physical_id) in &outcome.mapping {
        let stored = graph.get_by_logical_id(logical_id).await.unwrap();
        assert!(stored.is_some(), "{logical_id} missing from graph store");
    }

    let diet = graph.get_by_logical_id(&ids.diet).await.unwrap().unwrap();
    assert_eq!(diet.kind, NodeKind::Section);
    assert_eq!(diet.context.as_deref(), Some("Squirrels are small rodents that live in trees."));

    assert_eq!(vectors.count(Modality::Text).await.unwrap(), 3);
    assert_eq!(vectors.count(Modality::Image).await.unwrap(), 0);
}

#[tokio::test]
async fn test_structural_edges_are_persisted() {
    let (graph, vectors) = memory_stores().await;
    let (nodes, ids) = squirrel_page();
    coordinator(&graph, &vectors).persist(&nodes).await;

    let parent = graph.list_outgoing(&ids.chunks[0], RelationshipKind::Parent).await.unwrap();
    assert_eq!(parent, vec![Relationship::new(ids.chunks[0].clone(), ids.diet.clone(), RelationshipKind::Parent)]);

    let source = graph.list_outgoing(&ids.chunks[0], RelationshipKind::Source).await.unwrap();
    assert_eq!(source[0].to_id, ids.page);

    let next = graph.list_outgoing(&ids.diet, RelationshipKind::Next).await.unwrap();
    assert_eq!(next[0].to_id, ids.habitat);

    let citation_parent = graph.list_outgoing(&ids.citation, RelationshipKind::Parent).await.unwrap();
    assert_eq!(citation_parent[0].to_id, ids.diet);

    let reference_parent = graph.list_outgoing(&ids.reference, RelationshipKind::Parent).await.unwrap();
    assert_eq!(reference_parent[0].to_id, ids.page);

    // the image run is separate from the section run
    assert!(graph.list_outgoing(&ids.image, RelationshipKind::Previous).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unembedded_nodes_are_never_found() {
    let (graph, vectors) = memory_stores().await;
    let (mut nodes, ids) = squirrel_page();
    embedding_stage().run(&mut nodes).await;
    coordinator(&graph, &vectors).persist(&nodes).await;

    let unsearchable: Vec<&Node> = nodes.iter().filter(|n| !n.needs_embedding).collect();
    assert!(unsearchable.iter().any(|n| n.logical_id == ids.diet));
    assert!(unsearchable.iter().any(|n| n.logical_id == ids.citation));

    for node in unsearchable {
        let query = KeywordEmbedder.embed(&format!("{} {}", node.title, node.body)).await.unwrap();
        let hits = vectors.search(&query, 100, Modality::Text).await.unwrap();
        assert!(
            hits.iter().all(|h| h.logical_id != node.logical_id),
            "{} should not be searchable",
            node.logical_id
        );
    }

    // image partition is empty, not an error
    assert!(vectors.search(&[1.0, 0.0], 5, Modality::Image).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_supplied_embedding_on_unflagged_node_is_dropped() {
    let (graph, vectors) = memory_stores().await;
    let (mut nodes, ids) = squirrel_page();
    let diet = nodes.iter_mut().find(|n| n.logical_id == ids.diet).unwrap();
    diet.embedding = Some(vec![1.0; common::VOCAB.len()]);

    embedding_stage().run(&mut nodes).await;
    let diet = nodes.iter().find(|n| n.logical_id == ids.diet).unwrap();
    assert!(diet.embedding.is_none());

    let outcome = coordinator(&graph, &vectors).persist(&nodes).await;
    assert_eq!(outcome.indexed, 3);
}

#[tokio::test]
async fn test_cross_batch_reference_and_dangling_edge() {
    let (graph, vectors) = memory_stores().await;
    let (nodes, ids) = squirrel_page();
    let coordinator = coordinator(&graph, &vectors);
    assert!(coordinator.persist(&nodes).await.is_complete());

    let late = Node::new(NodeKind::Chunk, "Diet_chunk_9")
        .with_logical_id("late-chunk")
        .with_body("Winter fur")
        .with_parent(ids.diet.clone())
        .with_source(ids.page.clone());
    let orphan = Node::new(NodeKind::Chunk, "Orphan")
        .with_logical_id("orphan")
        .with_body("Bird tail")
        .with_parent("ghost-section")
        .with_source(ids.page.clone());

    let outcome = coordinator.persist(&[late, orphan]).await;

    assert!(outcome.physical_id("late-chunk").is_some());
    assert!(outcome.physical_id("orphan").is_some());
    assert_eq!(
        outcome.dangling,
        vec![Relationship::new("orphan", "ghost-section", RelationshipKind::Parent)]
    );
    assert!(outcome.relationship_failures.is_empty());
    assert!(!outcome.is_complete());

    let late_parent = graph.list_outgoing("late-chunk", RelationshipKind::Parent).await.unwrap();
    assert_eq!(late_parent[0].to_id, ids.diet);
    // the SOURCE edge of the orphan still went through
    assert_eq!(graph.list_outgoing("orphan", RelationshipKind::Source).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_node_is_rejected_alone() {
    let (graph, vectors) = memory_stores().await;
    let (mut nodes, _ids) = squirrel_page();
    nodes.push(Node::new(NodeKind::Chunk, "Loose").with_logical_id("loose"));

    let outcome = coordinator(&graph, &vectors).persist(&nodes).await;

    assert_eq!(outcome.failed_nodes.len(), 1);
    assert_eq!(outcome.failed_nodes[0].0, "loose");
    assert!(matches!(outcome.failed_nodes[0].1, Error::InvalidInput(_)));
    assert_eq!(outcome.mapping.len(), nodes.len() - 1);
    assert!(graph.get_by_logical_id("loose").await.unwrap().is_none());
}

#[tokio::test]
async fn test_in_batch_duplicate_contributes_no_edges_or_vectors() {
    let (graph, vectors) = memory_stores().await;
    let one_hot = |i: usize| {
        let mut v = vec![0.0; common::VOCAB.len()];
        v[i] = 1.0;
        v
    };

    let nodes = vec![
        Node::new(NodeKind::Page, "P").with_logical_id("P"),
        Node::new(NodeKind::Section, "S1").with_logical_id("S1").with_parent("P").with_source("P"),
        Node::new(NodeKind::Section, "S2").with_logical_id("S2").with_parent("P").with_source("P"),
        Node::new(NodeKind::Chunk, "c")
            .with_logical_id("c")
            .with_parent("S1")
            .with_source("P")
            .with_needs_embedding(true)
            .with_embedding(one_hot(0)),
        Node::new(NodeKind::Chunk, "c again")
            .with_logical_id("c")
            .with_parent("S2")
            .with_source("P")
            .with_needs_embedding(true)
            .with_embedding(one_hot(1)),
    ];

    let outcome = coordinator(&graph, &vectors).persist(&nodes).await;

    assert_eq!(outcome.failed_nodes.len(), 1);
    assert_eq!(outcome.failed_nodes[0].0, "c");
    assert!(matches!(outcome.failed_nodes[0].1, Error::InvalidInput(_)));
    assert_eq!(outcome.mapping.len(), 4);
    assert_eq!(outcome.indexed, 1);

    let parents = graph.list_outgoing("c", RelationshipKind::Parent).await.unwrap();
    assert_eq!(parents, vec![Relationship::new("c", "S1", RelationshipKind::Parent)]);

    let stored = graph.get_by_logical_id("c").await.unwrap().unwrap();
    assert_eq!(stored.title, "c");

    // the first copy's vector is the one indexed
    let hits = vectors.search(&one_hot(0), 1, Modality::Text).await.unwrap();
    assert_eq!(hits[0].logical_id, "c");
    assert!(hits[0].score > 0.99);
    let hits = vectors.search(&one_hot(1), 5, Modality::Text).await.unwrap();
    assert!(hits.iter().all(|h| h.score < 0.5));
}

#[tokio::test]
async fn test_repersisting_batch_reports_store_write_and_keeps_counts() {
    let (graph, vectors) = memory_stores().await;
    let (mut nodes, _ids) = squirrel_page();
    embedding_stage().run(&mut nodes).await;
    let coordinator = coordinator(&graph, &vectors);

    coordinator.persist(&nodes).await;
    let node_count = graph.count_nodes().await.unwrap();
    let edge_count = graph.count_relationships().await.unwrap();

    let second = coordinator.persist(&nodes).await;
    assert!(second.mapping.is_empty());
    assert_eq!(second.failed_nodes.len(), nodes.len());
    assert!(second.failed_nodes.iter().all(|(_, e)| matches!(e, Error::StoreWrite(_))));
    assert_eq!(second.indexed, 0);

    assert_eq!(graph.count_nodes().await.unwrap(), node_count);
    assert_eq!(graph.count_relationships().await.unwrap(), edge_count);
    assert_eq!(vectors.count(Modality::Text).await.unwrap(), 3);
}

#[tokio::test]
async fn test_embedding_failure_keeps_node_out_of_vector_store() {
    let (graph, vectors) = memory_stores().await;
    let (mut nodes, ids) = squirrel_page();
    let chunk = nodes.iter_mut().find(|n| n.logical_id == ids.chunks[1]).unwrap();
    chunk.body = "FAIL on this chunk".to_string();

    let report = embedding_stage().run(&mut nodes).await;
    assert_eq!(report.failed, vec![ids.chunks[1].clone()]);

    let outcome = coordinator(&graph, &vectors).persist(&nodes).await;
    assert!(outcome.physical_id(&ids.chunks[1]).is_some());
    assert_eq!(outcome.indexed, 2);
    assert_eq!(vectors.count(Modality::Text).await.unwrap(), 2);
}

#[tokio::test]
async fn test_parent_edge_is_idempotent() {
    let (graph, vectors) = memory_stores().await;
    let (nodes, ids) = squirrel_page();
    coordinator(&graph, &vectors).persist(&nodes).await;

    let chunk = &ids.chunks[0];
    graph.create_relationship(chunk, &ids.diet, RelationshipKind::Parent).await.unwrap();
    graph.create_relationship(chunk, &ids.diet, RelationshipKind::Parent).await.unwrap();

    let edges = graph.list_outgoing(chunk, RelationshipKind::Parent).await.unwrap();
    assert_eq!(edges.len(), 1);
}

#[tokio::test]
async fn test_chunks_and_derived_nodes_resolve_to_their_section() {
    let (graph, vectors) = memory_stores().await;
    let (nodes, ids) = squirrel_page();
    coordinator(&graph, &vectors).persist(&nodes).await;

    let resolver = ParentResolver::new(graph.clone());
    let hits = vec![ids.chunks[0].clone(), ids.summary.clone(), ids.chunks[1].clone()];
    let resolved = resolver.resolve(&hits).await.unwrap();

    let resolved_ids: Vec<&str> = resolved.iter().map(|n| n.logical_id.as_str()).collect();
    assert_eq!(resolved_ids, vec![ids.diet.as_str()]);
}
