//! Dual-store coordinator
//!
//! Writes a node batch into the graph store and the vector store while keeping
//! the logical ID as the only join key between them. The logical-to-physical
//! mapping lives in [`PersistOutcome`] and never reaches retrieval.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::graph::{GraphStore, Node, NodeKind, PhysicalId, Relationship};
use crate::domain::vector::{Modality, VectorStore};
use crate::error::{Error, Result};

/// Settings for batch persistence
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum in-flight store operations per step
    pub concurrency: usize,
    /// Base name of the vector collections
    pub collection: String,
    pub text_dimensions: usize,
    pub image_dimensions: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            collection: "wikigraph".to_string(),
            text_dimensions: 1536,
            image_dimensions: 1024,
        }
    }
}

/// Result of persisting one batch
#[derive(Debug, Default)]
pub struct PersistOutcome {
    /// Every node that was created, keyed by logical ID
    pub mapping: HashMap<String, PhysicalId>,
    /// Nodes rejected before or by the graph store
    pub failed_nodes: Vec<(String, Error)>,
    /// Edges skipped because an endpoint does not exist
    pub dangling: Vec<Relationship>,
    /// Edges the graph store rejected for other reasons
    pub relationship_failures: Vec<(Relationship, Error)>,
    /// Nodes created in the graph but not indexed for search
    pub vector_failures: Vec<(String, Error)>,
    /// Number of vectors written
    pub indexed: usize,
}

impl PersistOutcome {
    /// Whether every node, edge and vector was written
    pub fn is_complete(&self) -> bool {
        self.failed_nodes.is_empty()
            && self.dangling.is_empty()
            && self.relationship_failures.is_empty()
            && self.vector_failures.is_empty()
    }

    /// Physical ID for a created node
    pub fn physical_id(&self, logical_id: &str) -> Option<&PhysicalId> {
        self.mapping.get(logical_id)
    }
}

/// Keeps the graph store and the vector store consistent for a node batch
pub struct DualStoreCoordinator<G: GraphStore, V: VectorStore> {
    graph: Arc<G>,
    vectors: Arc<V>,
    config: IngestConfig,
}

impl<G: GraphStore, V: VectorStore> DualStoreCoordinator<G, V> {
    /// Create a new coordinator over two initialized stores
    pub fn new(graph: Arc<G>, vectors: Arc<V>) -> Self {
        Self {
            graph,
            vectors,
            config: IngestConfig::default(),
        }
    }

    /// Override the persistence settings
    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Prepare the text and image partitions
    pub async fn ensure_collections(&self) -> Result<()> {
        for modality in Modality::all() {
            let dimensions = match modality {
                Modality::Text => self.config.text_dimensions,
                Modality::Image => self.config.image_dimensions,
            };
            let name = modality.collection_name(&self.config.collection);
            self.vectors
                .ensure_collection(*modality, &name, dimensions)
                .await?;
        }
        Ok(())
    }

    /// Persist a batch: nodes, then relationships, then vectors
    ///
    /// A failure on one node, edge or vector is recorded in the outcome and
    /// does not abort the rest of the batch.
    pub async fn persist(&self, nodes: &[Node]) -> PersistOutcome {
        info!(nodes = nodes.len(), "Persisting node batch");
        let mut outcome = PersistOutcome::default();

        let created = self.create_nodes(nodes, &mut outcome).await;
        let accepted: Vec<&Node> = nodes
            .iter()
            .enumerate()
            .filter(|(idx, _)| created.contains(idx))
            .map(|(_, node)| node)
            .collect();

        self.create_relationships(&accepted, &mut outcome).await;
        self.index_vectors(&accepted, &mut outcome).await;

        info!(
            created = outcome.mapping.len(),
            failed = outcome.failed_nodes.len(),
            dangling = outcome.dangling.len(),
            indexed = outcome.indexed,
            "Node batch persisted"
        );
        outcome
    }

    /// Returns the batch positions whose node the graph store accepted
    async fn create_nodes(&self, nodes: &[Node], outcome: &mut PersistOutcome) -> HashSet<usize> {
        let mut pages = Vec::new();
        let mut others = Vec::new();
        let mut seen = HashSet::new();

        for (idx, node) in nodes.iter().enumerate() {
            if !seen.insert(node.logical_id.as_str()) {
                let e = Error::InvalidInput(format!(
                    "logical id {} appears more than once in the batch",
                    node.logical_id
                ));
                warn!(logical_id = %node.logical_id, "Rejecting duplicate node");
                outcome.failed_nodes.push((node.logical_id.clone(), e));
                continue;
            }
            match node.validate_structure() {
                Ok(()) if node.kind == NodeKind::Page => pages.push((idx, node)),
                Ok(()) => others.push((idx, node)),
                Err(e) => {
                    warn!(logical_id = %node.logical_id, error = %e, "Rejecting malformed node");
                    outcome.failed_nodes.push((node.logical_id.clone(), e));
                }
            }
        }

        let mut created = HashSet::new();

        // Pages go first so that SOURCE targets exist before their dependants
        for wave in [pages, others] {
            let results: Vec<(usize, String, Result<PhysicalId>)> = stream::iter(wave)
                .map(|(idx, node)| async move {
                    let result = self.graph.create_node(node).await;
                    (idx, node.logical_id.clone(), result)
                })
                .buffer_unordered(self.concurrency())
                .collect()
                .await;

            for (idx, logical_id, result) in results {
                match result {
                    Ok(physical_id) => {
                        created.insert(idx);
                        outcome.mapping.insert(logical_id, physical_id);
                    }
                    Err(e) => {
                        warn!(logical_id = %logical_id, error = %e, "Node creation failed");
                        outcome.failed_nodes.push((logical_id, e));
                    }
                }
            }
        }
        created
    }

    async fn create_relationships(&self, nodes: &[&Node], outcome: &mut PersistOutcome) {
        let edges: Vec<&Relationship> = nodes
            .iter()
            .copied()
            .flat_map(|n| n.relationships.iter())
            .collect();

        let results: Vec<(&Relationship, Result<()>)> = stream::iter(edges)
            .map(|rel| async move {
                let result = self
                    .graph
                    .create_relationship(&rel.from_id, &rel.to_id, rel.kind)
                    .await;
                (rel, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        for (rel, result) in results {
            match result {
                Ok(()) => {}
                Err(Error::DanglingReference { .. }) => {
                    warn!(
                        from = %rel.from_id,
                        to = %rel.to_id,
                        kind = %rel.kind,
                        "Skipping dangling relationship"
                    );
                    outcome.dangling.push(rel.clone());
                }
                Err(e) => {
                    warn!(from = %rel.from_id, to = %rel.to_id, error = %e, "Relationship creation failed");
                    outcome.relationship_failures.push((rel.clone(), e));
                }
            }
        }
    }

    async fn index_vectors(&self, nodes: &[&Node], outcome: &mut PersistOutcome) {
        let points: Vec<(&Node, &[f32], PhysicalId)> = nodes
            .iter()
            .copied()
            .filter(|n| n.needs_embedding)
            .filter_map(|n| {
                let embedding = n.embedding.as_deref()?;
                let physical_id = outcome.mapping.get(&n.logical_id)?.clone();
                Some((n, embedding, physical_id))
            })
            .collect();

        let results: Vec<(String, Result<()>)> = stream::iter(points)
            .map(|(node, embedding, physical_id)| async move {
                let result = self
                    .vectors
                    .upsert(&node.logical_id, physical_id.as_str(), embedding, node.modality())
                    .await;
                (node.logical_id.clone(), result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        for (logical_id, result) in results {
            match result {
                Ok(()) => {
                    debug!(logical_id = %logical_id, "Vector indexed");
                    outcome.indexed += 1;
                }
                Err(e) => {
                    warn!(logical_id = %logical_id, error = %e, "Vector upsert failed");
                    outcome.vector_failures.push((logical_id, e));
                }
            }
        }
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }
}
