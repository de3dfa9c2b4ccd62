//! Knowledge graph nodes
//!
//! A node is the atomic unit of ingested content. Its `logical_id` is assigned
//! once at creation and is the only identifier shared between the graph store
//! and the vector store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::vector::Modality;
use crate::error::{Error, Result};

use super::relationship::{Relationship, RelationshipKind};

/// A content node in the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable, store-independent identifier
    pub logical_id: String,
    /// Type discriminator
    pub kind: NodeKind,
    /// Human-readable label
    pub title: String,
    /// Text payload (empty for image-kind nodes)
    pub body: String,
    /// Media reference such as a source URL, for image-kind nodes
    pub media: Option<String>,
    /// Summary inherited from the owning page
    pub context: Option<String>,
    /// Whether this node should be made searchable
    pub needs_embedding: bool,
    /// Embedding vector, present only after the embedding stage
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    /// Edges declared by this node
    pub relationships: Vec<Relationship>,
    /// When the node was created
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Create a new node with a fresh logical ID
    pub fn new(kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            logical_id: Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            body: String::new(),
            media: None,
            context: None,
            needs_embedding: false,
            embedding: None,
            relationships: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Use a caller-supplied logical ID
    pub fn with_logical_id(mut self, logical_id: impl Into<String>) -> Self {
        self.logical_id = logical_id.into();
        self
    }

    /// Set the text payload
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the media reference
    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    /// Set the inherited page context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the searchable flag
    pub fn with_needs_embedding(mut self, needs_embedding: bool) -> Self {
        self.needs_embedding = needs_embedding;
        self
    }

    /// Attach an embedding vector
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Declare PARENT towards `parent_id`
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.link(parent_id, RelationshipKind::Parent);
        self
    }

    /// Declare SOURCE towards the owning page
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.link(source_id, RelationshipKind::Source);
        self
    }

    /// Declare an edge from this node, ignoring exact duplicates
    pub fn link(&mut self, to_id: impl Into<String>, kind: RelationshipKind) {
        let rel = Relationship::new(self.logical_id.clone(), to_id, kind);
        if !self.relationships.contains(&rel) {
            self.relationships.push(rel);
        }
    }

    /// Edges of a given kind
    pub fn relationships_of(&self, kind: RelationshipKind) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.kind == kind)
    }

    /// Target of the PARENT edge, if declared
    pub fn parent_id(&self) -> Option<&str> {
        self.relationships_of(RelationshipKind::Parent)
            .next()
            .map(|r| r.to_id.as_str())
    }

    /// Target of the SOURCE edge, if declared
    pub fn source_id(&self) -> Option<&str> {
        self.relationships_of(RelationshipKind::Source)
            .next()
            .map(|r| r.to_id.as_str())
    }

    /// Vector store partition this node belongs to
    pub fn modality(&self) -> Modality {
        self.kind.modality()
    }

    /// Check the PARENT/SOURCE invariant
    ///
    /// Pages declare neither edge; every other node declares exactly one of each.
    pub fn validate_structure(&self) -> Result<()> {
        let parents = self.relationships_of(RelationshipKind::Parent).count();
        let sources = self.relationships_of(RelationshipKind::Source).count();

        if self.relationships.iter().any(|r| r.from_id != self.logical_id) {
            return Err(Error::InvalidInput(format!(
                "node {} declares an edge that does not start at itself",
                self.logical_id
            )));
        }

        let expected = if self.kind == NodeKind::Page { 0 } else { 1 };
        if parents != expected || sources != expected {
            return Err(Error::InvalidInput(format!(
                "{} node {} has {} PARENT and {} SOURCE edges, expected {} of each",
                self.kind, self.logical_id, parents, sources, expected
            )));
        }

        Ok(())
    }
}

/// Types of knowledge graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Page,
    Section,
    Subsection,
    /// Semantic split of a section or subsection
    Chunk,
    Image,
    /// Image classified as a chart or diagram
    Plot,
    Table,
    Citation,
    /// Archived copy of a citation link
    ArchiveCitation,
    /// Cross-reference to another encyclopedia page
    WikiReference,
    Entities,
    Summary,
    KeyTakeaways,
    ImageDescription,
    PlotInsights,
    ImageEntities,
    TableAnalysis,
}

impl NodeKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Section => "section",
            Self::Subsection => "subsection",
            Self::Chunk => "chunk",
            Self::Image => "image",
            Self::Plot => "plot",
            Self::Table => "table",
            Self::Citation => "citation",
            Self::ArchiveCitation => "archive-citation",
            Self::WikiReference => "wiki-ref",
            Self::Entities => "entities",
            Self::Summary => "summary",
            Self::KeyTakeaways => "key_takeaways",
            Self::ImageDescription => "image_description",
            Self::PlotInsights => "plot_insights",
            Self::ImageEntities => "image_entities",
            Self::TableAnalysis => "table_analysis",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "page" | "document" => Some(Self::Page),
            "section" => Some(Self::Section),
            "subsection" => Some(Self::Subsection),
            "chunk" => Some(Self::Chunk),
            "image" => Some(Self::Image),
            "plot" => Some(Self::Plot),
            "table" => Some(Self::Table),
            "citation" => Some(Self::Citation),
            "archive-citation" | "archive_citation" => Some(Self::ArchiveCitation),
            "wiki-ref" | "wiki_reference" => Some(Self::WikiReference),
            "entities" => Some(Self::Entities),
            "summary" => Some(Self::Summary),
            "key_takeaways" => Some(Self::KeyTakeaways),
            "image_description" => Some(Self::ImageDescription),
            "plot_insights" => Some(Self::PlotInsights),
            "image_entities" => Some(Self::ImageEntities),
            "table_analysis" => Some(Self::TableAnalysis),
            _ => None,
        }
    }

    /// Get all node kinds
    pub fn all() -> &'static [NodeKind] {
        &[
            Self::Page,
            Self::Section,
            Self::Subsection,
            Self::Chunk,
            Self::Image,
            Self::Plot,
            Self::Table,
            Self::Citation,
            Self::ArchiveCitation,
            Self::WikiReference,
            Self::Entities,
            Self::Summary,
            Self::KeyTakeaways,
            Self::ImageDescription,
            Self::PlotInsights,
            Self::ImageEntities,
            Self::TableAnalysis,
        ]
    }

    /// Kinds that form a meaningful unit of answer context
    pub fn content_bearing() -> &'static [NodeKind] {
        &[Self::Section, Self::Subsection, Self::Image, Self::Plot]
    }

    pub fn is_content_bearing(&self) -> bool {
        Self::content_bearing().contains(self)
    }

    /// Vector store partition for nodes of this kind
    pub fn modality(&self) -> Modality {
        match self {
            Self::Image | Self::Plot => Modality::Image,
            _ => Modality::Text,
        }
    }

    /// Searchability policy applied when a node batch is finalized
    pub fn default_needs_embedding(&self) -> bool {
        matches!(
            self,
            Self::Entities
                | Self::Summary
                | Self::KeyTakeaways
                | Self::ImageDescription
                | Self::PlotInsights
                | Self::ImageEntities
                | Self::Chunk
                | Self::Image
                | Self::Plot
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
