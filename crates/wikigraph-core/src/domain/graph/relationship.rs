//! Typed relationship edges
//!
//! Every edge is declared on the node it starts from. PARENT and SOURCE point
//! from a child towards its ancestor and its owning page; NEXT and PREVIOUS
//! link siblings within one sequential run.

use serde::{Deserialize, Serialize};

/// A directed, typed edge between two nodes' logical IDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Logical ID of the node declaring the edge
    pub from_id: String,
    /// Logical ID of the node the edge points to
    pub to_id: String,
    /// Kind of edge
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Create a new relationship
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, kind: RelationshipKind) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind,
        }
    }
}

/// Kinds of relationship edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    /// Structural containment, child to ancestor
    Parent,
    /// Provenance, node to its owning page
    Source,
    /// Following sibling in the same run
    Next,
    /// Preceding sibling in the same run
    Previous,
}

impl RelationshipKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "PARENT",
            Self::Source => "SOURCE",
            Self::Next => "NEXT",
            Self::Previous => "PREVIOUS",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PARENT" => Some(Self::Parent),
            "SOURCE" => Some(Self::Source),
            "NEXT" => Some(Self::Next),
            "PREVIOUS" | "PREV" => Some(Self::Previous),
            _ => None,
        }
    }

    /// Get all relationship kinds
    pub fn all() -> &'static [RelationshipKind] {
        &[Self::Parent, Self::Source, Self::Next, Self::Previous]
    }

    /// Whether exactly one edge of this kind is expected on every non-page node
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Parent | Self::Source)
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
